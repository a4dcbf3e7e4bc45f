use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Textarea,
    Radio,
    Checkbox,
    Select,
    Rating,
    Date,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Rating => "rating",
            Self::Date => "date",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "radio" => Some(Self::Radio),
            "checkbox" => Some(Self::Checkbox),
            "select" => Some(Self::Select),
            "rating" => Some(Self::Rating),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    /// Choice types carry an option list; the rest ignore it.
    pub fn uses_options(&self) -> bool {
        matches!(self, Self::Radio | Self::Checkbox | Self::Select)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySettings {
    #[serde(default = "default_true")]
    pub allow_anonymous: bool,
    #[serde(default)]
    pub require_login: bool,
    #[serde(default)]
    pub multiple_responses: bool,
    #[serde(default)]
    pub show_results: bool,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            allow_anonymous: true,
            require_login: false,
            multiple_responses: false,
            show_results: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub is_published: bool,
    pub is_active: bool,
    pub settings: SurveySettings,
    pub published_at: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub survey_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub required: bool,
    pub order: i64,
    pub validation: serde_json::Value,
}

fn default_validation() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_validation")]
    pub validation: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
    #[serde(default)]
    pub settings: Option<SurveySettings>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    pub survey: Survey,
    pub total_responses: i64,
    pub response_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDetail {
    pub survey: Survey,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    pub survey: Survey,
    pub questions: Vec<Question>,
    pub creator_name: String,
}
