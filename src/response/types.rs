use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Respondent {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub metadata: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub survey_id: String,
    pub respondent_id: Option<String>,
    pub answers: HashMap<String, Value>,
    pub is_complete: bool,
    pub submitted_at: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Identifying data a submission resolves a Respondent from. Derived from
/// the authenticated identity when present, else from the submitted
/// respondent info.
#[derive(Debug, Clone)]
pub struct RespondentSeed {
    pub email: Option<String>,
    pub name: Option<String>,
}
