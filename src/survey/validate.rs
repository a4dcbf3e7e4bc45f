use chrono::DateTime;

use crate::error::{Error, Result};
use crate::survey::types::SurveyInput;

pub fn validate_survey_input(input: &SurveyInput) -> Result<()> {
    let title_len = input.title.chars().count();
    if title_len < 1 || title_len > 200 {
        return Err(Error::InvalidInput(
            "title must be between 1 and 200 characters".to_string(),
        ));
    }

    for (index, question) in input.questions.iter().enumerate() {
        if question.text.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "question {} must have text",
                index + 1
            )));
        }
    }

    if let Some(expires_at) = &input.expires_at {
        if DateTime::parse_from_rfc3339(expires_at).is_err() {
            return Err(Error::InvalidInput(
                "expiresAt must be an RFC 3339 timestamp".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_survey_input;
    use crate::error::Error;
    use crate::survey::types::SurveyInput;

    fn input_from_json(raw: &str) -> SurveyInput {
        serde_json::from_str(raw).expect("survey input")
    }

    #[test]
    fn rejects_out_of_range_titles() {
        let empty = input_from_json(r#"{"title": ""}"#);
        assert!(matches!(
            validate_survey_input(&empty),
            Err(Error::InvalidInput(_))
        ));

        let long = SurveyInput {
            title: "x".repeat(201),
            description: None,
            questions: Vec::new(),
            settings: None,
            expires_at: None,
        };
        assert!(matches!(
            validate_survey_input(&long),
            Err(Error::InvalidInput(_))
        ));

        let ok = input_from_json(r#"{"title": "Customer pulse"}"#);
        assert!(validate_survey_input(&ok).is_ok());
    }

    #[test]
    fn rejects_questions_without_text() {
        let input = input_from_json(
            r#"{"title": "T", "questions": [{"text": "  ", "type": "text"}]}"#,
        );
        let err = validate_survey_input(&input).expect_err("blank question text");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("question 1")));
    }

    #[test]
    fn rejects_unknown_question_types_at_the_boundary() {
        let parsed: Result<SurveyInput, _> =
            serde_json::from_str(r#"{"title": "T", "questions": [{"text": "Q", "type": "matrix"}]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_malformed_expiry_timestamps() {
        let input = input_from_json(r#"{"title": "T", "expiresAt": "tomorrow"}"#);
        assert!(matches!(
            validate_survey_input(&input),
            Err(Error::InvalidInput(_))
        ));

        let ok = input_from_json(r#"{"title": "T", "expiresAt": "2030-01-01T00:00:00+00:00"}"#);
        assert!(validate_survey_input(&ok).is_ok());
    }
}
