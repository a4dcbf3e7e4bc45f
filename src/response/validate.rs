use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::survey::types::{Question, QuestionType};

/// Checks a submitted answer map against the survey's live question set:
/// every key must name one of the survey's questions, every required
/// question must have a non-empty entry, and present values must match the
/// question type's shape.
pub fn validate_answers(questions: &[Question], answers: &HashMap<String, Value>) -> Result<()> {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    for (question_id, value) in answers {
        let question = by_id.get(question_id.as_str()).ok_or_else(|| {
            Error::InvalidInput(format!("answer references unknown question {question_id}"))
        })?;
        if is_empty_answer(value) {
            continue;
        }
        check_answer_shape(question, value)?;
    }

    for question in questions.iter().filter(|q| q.required) {
        let answered = answers
            .get(&question.id)
            .map(|value| !is_empty_answer(value))
            .unwrap_or(false);
        if !answered {
            return Err(Error::InvalidInput(format!(
                "question \"{}\" requires an answer",
                question.text
            )));
        }
    }

    Ok(())
}

fn is_empty_answer(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn check_answer_shape(question: &Question, value: &Value) -> Result<()> {
    match question.question_type {
        QuestionType::Text | QuestionType::Textarea | QuestionType::Date => {
            if !value.is_string() {
                return Err(shape_error(question, "expects text"));
            }
        }
        QuestionType::Rating => {
            if !value.is_number() {
                return Err(shape_error(question, "expects a number"));
            }
        }
        QuestionType::Radio | QuestionType::Select => {
            let choice = value
                .as_str()
                .ok_or_else(|| shape_error(question, "expects one of its options"))?;
            if !question.options.is_empty() && !question.options.iter().any(|o| o == choice) {
                return Err(shape_error(question, "expects one of its options"));
            }
        }
        QuestionType::Checkbox => {
            let items = value
                .as_array()
                .ok_or_else(|| shape_error(question, "expects a list of options"))?;
            for item in items {
                let choice = item
                    .as_str()
                    .ok_or_else(|| shape_error(question, "expects a list of options"))?;
                if !question.options.is_empty() && !question.options.iter().any(|o| o == choice) {
                    return Err(shape_error(question, "expects a list of options"));
                }
            }
        }
    }
    Ok(())
}

fn shape_error(question: &Question, expectation: &str) -> Error {
    Error::InvalidInput(format!("question \"{}\" {}", question.text, expectation))
}

#[cfg(test)]
mod tests {
    use super::validate_answers;
    use crate::error::Error;
    use crate::survey::types::{Question, QuestionType};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn question(id: &str, text: &str, question_type: QuestionType, required: bool) -> Question {
        Question {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            text: text.to_string(),
            question_type,
            options: Vec::new(),
            required,
            order: 0,
            validation: json!({}),
        }
    }

    fn answers(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn rejects_unknown_question_keys() {
        let questions = vec![question("q1", "Rate us", QuestionType::Rating, false)];
        let err = validate_answers(&questions, &answers(&[("zz", json!(5))]))
            .expect_err("unknown key");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("zz")));
    }

    #[test]
    fn required_questions_must_have_non_empty_answers() {
        let questions = vec![question("q1", "Rate us", QuestionType::Rating, true)];

        let err = validate_answers(&questions, &answers(&[])).expect_err("missing");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("Rate us")));

        let err = validate_answers(&questions, &answers(&[("q1", Value::Null)]))
            .expect_err("null answer");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("Rate us")));

        assert!(validate_answers(&questions, &answers(&[("q1", json!(4))])).is_ok());
    }

    #[test]
    fn blank_strings_and_empty_lists_count_as_missing() {
        let text = vec![question("q1", "Name?", QuestionType::Text, true)];
        let err =
            validate_answers(&text, &answers(&[("q1", json!("   "))])).expect_err("blank text");
        assert!(matches!(err, Error::InvalidInput(_)));

        let boxes = vec![question("q1", "Pick some", QuestionType::Checkbox, true)];
        let err =
            validate_answers(&boxes, &answers(&[("q1", json!([]))])).expect_err("empty list");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn optional_questions_may_be_omitted_or_blank() {
        let questions = vec![question("q1", "Anything else?", QuestionType::Textarea, false)];
        assert!(validate_answers(&questions, &answers(&[])).is_ok());
        assert!(validate_answers(&questions, &answers(&[("q1", json!(""))])).is_ok());
    }

    #[test]
    fn choice_answers_must_come_from_the_options() {
        let mut radio = question("q1", "Pick one", QuestionType::Radio, true);
        radio.options = vec!["yes".to_string(), "no".to_string()];
        let questions = vec![radio];

        assert!(validate_answers(&questions, &answers(&[("q1", json!("yes"))])).is_ok());
        let err = validate_answers(&questions, &answers(&[("q1", json!("maybe"))]))
            .expect_err("off-list choice");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("Pick one")));
        assert!(validate_answers(&questions, &answers(&[("q1", json!(3))])).is_err());
    }

    #[test]
    fn checkbox_answers_must_be_lists_of_options() {
        let mut boxes = question("q1", "Pick some", QuestionType::Checkbox, false);
        boxes.options = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let questions = vec![boxes];

        assert!(validate_answers(&questions, &answers(&[("q1", json!(["a", "c"]))])).is_ok());
        assert!(validate_answers(&questions, &answers(&[("q1", json!(["a", "z"]))])).is_err());
        assert!(validate_answers(&questions, &answers(&[("q1", json!("a"))])).is_err());
    }

    #[test]
    fn rating_answers_must_be_numbers() {
        let questions = vec![question("q1", "Rate us", QuestionType::Rating, true)];
        assert!(validate_answers(&questions, &answers(&[("q1", json!("five"))])).is_err());
        assert!(validate_answers(&questions, &answers(&[("q1", json!(5))])).is_ok());
    }
}
