use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::policy;
use crate::store::SurveyStore;
use crate::survey::types::{
    Question, QuestionInput, Survey, SurveyDetail, SurveyInput, SurveySummary, SurveyView,
};
use crate::survey::validate::validate_survey_input;
use crate::util::now_string;

fn require_identity(identity: Option<&Identity>) -> Result<&Identity> {
    identity.ok_or(Error::Unauthenticated)
}

fn build_questions(survey_id: &str, inputs: &[QuestionInput]) -> Vec<Question> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| Question {
            id: Uuid::new_v4().to_string(),
            survey_id: survey_id.to_string(),
            text: input.text.clone(),
            question_type: input.question_type,
            options: if input.question_type.uses_options() {
                input.options.clone()
            } else {
                Vec::new()
            },
            required: input.required,
            order: index as i64,
            validation: input.validation.clone(),
        })
        .collect()
}

/// Every survey owned by the caller, newest first, annotated with response
/// totals.
pub fn list_owned(store: &SurveyStore, identity: Option<&Identity>) -> Result<Vec<SurveySummary>> {
    let identity = require_identity(identity)?;
    let surveys = store.surveys_by_creator(&identity.id)?;

    let mut summaries = Vec::new();
    for survey in surveys {
        let (total_responses, response_count) = store.response_totals(&survey.id)?;
        summaries.push(SurveySummary {
            survey,
            total_responses,
            response_count,
        });
    }
    Ok(summaries)
}

pub fn create(
    store: &mut SurveyStore,
    identity: Option<&Identity>,
    input: SurveyInput,
) -> Result<SurveyDetail> {
    let identity = require_identity(identity)?;
    validate_survey_input(&input)?;

    let now = now_string();
    let survey = Survey {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        description: input.description,
        creator_id: identity.id.clone(),
        is_published: false,
        is_active: true,
        settings: input.settings.unwrap_or_default(),
        published_at: None,
        expires_at: input.expires_at,
        created_at: now.clone(),
        updated_at: now,
    };
    let questions = build_questions(&survey.id, &input.questions);
    store.insert_survey(&survey, &questions)?;

    info!(survey_id = %survey.id, questions = questions.len(), "survey created");
    Ok(SurveyDetail { survey, questions })
}

/// Updates the survey's scalar fields and replaces the whole question set.
/// Question ids are not stable across edits: every update reissues them.
pub fn update(
    store: &mut SurveyStore,
    identity: Option<&Identity>,
    survey_id: &str,
    input: SurveyInput,
) -> Result<SurveyDetail> {
    let identity = require_identity(identity)?;
    validate_survey_input(&input)?;

    let mut survey = store.survey(survey_id)?.ok_or(Error::NotFound("survey"))?;
    if !policy::can_write(Some(identity), &survey) {
        return Err(Error::Forbidden(
            "not authorized to update this survey".to_string(),
        ));
    }

    survey.title = input.title;
    if input.description.is_some() {
        survey.description = input.description;
    }
    if let Some(settings) = input.settings {
        survey.settings = settings;
    }
    if input.expires_at.is_some() {
        survey.expires_at = input.expires_at;
    }
    survey.updated_at = now_string();

    let questions = build_questions(&survey.id, &input.questions);
    store.replace_survey(&survey, &questions)?;

    info!(survey_id = %survey.id, questions = questions.len(), "survey updated");
    Ok(SurveyDetail { survey, questions })
}

pub fn set_published(
    store: &mut SurveyStore,
    identity: Option<&Identity>,
    survey_id: &str,
    is_published: bool,
) -> Result<Survey> {
    let identity = require_identity(identity)?;
    let mut survey = store.survey(survey_id)?.ok_or(Error::NotFound("survey"))?;
    if !policy::can_write(Some(identity), &survey) {
        return Err(Error::Forbidden(
            "not authorized to change this survey".to_string(),
        ));
    }

    survey.is_published = is_published;
    survey.published_at = if is_published {
        Some(now_string())
    } else {
        None
    };
    survey.updated_at = now_string();
    store.set_published(&survey)?;

    info!(survey_id = %survey.id, is_published, "survey publish state changed");
    Ok(survey)
}

pub fn delete(
    store: &mut SurveyStore,
    identity: Option<&Identity>,
    survey_id: &str,
) -> Result<()> {
    let identity = require_identity(identity)?;
    let survey = store.survey(survey_id)?.ok_or(Error::NotFound("survey"))?;
    if !policy::can_write(Some(identity), &survey) {
        return Err(Error::Forbidden(
            "not authorized to delete this survey".to_string(),
        ));
    }

    store.delete_survey(survey_id)?;
    info!(survey_id, "survey deleted");
    Ok(())
}

/// Survey with its ordered questions and the creator's display name.
/// Anonymous callers may view published surveys.
pub fn get_for_view(
    store: &SurveyStore,
    identity: Option<&Identity>,
    survey_id: &str,
) -> Result<SurveyView> {
    let survey = store.survey(survey_id)?.ok_or(Error::NotFound("survey"))?;
    if !policy::can_read(identity, &survey) {
        return Err(Error::Forbidden("survey not accessible".to_string()));
    }

    let questions = store.questions_for_survey(survey_id)?;
    let creator = store
        .find_user(&survey.creator_id)?
        .ok_or(Error::NotFound("user"))?;

    Ok(SurveyView {
        survey,
        questions,
        creator_name: creator.name,
    })
}
