use serde_json::Value;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::response::types::{ClientMeta, Respondent, RespondentInfo, RespondentSeed, Response};
use crate::response::validate::validate_answers;
use crate::store::SurveyStore;
use crate::survey::types::Survey;
use crate::util::{is_past, now_string};

/// Accepts one completed response for a published survey. Checks run in
/// order and short-circuit: survey existence, acceptance gates (publish
/// state, active flag, expiry, login settings), the duplicate-submission
/// policy, then answer validation against the live question set. The
/// persisted write re-checks the duplicate guard inside the store's write
/// transaction.
pub fn submit(
    store: &mut SurveyStore,
    identity: Option<&Identity>,
    survey_id: &str,
    answers: HashMap<String, Value>,
    meta: ClientMeta,
    respondent_info: Option<RespondentInfo>,
) -> Result<Response> {
    let survey = store.survey(survey_id)?.ok_or(Error::NotFound("survey"))?;
    check_accepting(&survey, identity)?;

    let seed = respondent_seed(identity, respondent_info.as_ref());
    let enforce_single = !survey.settings.multiple_responses;
    if enforce_single {
        if let Some(respondent) = lookup_respondent(store, seed.as_ref())? {
            if store.has_completed_response(survey_id, &respondent.id)? {
                return Err(Error::Forbidden(
                    "a response has already been submitted for this survey".to_string(),
                ));
            }
        }
    }

    let questions = store.questions_for_survey(survey_id)?;
    validate_answers(&questions, &answers)?;

    let now = now_string();
    let mut response = Response {
        id: Uuid::new_v4().to_string(),
        survey_id: survey_id.to_string(),
        respondent_id: None,
        answers,
        is_complete: true,
        submitted_at: Some(now.clone()),
        ip_address: meta.ip,
        user_agent: meta.user_agent,
        created_at: now,
    };
    store.insert_completed_response(&mut response, seed.as_ref(), enforce_single)?;

    info!(survey_id, response_id = %response.id, "response submitted");
    Ok(response)
}

fn check_accepting(survey: &Survey, identity: Option<&Identity>) -> Result<()> {
    if !survey.is_published || !survey.is_active {
        return Err(Error::Forbidden(
            "survey is not accepting responses".to_string(),
        ));
    }
    if survey.expires_at.as_deref().map_or(false, is_past) {
        return Err(Error::Forbidden(
            "survey is no longer accepting responses".to_string(),
        ));
    }
    if survey.settings.require_login && identity.is_none() {
        return Err(Error::Forbidden(
            "login required to respond to this survey".to_string(),
        ));
    }
    if !survey.settings.allow_anonymous && identity.is_none() {
        return Err(Error::Forbidden(
            "anonymous responses are not allowed for this survey".to_string(),
        ));
    }
    Ok(())
}

/// The authenticated identity takes precedence over submitted respondent
/// info; fully anonymous submissions have no seed and no duplicate key.
fn respondent_seed(
    identity: Option<&Identity>,
    info: Option<&RespondentInfo>,
) -> Option<RespondentSeed> {
    if let Some(identity) = identity {
        return Some(RespondentSeed {
            email: Some(identity.email.clone()),
            name: Some(identity.name.clone()),
        });
    }
    match info {
        Some(info) if info.email.is_some() || info.name.is_some() => Some(RespondentSeed {
            email: info.email.clone(),
            name: info.name.clone(),
        }),
        _ => None,
    }
}

fn lookup_respondent(
    store: &SurveyStore,
    seed: Option<&RespondentSeed>,
) -> Result<Option<Respondent>> {
    match seed.and_then(|seed| seed.email.as_deref()) {
        Some(email) => store.find_respondent_by_email(email),
        None => Ok(None),
    }
}
