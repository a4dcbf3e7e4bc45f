//! Survey authoring and response collection core.
//!
//! Creators build and publish surveys (ordered question sets); respondents,
//! anonymous or authenticated, submit answer sets that are validated
//! against the survey's live question schema. Transport, token
//! verification, and password handling are external: every operation takes
//! a resolved caller identity (or none) plus typed arguments and returns a
//! typed result.

pub mod error;
pub mod identity;
pub mod policy;
pub mod response;
pub mod store;
pub mod survey;
pub mod user;
mod util;

pub use error::{Error, Result};
pub use identity::{resolve_caller, Identity, IdentityProvider};
pub use response::collect::submit;
pub use response::types::{ClientMeta, Respondent, RespondentInfo, Response};
pub use store::SurveyStore;
pub use survey::authoring::{
    create, delete, get_for_view, list_owned, set_published, update,
};
pub use survey::types::{
    Question, QuestionInput, QuestionType, Survey, SurveyDetail, SurveyInput, SurveySettings,
    SurveySummary, SurveyView,
};
pub use user::{create_user, NewUser, User};
