use crate::identity::Identity;
use crate::survey::types::Survey;

/// True iff the caller is the survey's creator. Anonymous callers can
/// never write.
pub fn can_write(identity: Option<&Identity>, survey: &Survey) -> bool {
    identity.map_or(false, |caller| caller.id == survey.creator_id)
}

/// Published surveys are readable by anyone; unpublished surveys only by
/// their creator.
pub fn can_read(identity: Option<&Identity>, survey: &Survey) -> bool {
    survey.is_published || can_write(identity, survey)
}
