use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::SurveyStore;
use crate::util::now_string;

/// An authenticated creator account. The credential hash is opaque here;
/// hashing and verification live with the external auth layer, and the
/// field never serializes outward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub is_verified: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub credential_hash: String,
}

pub fn create_user(store: &mut SurveyStore, input: NewUser) -> Result<User> {
    let name_len = input.name.chars().count();
    if name_len < 2 || name_len > 100 {
        return Err(Error::InvalidInput(
            "name must be between 2 and 100 characters".to_string(),
        ));
    }
    let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("regex");
    if !email_re.is_match(&input.email) {
        return Err(Error::InvalidInput(
            "email must be a valid address".to_string(),
        ));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        email: input.email,
        credential_hash: input.credential_hash,
        is_verified: false,
        created_at: now_string(),
    };
    store.insert_user(&user)?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::{create_user, NewUser};
    use crate::error::Error;
    use crate::store::SurveyStore;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            credential_hash: "hash".to_string(),
        }
    }

    #[test]
    fn registers_and_finds_users() {
        let mut store = SurveyStore::open_in_memory().expect("store");
        let user = create_user(&mut store, new_user("Ada", "ada@example.com")).expect("user");
        assert!(!user.is_verified);

        let found = store.find_user(&user.id).expect("lookup").expect("found");
        assert_eq!(found.email, "ada@example.com");
        let by_email = store
            .find_user_by_email("ada@example.com")
            .expect("lookup")
            .expect("found");
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn rejects_bad_names_and_emails() {
        let mut store = SurveyStore::open_in_memory().expect("store");
        assert!(matches!(
            create_user(&mut store, new_user("A", "a@example.com")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_user(&mut store, new_user("Ada", "not-an-email")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_duplicate_emails() {
        let mut store = SurveyStore::open_in_memory().expect("store");
        create_user(&mut store, new_user("Ada", "ada@example.com")).expect("first");
        let err = create_user(&mut store, new_user("Ada Again", "ada@example.com"))
            .expect_err("duplicate email");
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("already exists")));
    }
}
