use serde::{Deserialize, Serialize};

use crate::user::User;

/// The resolved caller of an operation. Absence means anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// External authentication capability. Given a credential it yields the
/// caller identity, or `None` when the credential does not resolve. Called
/// once per request by the transport layer; never from inside an operation.
pub trait IdentityProvider {
    fn resolve(&self, credential: &str) -> Option<Identity>;
}

pub fn resolve_caller<P: IdentityProvider>(
    provider: &P,
    credential: Option<&str>,
) -> Option<Identity> {
    credential.and_then(|value| provider.resolve(value))
}

#[cfg(test)]
mod tests {
    use super::{resolve_caller, Identity, IdentityProvider};

    struct FixedProvider;

    impl IdentityProvider for FixedProvider {
        fn resolve(&self, credential: &str) -> Option<Identity> {
            if credential == "good-token" {
                Some(Identity {
                    id: "u1".to_string(),
                    name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                })
            } else {
                None
            }
        }
    }

    #[test]
    fn missing_or_unknown_credentials_resolve_to_anonymous() {
        assert!(resolve_caller(&FixedProvider, None).is_none());
        assert!(resolve_caller(&FixedProvider, Some("bad")).is_none());
        let identity = resolve_caller(&FixedProvider, Some("good-token")).expect("identity");
        assert_eq!(identity.id, "u1");
    }
}
