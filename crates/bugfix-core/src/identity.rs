use serde::{Deserialize, Serialize};

/// A player as presented in a request: a display name plus an opaque
/// credential. Two identities are the same player only if both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(rename = "passWord", alias = "password")]
    pub credential: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credential: credential.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
