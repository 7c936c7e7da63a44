use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub name: String,
}

impl Session {
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Session {
            token: token.into(),
            name: email.split('@').next().unwrap_or_default().to_string(),
            email,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { email: String },
    SignedOut { email: String },
}
