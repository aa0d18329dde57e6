use warden_core::UserId;

/// Principal context for a request (authenticated identity).
///
/// Inserted by the auth middleware from a validated token. It carries no
/// permissions: every protected handler asks the access gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    email: String,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
