use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct SignupDescriptor {
    /// The roll number, used as the username.
    pub username: String,
    pub email: lettre::Address,
    pub password: String,
    pub role: super::Role,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignupRes {
    pub account_id: u64,
}

#[derive(Serialize, Deserialize)]
pub struct LoginDescriptor {
    pub username: String,
    pub password: String,
}

/// A freshly issued session.
///
/// Send `account_id` and `token` back in the `AccountId` and `Token`
/// headers to authenticate.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionRes {
    pub account_id: u64,
    pub token: String,
    /// Unix timestamp in seconds, `None` if the session never expires.
    pub expire_at: Option<i64>,
}

/// Result of following an activation link.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActivationOutcome {
    /// The account is now active and logged in.
    Activated {
        session: SessionRes,
        /// Where the client should go next.
        next: String,
    },
    /// The profile was already completed, so the link doesn't log in anymore.
    LogInWithPassword,
}

/// Result of asking for a new activation link.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResendOutcome {
    /// The profile was already completed.
    AlreadyCompleted,
    /// The presented link is still valid, nothing was sent.
    LinkActive,
    /// A new link was mailed.
    MailSent,
}
