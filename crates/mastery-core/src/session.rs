//! Authenticated session context.
//!
//! A session is created at sign-in and handed to whichever component makes
//! authenticated calls. Dropping it (or calling the holder's sign-out) ends
//! it. There is no process-wide token.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::UserId;

/// Credentials for one signed-in user.
#[derive(Clone)]
pub struct Session {
    user_id: UserId,
    access_token: String,
    signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            signed_in_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }

    /// Whether this session may act on behalf of `user`.
    pub fn authorizes(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

// Masks the token so sessions can be logged.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"***")
            .field("signed_in_at", &self.signed_in_at)
            .finish()
    }
}
