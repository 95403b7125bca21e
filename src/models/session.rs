//! Session model

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Session entity for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` that lives for `ttl_days`.
    ///
    /// Returns `None` when the expiry does not fit in a timestamp.
    pub fn start(user_id: i64, ttl_days: i64) -> Option<Self> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(TimeDelta::try_days(ttl_days)?)?;
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
