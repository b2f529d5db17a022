//! Per-connection context for log correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one client connection in logs.
///
/// Created unauthenticated; the username is filled in once the session binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique session identifier.
    pub session_id: Uuid,
    /// When the connection was accepted.
    pub started_at: DateTime<Utc>,
    /// Bound account name once authenticated.
    pub username: Option<String>,
}

impl SessionContext {
    /// Create a context for a new connection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            username: None,
        }
    }

    /// Record the authenticated account.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    /// Create a tracing span carrying this context.
    ///
    /// Built on demand so the span reflects the username bound so far.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "session",
            session_id = %self.short_id(),
            user = self.username.as_deref(),
        )
    }

    /// Get a short identifier for logging.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.session_id.simple().to_string()[..8].to_string()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
