//! Sync trigger messages.

use serde::{Deserialize, Serialize};

/// Request to run a synchronization.
///
/// Serialized form is what a queue or scheduler publishes:
/// `{"target_login": null}` for all users, `{"target_login": "alice"}` for one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTrigger {
    #[serde(default)]
    pub target_login: Option<String>,
}

impl SyncTrigger {
    /// Reconcile every directory-backed user.
    #[must_use]
    pub fn all() -> Self {
        Self { target_login: None }
    }

    /// Reconcile a single user.
    #[must_use]
    pub fn user(login: impl Into<String>) -> Self {
        Self {
            target_login: Some(login.into()),
        }
    }

    #[must_use]
    pub fn target_login(&self) -> Option<&str> {
        self.target_login.as_deref()
    }
}
