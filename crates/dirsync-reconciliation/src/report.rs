//! Run reports.
//!
//! A [`SyncReport`] is the only thing a caller gets back from a run: errors
//! never escape [`ReconciliationEngine::run_sync`](crate::ReconciliationEngine::run_sync),
//! they are folded into the report instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use dirsync_core::RunId;

use crate::error::ReconciliationError;

/// Which users a run targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "login", rename_all = "snake_case")]
pub enum SyncMode {
    /// Every directory-backed user.
    Full,
    /// A single user by login name.
    Single(String),
}

impl SyncMode {
    /// Mode for an optional target login.
    #[must_use]
    pub fn for_target(target_login: Option<&str>) -> Self {
        match target_login {
            Some(login) => Self::Single(login.to_string()),
            None => Self::Full,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Single(login) => write!(f, "single:{login}"),
        }
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is in progress.
    Running,
    /// Integration disabled; nothing was contacted.
    Skipped,
    /// Every targeted user was reconciled.
    Completed,
    /// The run finished but at least one user failed.
    CompletedWithErrors,
    /// The run stopped before reconciling users.
    Aborted,
}

impl RunStatus {
    /// Whether the run has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Skipped => write!(f, "skipped"),
            Self::Completed => write!(f, "completed"),
            Self::CompletedWithErrors => write!(f, "completed_with_errors"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Result of reconciling one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOutcome {
    /// The directory holds an entry; its DN was recorded.
    Verified {
        /// More than one entry matched and the first was taken.
        ambiguous: bool,
    },
    /// No entry matched; the user was flagged invalid.
    Invalidated,
}

/// A user that could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFailure {
    pub login: String,
    pub error_code: String,
    pub message: String,
}

/// Summary of one synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: RunId,
    pub mode: SyncMode,
    pub status: RunStatus,
    pub users_targeted: u32,
    pub users_verified: u32,
    pub users_invalidated: u32,
    pub users_failed: u32,
    /// Verified users whose lookup matched more than one entry.
    pub ambiguous_matches: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<UserFailure>,
    /// Set when the run was aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SyncReport {
    /// A running report for a new run.
    #[must_use]
    pub fn start(mode: SyncMode) -> Self {
        Self {
            run_id: RunId::new(),
            mode,
            status: RunStatus::Running,
            users_targeted: 0,
            users_verified: 0,
            users_invalidated: 0,
            users_failed: 0,
            ambiguous_matches: 0,
            failures: Vec::new(),
            error_code: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    pub fn set_targeted(&mut self, count: usize) {
        self.users_targeted = u32::try_from(count).unwrap_or(u32::MAX);
    }

    /// Count a reconciled user.
    pub fn record_outcome(&mut self, outcome: UserOutcome) {
        match outcome {
            UserOutcome::Verified { ambiguous } => {
                self.users_verified += 1;
                if ambiguous {
                    self.ambiguous_matches += 1;
                }
            }
            UserOutcome::Invalidated => self.users_invalidated += 1,
        }
    }

    /// Record a user that could not be reconciled.
    pub fn record_failure(&mut self, login: &str, error: &ReconciliationError) {
        self.users_failed += 1;
        self.failures.push(UserFailure {
            login: login.to_string(),
            error_code: error.error_code().to_string(),
            message: error.to_string(),
        });
    }

    /// Close the run as skipped.
    pub fn skip(&mut self) {
        self.finish_with(RunStatus::Skipped);
    }

    /// Close the run as aborted.
    pub fn abort(&mut self, code: &str, message: impl Into<String>) {
        self.error_code = Some(code.to_string());
        self.error_message = Some(message.into());
        self.finish_with(RunStatus::Aborted);
    }

    /// Close the run after every targeted user was attempted.
    pub fn complete(&mut self) {
        let status = if self.users_failed > 0 {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };
        self.finish_with(status);
    }

    fn finish_with(&mut self, status: RunStatus) {
        let completed_at = Utc::now();
        let elapsed = (completed_at - self.started_at).num_milliseconds();
        self.status = status;
        self.completed_at = Some(completed_at);
        self.duration_ms = Some(u64::try_from(elapsed).unwrap_or(0));
    }

    /// Number of users attempted so far.
    #[must_use]
    pub fn users_processed(&self) -> u32 {
        self.users_verified + self.users_invalidated + self.users_failed
    }

    /// Whether the run reached every targeted user without failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Skipped)
    }
}
