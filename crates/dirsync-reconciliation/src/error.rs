//! Reconciliation error types.

use thiserror::Error;

use dirsync_directory::DirectoryError;
use dirsync_identity::RepositoryError;

/// Why a user (or a whole run) could not be reconciled.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The directory rejected or failed an operation.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The identity repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ReconciliationError {
    /// Error code recorded in run reports.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Directory(err) => err.error_code(),
            Self::Repository(RepositoryError::NotFound { .. }) => "USER_NOT_FOUND",
            Self::Repository(RepositoryError::LoginChanged { .. }) => "LOGIN_CHANGED",
            Self::Repository(RepositoryError::Storage(_)) => "STORAGE_ERROR",
            Self::Repository(RepositoryError::Model(_)) => "MODEL_ERROR",
        }
    }

    /// Whether retrying the same user later might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Directory(err) => err.is_transient(),
            Self::Repository(RepositoryError::Storage(_)) => true,
            Self::Repository(_) => false,
        }
    }
}

/// Convenience Result type for reconciliation.
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_codes_pass_through() {
        let err: ReconciliationError = DirectoryError::SearchTimeout { timeout_secs: 30 }.into();
        assert_eq!(err.error_code(), "SEARCH_TIMEOUT");
        assert!(err.is_transient());
    }

    #[test]
    fn test_repository_codes() {
        let err: ReconciliationError = RepositoryError::NotFound {
            login: "alice".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "USER_NOT_FOUND");
        assert!(!err.is_transient());

        let err: ReconciliationError = RepositoryError::Storage("disk full".to_string()).into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.is_transient());
    }
}
