//! Directory error types
//!
//! Error definitions with transient/permanent classification. The
//! reconciliation engine uses the split between connection-level and
//! search-level variants to decide whether a failure aborts the run.

use thiserror::Error;

/// Error that can occur while talking to the directory service.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Connection errors (fatal to a run)
    /// Failed to establish the connection or initial context.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connecting or binding did not finish in time.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// The directory rejected the bind credentials.
    #[error("authentication failed for {principal}")]
    AuthenticationFailed { principal: String },

    // Search errors (scoped to a single lookup)
    /// The directory returned an error for a search.
    #[error("search failed under '{base_dn}': {message}")]
    SearchFailed {
        base_dn: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A search did not finish in time.
    #[error("search timeout after {timeout_secs} seconds")]
    SearchTimeout { timeout_secs: u64 },

    /// The session was already closed.
    #[error("directory session is closed")]
    SessionClosed,
}

impl DirectoryError {
    /// Check if this error is transient and the operation may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::ConnectionTimeout { .. }
                | DirectoryError::SearchFailed { .. }
                | DirectoryError::SearchTimeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether the error happened while establishing the session rather than
    /// while using it.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::ConnectionTimeout { .. }
                | DirectoryError::AuthenticationFailed { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            DirectoryError::AuthenticationFailed { .. } => "AUTH_FAILED",
            DirectoryError::SearchFailed { .. } => "SEARCH_FAILED",
            DirectoryError::SearchTimeout { .. } => "SEARCH_TIMEOUT",
            DirectoryError::SessionClosed => "SESSION_CLOSED",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search failed error.
    pub fn search_failed(base_dn: impl Into<String>, message: impl Into<String>) -> Self {
        DirectoryError::SearchFailed {
            base_dn: base_dn.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a search failed error with source.
    pub fn search_failed_with_source(
        base_dn: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::SearchFailed {
            base_dn: base_dn.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
