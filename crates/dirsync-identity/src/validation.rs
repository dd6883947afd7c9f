//! Permission name validation.
//!
//! A permission name is:
//! - non-empty
//! - at most 255 characters
//! - letters and digits only (no whitespace, punctuation or symbols)
//!
//! [`PermissionName`] can only be built through [`PermissionName::parse`], so
//! every permission held by the model carries a valid name.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::LazyLock;

/// Letters and decimal digits, nothing else.
static PERMISSION_NAME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[\p{Alphabetic}\p{Nd}]+$")
        .expect("PERMISSION_NAME_REGEX is a valid regex pattern")
});

/// Maximum permission name length, in characters.
pub const MAX_PERMISSION_NAME_LENGTH: usize = 255;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// The field name that failed validation.
    pub field: String,
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional constraint details (e.g., `max_length`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
            constraints: None,
        }
    }

    /// Create a validation error with constraint details.
    pub fn with_constraints(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        constraints: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
            constraints: Some(constraints),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A validated permission name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    /// Validate and wrap a permission name.
    ///
    /// ```
    /// use dirsync_identity::PermissionName;
    ///
    /// assert!(PermissionName::parse("ManageUsers").is_ok());
    /// assert!(PermissionName::parse("manage users").is_err());
    /// assert!(PermissionName::parse("manage-users").is_err());
    /// assert!(PermissionName::parse("").is_err());
    /// ```
    pub fn parse(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::new(
                "name",
                "required",
                "The permission name is required",
            ));
        }

        let length = name.chars().count();
        if length > MAX_PERMISSION_NAME_LENGTH {
            return Err(ValidationError::with_constraints(
                "name",
                "too_long",
                format!(
                    "The permission name must not exceed {} characters",
                    MAX_PERMISSION_NAME_LENGTH
                ),
                json!({"max_length": MAX_PERMISSION_NAME_LENGTH, "actual": length}),
            ));
        }

        if !PERMISSION_NAME_REGEX.is_match(&name) {
            return Err(ValidationError::new(
                "name",
                "invalid_format",
                "The permission name must contain only alpha and/or numeric characters",
            ));
        }

        Ok(Self(name))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.0
    }
}

impl AsRef<str> for PermissionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
