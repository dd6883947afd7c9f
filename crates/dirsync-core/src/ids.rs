//! Strongly Typed Identifiers
//!
//! Newtype identifiers for the entities of the identity store. The arena in
//! `dirsync-identity` addresses every entity through one of these, so an
//! association can never point at the wrong kind of entity.
//!
//! # Example
//!
//! ```
//! use dirsync_core::{PermissionId, UserId};
//!
//! fn requires_permission(id: PermissionId) -> String {
//!     id.to_string()
//! }
//!
//! let permission = PermissionId::new();
//! let _user = UserId::new();
//! let rendered = requires_permission(permission);
//! // requires_permission(_user); // does not compile
//! assert_eq!(rendered.len(), 36);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of a named capability.
    PermissionId
);

define_id!(
    /// Identifier of a team (a named group of users owning permissions).
    TeamId
);

define_id!(
    /// Identifier of a directory-backed user.
    ///
    /// Directory-backed users are joined against the directory by login
    /// name; this identifier is purely local.
    UserId
);

define_id!(
    /// Identifier of a locally-managed user (no directory counterpart).
    ManagedUserId
);

define_id!(
    /// Identifier of a single reconciliation run.
    RunId
);
