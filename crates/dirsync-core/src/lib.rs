//! dirsync Core Library
//!
//! Identifier types shared by the dirsync crates.
//!
//! # Example
//!
//! ```
//! use dirsync_core::{PermissionId, TeamId};
//!
//! let permission = PermissionId::new();
//! let team = TeamId::new();
//! assert_ne!(permission.as_uuid(), team.as_uuid());
//! ```

pub mod ids;

pub use ids::{ManagedUserId, ParseIdError, PermissionId, RunId, TeamId, UserId};
