//! Error types for the identity store.

use thiserror::Error;

use dirsync_core::{ManagedUserId, PermissionId, TeamId, UserId};

use crate::validation::ValidationError;

/// Errors raised by [`PermissionModel`](crate::PermissionModel) mutations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A name failed validation.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] ValidationError),

    /// A permission with the same name already exists.
    #[error("Permission already exists: {name}")]
    DuplicatePermission { name: String },

    /// A team with the same name already exists.
    #[error("Team already exists: {name}")]
    DuplicateTeam { name: String },

    /// A user with the same login already exists.
    #[error("User already exists: {login}")]
    DuplicateLogin { login: String },

    /// The permission is not in the model.
    #[error("Permission not found: {0}")]
    PermissionNotFound(PermissionId),

    /// The team is not in the model.
    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    /// The directory user is not in the model.
    #[error("Directory user not found: {0}")]
    UserNotFound(UserId),

    /// The managed user is not in the model.
    #[error("Managed user not found: {0}")]
    ManagedUserNotFound(ManagedUserId),

    /// A name refers to an entity that does not exist.
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    /// A DN was set to a blank value.
    #[error("Directory user {login} cannot have a blank DN")]
    BlankDn { login: String },

    /// The permission is still referenced and cannot be removed.
    #[error("Permission {name} is still granted to {references} entities")]
    PermissionInUse { name: String, references: usize },

    /// Associations are not symmetric.
    #[error("Inconsistent association: {0}")]
    Inconsistent(String),
}

/// Convenience Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by an [`IdentityRepository`](crate::IdentityRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The user to update does not exist.
    #[error("Directory user not found: {login}")]
    NotFound { login: String },

    /// An update tried to change the immutable login name.
    #[error("Login name of user {id} cannot change from {stored} to {requested}")]
    LoginChanged {
        id: UserId,
        stored: String,
        requested: String,
    },

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The model rejected the change.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Convenience Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
