//! # Identity Store
//!
//! Local identities and their authorization associations.
//!
//! - [`validation`] - Permission name rules
//! - [`model`] - Permission, Team, DirectoryUser and ManagedUser entities kept
//!   in an arena ([`PermissionModel`]) with symmetric, de-duplicated
//!   associations
//! - [`repository`] - The [`IdentityRepository`] seam the reconciliation
//!   engine reads and writes through, plus an in-memory implementation
//! - [`seed`] - JSON seed format for loading a store

pub mod error;
pub mod model;
pub mod repository;
pub mod seed;
pub mod validation;

pub use error::{ModelError, ModelResult, RepositoryError, RepositoryResult};
pub use model::{
    DirectoryUser, Grantee, ManagedUser, Member, Permission, PermissionModel, Team, INVALID_DN,
};
pub use repository::{IdentityRepository, InMemoryIdentityRepository};
pub use seed::{IdentitySeed, SeedError};
pub use validation::{PermissionName, ValidationError, MAX_PERMISSION_NAME_LENGTH};
