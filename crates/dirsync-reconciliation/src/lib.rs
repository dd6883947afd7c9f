//! Directory reconciliation for dirsync.
//!
//! Verifies that every directory-backed user still exists in the directory
//! and records the DN the directory holds for them. Users with no directory
//! entry are flagged with [`INVALID_DN`](dirsync_identity::INVALID_DN) but
//! keep their permissions and team memberships.
//!
//! - [`ReconciliationEngine`] runs one synchronization against a
//!   [`DirectoryConnector`](dirsync_directory::DirectoryConnector) and an
//!   [`IdentityRepository`](dirsync_identity::IdentityRepository)
//! - [`SyncWorker`] consumes [`SyncTrigger`] messages from a queue and runs
//!   them one after another
//! - [`SyncReport`] summarizes a run

pub mod engine;
pub mod error;
pub mod report;
pub mod trigger;
pub mod worker;

pub use engine::{ReconciliationEngine, CONFIG_ERROR_CODE};
pub use error::{ReconciliationError, ReconciliationResult};
pub use report::{RunStatus, SyncMode, SyncReport, UserFailure, UserOutcome};
pub use trigger::SyncTrigger;
pub use worker::{ConfigLoader, SyncHandle, SyncWorker, WorkerError};
