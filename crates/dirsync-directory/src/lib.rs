//! # Directory Session
//!
//! Authenticated access to an LDAP/Active Directory service for dirsync.
//!
//! A reconciliation run opens exactly one [`DirectorySession`] through a
//! [`DirectoryConnector`], issues read-only searches against it and closes it
//! on every exit path. Nothing in this crate writes to the directory.
//!
//! ## Example
//!
//! ```ignore
//! use dirsync_directory::{DirectoryConfig, DirectoryConnector, LdapConnector, SearchRequest};
//!
//! let config = DirectoryConfig::new("ldap://dc1.example.com:389", "dc=example,dc=com")
//!     .with_domain("EXAMPLE")
//!     .with_bind("svc-dirsync", "secret");
//!
//! let connector = LdapConnector::from_config(&config);
//! let mut session = connector
//!     .open(&config.server_url, &config.bind_principal(), config.bind_credential())
//!     .await?;
//!
//! let filter = dirsync_directory::principal_filter(&config.format_principal("alice"));
//! let entries = session.search(&SearchRequest::subtree(&config.base_dn, filter)).await;
//! session.close().await?;
//! ```

pub mod config;
pub mod error;
pub mod ldap;
pub mod principal;
pub mod session;

pub use config::{ConfigError, DirectoryConfig};
pub use error::{DirectoryError, DirectoryResult};
pub use ldap::{LdapConnector, LdapSession};
pub use principal::{escape_filter_value, format_principal, principal_filter, PRINCIPAL_ATTRIBUTE};
pub use session::{DirectoryConnector, DirectoryEntry, DirectorySession, SearchRequest, SearchScope};
