//! Directory session traits
//!
//! A [`DirectoryConnector`] opens authenticated sessions; a
//! [`DirectorySession`] runs read-only searches and must be closed by its
//! owner. `close` is idempotent so it can sit on every exit path.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::DirectoryConfig;
use crate::error::DirectoryResult;

/// How far below the base DN a search reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the base entry itself.
    Base,
    /// Direct children of the base entry.
    OneLevel,
    /// The base entry and all of its descendants.
    #[default]
    Subtree,
}

/// A single search against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// DN the search is scoped beneath.
    pub base_dn: String,
    /// LDAP filter string.
    pub filter: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Attributes to return. Empty leaves the choice to the server's default
    /// return policy.
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Subtree search with no attribute projection.
    pub fn subtree(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            scope: SearchScope::Subtree,
            attributes: Vec::new(),
        }
    }
}

/// An entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Full distinguished name of the entry.
    pub dn: String,
    /// Attribute values keyed by attribute name.
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Entry with a DN and no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// First value of an attribute. Attribute names compare case-insensitively.
    #[must_use]
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// An authenticated, single-owner connection to the directory.
///
/// Implementations are not required to support concurrent use; callers issue
/// one search at a time.
#[async_trait]
pub trait DirectorySession: Send {
    /// Run a synchronous lookup and return every matching entry in the order
    /// the server produced them.
    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&mut self) -> DirectoryResult<()>;

    /// Whether `close` has already run.
    fn is_closed(&self) -> bool;
}

/// Opens directory sessions.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect to `server_url` and bind with the service's own identity.
    ///
    /// Any partially-open connection is released before an error is returned.
    async fn open(
        &self,
        server_url: &str,
        bind_principal: &str,
        bind_credential: &str,
    ) -> DirectoryResult<Box<dyn DirectorySession>>;

    /// Open a session for one run, binding with the configured service
    /// identity.
    ///
    /// Implementations with tunable transport settings override this to take
    /// them from `config`, so a configuration reloaded between runs applies
    /// to the next session.
    async fn connect(&self, config: &DirectoryConfig) -> DirectoryResult<Box<dyn DirectorySession>> {
        self.open(
            &config.server_url,
            &config.bind_principal(),
            config.bind_credential(),
        )
        .await
    }
}
