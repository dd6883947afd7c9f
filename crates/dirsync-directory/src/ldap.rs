//! LDAP session implementation
//!
//! [`DirectoryConnector`] and [`DirectorySession`] over `ldap3`.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, DirectoryResult};
use crate::session::{
    DirectoryConnector, DirectoryEntry, DirectorySession, SearchRequest, SearchScope,
};

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Opens LDAP sessions with fixed connect and search timeouts.
#[derive(Debug, Clone)]
pub struct LdapConnector {
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl LdapConnector {
    /// Create a connector with explicit timeouts.
    #[must_use]
    pub fn new(connect_timeout: Duration, operation_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            operation_timeout,
        }
    }

    /// Create a connector using the timeouts of a directory configuration.
    #[must_use]
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(config.connect_timeout(), config.operation_timeout())
    }

    fn connect_error(&self, message: String, err: LdapError) -> DirectoryError {
        if matches!(err, LdapError::Timeout { .. }) {
            DirectoryError::ConnectionTimeout {
                timeout_secs: self.connect_timeout.as_secs(),
            }
        } else {
            DirectoryError::connection_failed_with_source(message, err)
        }
    }

    async fn bind(
        &self,
        ldap: &mut Ldap,
        bind_principal: &str,
        bind_credential: &str,
    ) -> DirectoryResult<()> {
        debug!(principal = %bind_principal, "Performing LDAP bind");

        let result = ldap
            .with_timeout(self.connect_timeout)
            .simple_bind(bind_principal, bind_credential)
            .await
            .map_err(|e| self.connect_error(format!("LDAP bind failed for {bind_principal}"), e))?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(DirectoryError::AuthenticationFailed {
                principal: bind_principal.to_string(),
            });
        }
        if result.rc != 0 {
            return Err(DirectoryError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    #[instrument(skip(self, bind_credential))]
    async fn open(
        &self,
        server_url: &str,
        bind_principal: &str,
        bind_credential: &str,
    ) -> DirectoryResult<Box<dyn DirectorySession>> {
        debug!(url = %server_url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, server_url)
            .await
            .map_err(|e| {
                self.connect_error(format!("Failed to connect to LDAP server at {server_url}"), e)
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let Err(err) = self.bind(&mut ldap, bind_principal, bind_credential).await {
            // The transport is up even though the bind failed; release it.
            if let Err(e) = ldap.unbind().await {
                debug!(error = %e, "Unbind after failed bind");
            }
            return Err(err);
        }

        info!(url = %server_url, "LDAP session established");

        Ok(Box::new(LdapSession {
            ldap: Some(ldap),
            operation_timeout: self.operation_timeout,
        }))
    }

    async fn connect(&self, config: &DirectoryConfig) -> DirectoryResult<Box<dyn DirectorySession>> {
        Self::from_config(config)
            .open(
                &config.server_url,
                &config.bind_principal(),
                config.bind_credential(),
            )
            .await
    }
}

impl Default for LdapConnector {
    fn default() -> Self {
        Self::from_config(&DirectoryConfig::default())
    }
}

/// A bound LDAP connection.
pub struct LdapSession {
    ldap: Option<Ldap>,
    operation_timeout: Duration,
}

impl LdapSession {
    fn scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    fn entry(entry: SearchEntry) -> DirectoryEntry {
        DirectoryEntry {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<Vec<DirectoryEntry>> {
        let timeout = self.operation_timeout;
        let ldap = self.ldap.as_mut().ok_or(DirectoryError::SessionClosed)?;

        let map_err = |e: LdapError| {
            if matches!(e, LdapError::Timeout { .. }) {
                DirectoryError::SearchTimeout {
                    timeout_secs: timeout.as_secs(),
                }
            } else {
                DirectoryError::search_failed_with_source(
                    request.base_dn.clone(),
                    format!("search {} failed", request.filter),
                    e,
                )
            }
        };

        let result = ldap
            .with_timeout(timeout)
            .search(
                &request.base_dn,
                Self::scope(request.scope),
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(map_err)?;

        let (entries, _res) = result.success().map_err(map_err)?;

        Ok(entries
            .into_iter()
            .map(|e| Self::entry(SearchEntry::construct(e)))
            .collect())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        if let Some(mut ldap) = self.ldap.take() {
            ldap.unbind().await.map_err(|e| {
                DirectoryError::connection_failed_with_source("Error during LDAP unbind", e)
            })?;
            debug!("LDAP session closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.ldap.is_none()
    }
}
