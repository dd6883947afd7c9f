//! Directory configuration
//!
//! The settings a reconciliation run reads once at start. A configuration
//! value is passed explicitly into every run; nothing here is global.

use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::principal::format_principal;

/// Errors produced while loading directory configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required configuration variable is missing.
    #[error("Configuration missing: {var}")]
    Missing { var: String },

    /// Configuration value is invalid.
    #[error("Configuration invalid for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Connection and search settings for the directory service.
#[derive(Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Whether directory synchronization is turned on at all.
    #[serde(default)]
    pub enabled: bool,

    /// Directory server URL (e.g., "ldaps://dc1.example.com:636").
    #[serde(default)]
    pub server_url: String,

    /// Domain appended to login names to form principals (e.g., "EXAMPLE").
    #[serde(default)]
    pub domain: Option<String>,

    /// Base DN all user searches are scoped beneath.
    #[serde(default)]
    pub base_dn: String,

    /// Login name of the service's own bind identity.
    #[serde(default)]
    pub bind_username: String,

    /// Bind credential for the service identity.
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Name of the directory attribute holding a user's mail address.
    #[serde(default = "default_mail_attribute")]
    pub mail_attribute: String,

    /// Timeout for connecting and binding.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single search operation.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("enabled", &self.enabled)
            .field("server_url", &self.server_url)
            .field("domain", &self.domain)
            .field("base_dn", &self.base_dn)
            .field("bind_username", &self.bind_username)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("mail_attribute", &self.mail_attribute)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

fn default_mail_attribute() -> String {
    "mail".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_operation_timeout_secs() -> u64 {
    30
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: String::new(),
            domain: None,
            base_dn: String::new(),
            bind_username: String::new(),
            bind_password: None,
            mail_attribute: default_mail_attribute(),
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl DirectoryConfig {
    /// Create an enabled configuration with the required fields.
    pub fn new(server_url: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            enabled: true,
            server_url: server_url.into(),
            base_dn: base_dn.into(),
            ..Self::default()
        }
    }

    /// Set the domain used for principal formatting.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the service bind identity.
    pub fn with_bind(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_username = username.into();
        self.bind_password = Some(password.into());
        self
    }

    /// Set the mail attribute name.
    pub fn with_mail_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.mail_attribute = attribute.into();
        self
    }

    /// Set connect and search timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_secs: u64, operation_secs: u64) -> Self {
        self.connect_timeout_secs = connect_secs;
        self.operation_timeout_secs = operation_secs;
        self
    }

    /// Turn synchronization off without clearing the rest.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether a run should touch the directory at all.
    ///
    /// A disabled flag or a blank server URL turns a run into a no-op.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.server_url.trim().is_empty()
    }

    /// Format a login name into a directory principal with this domain.
    #[must_use]
    pub fn format_principal(&self, login: &str) -> String {
        format_principal(login, self.domain.as_deref())
    }

    /// Principal used for the service bind.
    #[must_use]
    pub fn bind_principal(&self) -> String {
        self.format_principal(&self.bind_username)
    }

    /// Bind credential, empty when none is configured.
    #[must_use]
    pub fn bind_credential(&self) -> &str {
        self.bind_password.as_deref().unwrap_or("")
    }

    /// Connect timeout as a duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Search timeout as a duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Load configuration from environment variables.
    ///
    /// - `LDAP_ENABLED`: true/false (default: false)
    /// - `LDAP_SERVER_URL`: server URL; blank disables synchronization
    /// - `LDAP_DOMAIN`: optional principal domain
    /// - `LDAP_BASEDN`: search base (required when active)
    /// - `LDAP_BIND_USERNAME`, `LDAP_BIND_PASSWORD`: service bind identity
    /// - `LDAP_ATTRIBUTE_MAIL`: mail attribute name (default: "mail")
    /// - `LDAP_CONNECT_TIMEOUT_SECS`, `LDAP_OPERATION_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup("LDAP_ENABLED") {
            Some(v) => parse_bool("LDAP_ENABLED", &v)?,
            None => false,
        };

        let server_url = lookup("LDAP_SERVER_URL").unwrap_or_default();
        let domain = lookup("LDAP_DOMAIN").filter(|d| !d.trim().is_empty());
        let base_dn = lookup("LDAP_BASEDN").unwrap_or_default();
        let bind_username = lookup("LDAP_BIND_USERNAME").unwrap_or_default();
        let bind_password = lookup("LDAP_BIND_PASSWORD");
        let mail_attribute =
            lookup("LDAP_ATTRIBUTE_MAIL").unwrap_or_else(|| defaults.mail_attribute.clone());

        let connect_timeout_secs = match lookup("LDAP_CONNECT_TIMEOUT_SECS") {
            Some(v) => parse_secs("LDAP_CONNECT_TIMEOUT_SECS", &v)?,
            None => defaults.connect_timeout_secs,
        };
        let operation_timeout_secs = match lookup("LDAP_OPERATION_TIMEOUT_SECS") {
            Some(v) => parse_secs("LDAP_OPERATION_TIMEOUT_SECS", &v)?,
            None => defaults.operation_timeout_secs,
        };

        let config = Self {
            enabled,
            server_url,
            domain,
            base_dn,
            bind_username,
            bind_password,
            mail_attribute,
            connect_timeout_secs,
            operation_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate an active configuration. Inactive configurations always pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_active() {
            return Ok(());
        }

        let url = self.server_url.trim();
        if !(url.starts_with("ldap://") || url.starts_with("ldaps://")) {
            return Err(ConfigError::Invalid {
                var: "LDAP_SERVER_URL".to_string(),
                reason: format!("expected an ldap:// or ldaps:// URL, got '{url}'"),
            });
        }

        if self.base_dn.trim().is_empty() {
            return Err(ConfigError::Missing {
                var: "LDAP_BASEDN".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("not a boolean: {other}"),
        }),
    }
}

fn parse_secs(var: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("not a number of seconds: {value}"),
    })
}
