//! Reconciliation engine.
//!
//! One run opens one directory session, reconciles the targeted users one at
//! a time and closes the session on every exit path. Per-user failures are
//! recorded and the batch continues; only failing to open the session (or to
//! read the targets from the repository) stops a run early.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use dirsync_directory::{
    principal_filter, DirectoryConfig, DirectoryConnector, DirectoryEntry, DirectorySession,
    SearchRequest,
};
use dirsync_identity::{DirectoryUser, IdentityRepository};

use crate::error::ReconciliationResult;
use crate::report::{SyncMode, SyncReport, UserOutcome};

/// Report error code for a configuration that cannot be used.
pub const CONFIG_ERROR_CODE: &str = "CONFIG_ERROR";

/// Reconciles directory-backed users against the directory.
pub struct ReconciliationEngine {
    connector: Arc<dyn DirectoryConnector>,
    repository: Arc<dyn IdentityRepository>,
}

impl ReconciliationEngine {
    #[must_use]
    pub fn new(
        connector: Arc<dyn DirectoryConnector>,
        repository: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            connector,
            repository,
        }
    }

    /// Run one synchronization.
    ///
    /// With `target_login` set only that user is reconciled; an unknown login
    /// is a no-op. A disabled configuration returns a skipped report without
    /// contacting the directory, and an active but invalid one (no base DN,
    /// non-LDAP URL) aborts before connecting.
    #[instrument(skip(self, config), fields(mode = tracing::field::Empty))]
    pub async fn run_sync(&self, config: &DirectoryConfig, target_login: Option<&str>) -> SyncReport {
        let mode = SyncMode::for_target(target_login);
        tracing::Span::current().record("mode", tracing::field::display(&mode));
        let mut report = SyncReport::start(mode);

        if !config.is_active() {
            debug!("Directory integration disabled, skipping synchronization");
            report.skip();
            return report;
        }

        if let Err(e) = config.validate() {
            error!(
                run_id = %report.run_id,
                error = %e,
                "Invalid directory configuration, aborting synchronization"
            );
            report.abort(CONFIG_ERROR_CODE, e.to_string());
            log_complete(&report);
            return report;
        }

        info!(
            run_id = %report.run_id,
            server_url = %config.server_url,
            base_dn = %config.base_dn,
            "Directory synchronization started"
        );

        let mut session = match self.connector.connect(config).await {
            Ok(session) => session,
            Err(e) => {
                error!(
                    run_id = %report.run_id,
                    server_url = %config.server_url,
                    error = %e,
                    error_code = e.error_code(),
                    "Failed to connect to directory, aborting synchronization"
                );
                report.abort(e.error_code(), e.to_string());
                log_complete(&report);
                return report;
            }
        };

        let result = self
            .reconcile_targets(session.as_mut(), config, target_login, &mut report)
            .await;

        if let Err(e) = session.close().await {
            warn!(run_id = %report.run_id, error = %e, "Failed to close directory session");
        }

        match result {
            Ok(()) => report.complete(),
            Err(e) => {
                error!(
                    run_id = %report.run_id,
                    error = %e,
                    error_code = e.error_code(),
                    "Failed to load users, aborting synchronization"
                );
                report.abort(e.error_code(), e.to_string());
            }
        }

        log_complete(&report);
        report
    }

    async fn reconcile_targets(
        &self,
        session: &mut dyn DirectorySession,
        config: &DirectoryConfig,
        target_login: Option<&str>,
        report: &mut SyncReport,
    ) -> ReconciliationResult<()> {
        let users = match target_login {
            Some(login) => match self.repository.get_directory_user(login).await? {
                Some(user) => vec![user],
                None => {
                    debug!(login = %login, "No directory-backed user with this login, nothing to do");
                    Vec::new()
                }
            },
            None => self.repository.list_directory_users().await?,
        };
        report.set_targeted(users.len());

        for user in users {
            let login = user.username().to_string();
            match self.reconcile_user(session, config, user).await {
                Ok(outcome) => report.record_outcome(outcome),
                Err(e) => {
                    warn!(
                        login = %login,
                        error = %e,
                        error_code = e.error_code(),
                        "Failed to reconcile user"
                    );
                    report.record_failure(&login, &e);
                }
            }
        }

        Ok(())
    }

    /// Look up one user and persist the DN the directory holds for them.
    ///
    /// On a search failure the user is left untouched.
    async fn reconcile_user(
        &self,
        session: &mut dyn DirectorySession,
        config: &DirectoryConfig,
        mut user: DirectoryUser,
    ) -> ReconciliationResult<UserOutcome> {
        let principal = config.format_principal(user.username());
        let request = SearchRequest::subtree(&config.base_dn, principal_filter(&principal));
        debug!(login = %user.username(), filter = %request.filter, "Looking up user");

        let entries = session.search(&request).await?;

        let outcome = match entries.first() {
            None => {
                info!(login = %user.username(), "User not found in directory, marking invalid");
                user.mark_invalid();
                UserOutcome::Invalidated
            }
            Some(entry) => {
                let ambiguous = entries.len() > 1;
                if ambiguous {
                    warn!(
                        login = %user.username(),
                        matches = entries.len(),
                        dn = %entry.dn,
                        "Multiple directory entries match user, using the first"
                    );
                }
                log_mail(config, &user, entry);
                user.set_dn(entry.dn.clone());
                UserOutcome::Verified { ambiguous }
            }
        };

        self.repository.update_directory_user(&user).await?;
        Ok(outcome)
    }
}

// TODO: store the mail attribute on DirectoryUser once the model carries an
// email field; until then it is only logged.
fn log_mail(config: &DirectoryConfig, user: &DirectoryUser, entry: &DirectoryEntry) {
    if let Some(mail) = entry.first_value(&config.mail_attribute) {
        debug!(
            login = %user.username(),
            attribute = %config.mail_attribute,
            mail = %mail,
            "Directory mail attribute"
        );
    }
}

fn log_complete(report: &SyncReport) {
    info!(
        run_id = %report.run_id,
        status = %report.status,
        targeted = report.users_targeted,
        verified = report.users_verified,
        invalidated = report.users_invalidated,
        failed = report.users_failed,
        duration_ms = report.duration_ms.unwrap_or(0),
        "Directory synchronization complete"
    );
}
