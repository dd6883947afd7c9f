//! Identity repository
//!
//! The seam between reconciliation and persisted state. The engine only
//! lists, fetches and updates directory-backed users; everything else about
//! storage belongs to the implementation.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{DirectoryUser, PermissionModel};

/// Store of directory-backed users.
///
/// `update_directory_user` must be safe under concurrent writers; the last
/// write of a user's DN wins.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Every directory-backed user.
    async fn list_directory_users(&self) -> RepositoryResult<Vec<DirectoryUser>>;

    /// One directory-backed user by login name.
    async fn get_directory_user(&self, login: &str) -> RepositoryResult<Option<DirectoryUser>>;

    /// Persist the reconciled state of a user.
    ///
    /// Only the DN is taken from `user`; associations are maintained through
    /// [`PermissionModel`] and the login name may never change.
    async fn update_directory_user(&self, user: &DirectoryUser) -> RepositoryResult<()>;
}

/// [`IdentityRepository`] over a shared in-memory [`PermissionModel`].
///
/// The same model handle can be used for authorization checks while a
/// reconciliation run updates it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityRepository {
    model: Arc<RwLock<PermissionModel>>,
}

impl InMemoryIdentityRepository {
    /// Wrap a model.
    #[must_use]
    pub fn new(model: PermissionModel) -> Self {
        Self {
            model: Arc::new(RwLock::new(model)),
        }
    }

    /// Shared handle to the underlying model.
    #[must_use]
    pub fn model(&self) -> Arc<RwLock<PermissionModel>> {
        Arc::clone(&self.model)
    }

    /// Copy of the current model state.
    pub async fn snapshot(&self) -> PermissionModel {
        self.model.read().await.clone()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn list_directory_users(&self) -> RepositoryResult<Vec<DirectoryUser>> {
        let model = self.model.read().await;
        Ok(model.directory_users().into_iter().cloned().collect())
    }

    async fn get_directory_user(&self, login: &str) -> RepositoryResult<Option<DirectoryUser>> {
        let model = self.model.read().await;
        Ok(model.directory_user_by_login(login).cloned())
    }

    async fn update_directory_user(&self, user: &DirectoryUser) -> RepositoryResult<()> {
        let mut model = self.model.write().await;

        let stored = model
            .directory_user(user.id())
            .ok_or_else(|| RepositoryError::NotFound {
                login: user.username().to_string(),
            })?;

        if stored.username() != user.username() {
            return Err(RepositoryError::LoginChanged {
                id: user.id(),
                stored: stored.username().to_string(),
                requested: user.username().to_string(),
            });
        }

        model.set_directory_user_dn(user.id(), user.dn().map(str::to_string))?;
        debug!(login = %user.username(), dn = ?user.dn(), "Directory user updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::INVALID_DN;

    fn seeded() -> InMemoryIdentityRepository {
        let mut model = PermissionModel::new();
        model.add_directory_user("bob").unwrap();
        model.add_directory_user("alice").unwrap();
        model.add_managed_user("carol").unwrap();
        InMemoryIdentityRepository::new(model)
    }

    #[tokio::test]
    async fn test_list_returns_only_directory_users_in_login_order() {
        let repo = seeded();
        let users = repo.list_directory_users().await.unwrap();
        let logins: Vec<&str> = users.iter().map(DirectoryUser::username).collect();
        assert_eq!(logins, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_get_unknown_login_is_none() {
        let repo = seeded();
        assert!(repo.get_directory_user("carol").await.unwrap().is_none());
        assert!(repo.get_directory_user("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_persists_dn() {
        let repo = seeded();
        let mut alice = repo.get_directory_user("alice").await.unwrap().unwrap();
        alice.mark_invalid();
        repo.update_directory_user(&alice).await.unwrap();

        let stored = repo.get_directory_user("alice").await.unwrap().unwrap();
        assert_eq!(stored.dn(), Some(INVALID_DN));
    }

    #[tokio::test]
    async fn test_update_unknown_user_fails() {
        let repo = seeded();
        let ghost = DirectoryUser::new("ghost");
        assert!(matches!(
            repo.update_directory_user(&ghost).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_with_blank_dn_is_rejected() {
        let repo = seeded();
        let mut alice = repo.get_directory_user("alice").await.unwrap().unwrap();
        alice.set_dn("");
        assert!(matches!(
            repo.update_directory_user(&alice).await,
            Err(RepositoryError::Model(ModelError::BlankDn { .. }))
        ));
        assert!(repo.get_directory_user("alice").await.unwrap().unwrap().dn().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_updates_last_writer_wins() {
        let repo = seeded();
        let alice = repo.get_directory_user("alice").await.unwrap().unwrap();

        let mut first = alice.clone();
        first.set_dn("CN=Alice,OU=Old,DC=example,DC=com");
        let mut second = alice.clone();
        second.set_dn("CN=Alice,OU=New,DC=example,DC=com");

        let (a, b) = tokio::join!(
            repo.update_directory_user(&first),
            repo.update_directory_user(&second)
        );
        a.unwrap();
        b.unwrap();

        let stored = repo.get_directory_user("alice").await.unwrap().unwrap();
        assert!(stored.is_directory_verified());
        repo.snapshot().await.check_consistency().unwrap();
    }
}
