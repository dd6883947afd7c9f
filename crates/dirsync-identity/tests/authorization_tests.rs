//! Authorization Tests
//!
//! End-to-end checks through the public API: a seeded store, authorization
//! decisions on it, and reconciliation-style updates through the repository
//! observed from a shared model handle.

use dirsync_identity::{
    IdentityRepository, IdentitySeed, InMemoryIdentityRepository, PermissionModel, INVALID_DN,
};

const SEED: &str = r#"{
    "permissions": ["ViewPortfolio", "EditPortfolio", "ManageUsers"],
    "teams": [
        { "name": "Analysts", "permissions": ["ViewPortfolio"] },
        { "name": "Managers", "permissions": ["ViewPortfolio", "EditPortfolio"] }
    ],
    "directory_users": [
        { "username": "alice", "teams": ["Analysts", "Managers"] },
        { "username": "bob", "permissions": ["ManageUsers"] }
    ],
    "managed_users": [
        { "username": "root", "permissions": ["ManageUsers"], "teams": ["Managers"] }
    ]
}"#;

fn seeded() -> PermissionModel {
    IdentitySeed::from_json(SEED)
        .expect("seed parses")
        .into_model()
        .expect("seed is consistent")
}

#[test]
fn test_effective_permissions_deduplicate_across_teams() {
    let model = seeded();
    let alice = model.directory_user_by_login("alice").unwrap();

    let names: Vec<String> = model
        .effective_permissions(alice.id())
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["EditPortfolio", "ViewPortfolio"]);
    assert!(!model.has_permission(alice.id(), "ManageUsers"));
}

#[test]
fn test_managed_and_directory_users_share_teams() {
    let model = seeded();
    let managers = model.team_by_name("Managers").unwrap();

    let directory: Vec<&str> = model
        .team_directory_users(managers.id())
        .unwrap()
        .iter()
        .map(|u| u.username())
        .collect();
    let managed: Vec<&str> = model
        .team_managed_users(managers.id())
        .unwrap()
        .iter()
        .map(|u| u.username())
        .collect();

    assert_eq!(directory, vec!["alice"]);
    assert_eq!(managed, vec!["root"]);

    let root = model.managed_user_by_login("root").unwrap();
    assert!(model.has_permission(root.id(), "EditPortfolio"));
    assert!(model.has_permission(root.id(), "ManageUsers"));
}

#[test]
fn test_unknown_permission_is_never_held() {
    let model = seeded();
    let bob = model.directory_user_by_login("bob").unwrap();
    assert!(!model.has_permission(bob.id(), "DeleteEverything"));
    assert!(!model.has_permission(bob.id(), ""));
}

#[tokio::test]
async fn test_invalidated_user_keeps_authorization() {
    let repository = InMemoryIdentityRepository::new(seeded());
    let shared = repository.model();

    let mut alice = repository
        .get_directory_user("alice")
        .await
        .unwrap()
        .unwrap();
    alice.mark_invalid();
    repository.update_directory_user(&alice).await.unwrap();

    let model = shared.read().await;
    let stored = model.directory_user_by_login("alice").unwrap();
    assert_eq!(stored.dn(), Some(INVALID_DN));
    assert!(model.has_permission(stored.id(), "EditPortfolio"));
    assert_eq!(model.member_teams(stored.id()).unwrap().len(), 2);
    model.check_consistency().unwrap();
}
