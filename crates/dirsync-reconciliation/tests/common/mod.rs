//! Test helpers for dirsync-reconciliation integration tests.
//!
//! Hand-written mocks for the directory and repository seams, each with
//! atomic call counters so tests can assert on side effects.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dirsync_directory::{
    principal_filter, DirectoryConfig, DirectoryConnector, DirectoryEntry, DirectoryError,
    DirectoryResult, DirectorySession, SearchRequest,
};
use dirsync_identity::{
    DirectoryUser, IdentityRepository, InMemoryIdentityRepository, PermissionModel,
    RepositoryError, RepositoryResult,
};

// =============================================================================
// Mock Directory
// =============================================================================

/// How `open` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    Success,
    ConnectionRefused,
    AuthenticationFailed,
    Timeout,
}

/// How a search for one principal behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    Error,
    Timeout,
}

/// Directory content and call log shared by the connector and its sessions.
pub struct DirectoryState {
    open_behavior: Mutex<OpenBehavior>,
    entries: Mutex<HashMap<String, Vec<DirectoryEntry>>>,
    failures: Mutex<HashMap<String, SearchFailure>>,
    requests: Mutex<Vec<SearchRequest>>,
    binds: Mutex<Vec<(String, String, String)>>,
    connect_timeouts: Mutex<Vec<(u64, u64)>>,
    pub opens: AtomicUsize,
    pub searches: AtomicUsize,
    pub closes: AtomicUsize,
}

impl DirectoryState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            open_behavior: Mutex::new(OpenBehavior::Success),
            entries: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            binds: Mutex::new(Vec::new()),
            connect_timeouts: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn set_open_behavior(&self, behavior: OpenBehavior) {
        *self.open_behavior.lock().unwrap() = behavior;
    }

    /// Entries returned for the filter built from `principal`.
    pub fn set_entries(&self, principal: &str, dns: &[&str]) {
        let entries = dns.iter().map(|dn| DirectoryEntry::new(*dn)).collect();
        self.entries
            .lock()
            .unwrap()
            .insert(principal_filter(principal), entries);
    }

    pub fn set_entry(&self, principal: &str, entry: DirectoryEntry) {
        self.entries
            .lock()
            .unwrap()
            .insert(principal_filter(principal), vec![entry]);
    }

    pub fn remove_entries(&self, principal: &str) {
        self.entries.lock().unwrap().remove(&principal_filter(principal));
    }

    pub fn fail_search(&self, principal: &str, failure: SearchFailure) {
        self.failures
            .lock()
            .unwrap()
            .insert(principal_filter(principal), failure);
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `(server_url, principal, credential)` of every open attempt.
    pub fn binds(&self) -> Vec<(String, String, String)> {
        self.binds.lock().unwrap().clone()
    }

    /// `(connect, operation)` timeouts of the configuration each run used.
    pub fn connect_timeouts(&self) -> Vec<(u64, u64)> {
        self.connect_timeouts.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    state: Arc<DirectoryState>,
}

impl MockConnector {
    pub fn new(state: Arc<DirectoryState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl DirectoryConnector for MockConnector {
    async fn open(
        &self,
        server_url: &str,
        bind_principal: &str,
        bind_credential: &str,
    ) -> DirectoryResult<Box<dyn DirectorySession>> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        self.state.binds.lock().unwrap().push((
            server_url.to_string(),
            bind_principal.to_string(),
            bind_credential.to_string(),
        ));

        let behavior = *self.state.open_behavior.lock().unwrap();
        match behavior {
            OpenBehavior::Success => Ok(Box::new(MockSession {
                state: Arc::clone(&self.state),
                closed: false,
            })),
            OpenBehavior::ConnectionRefused => {
                Err(DirectoryError::connection_failed("connection refused"))
            }
            OpenBehavior::AuthenticationFailed => Err(DirectoryError::AuthenticationFailed {
                principal: bind_principal.to_string(),
            }),
            OpenBehavior::Timeout => Err(DirectoryError::ConnectionTimeout { timeout_secs: 10 }),
        }
    }

    async fn connect(&self, config: &DirectoryConfig) -> DirectoryResult<Box<dyn DirectorySession>> {
        self.state
            .connect_timeouts
            .lock()
            .unwrap()
            .push((config.connect_timeout_secs, config.operation_timeout_secs));
        self.open(
            &config.server_url,
            &config.bind_principal(),
            config.bind_credential(),
        )
        .await
    }
}

pub struct MockSession {
    state: Arc<DirectoryState>,
    closed: bool,
}

#[async_trait]
impl DirectorySession for MockSession {
    async fn search(&mut self, request: &SearchRequest) -> DirectoryResult<Vec<DirectoryEntry>> {
        if self.closed {
            return Err(DirectoryError::SessionClosed);
        }
        self.state.searches.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().unwrap().push(request.clone());

        let failure = self
            .state
            .failures
            .lock()
            .unwrap()
            .get(&request.filter)
            .copied();
        match failure {
            Some(SearchFailure::Error) => Err(DirectoryError::search_failed(
                request.base_dn.clone(),
                "server unavailable",
            )),
            Some(SearchFailure::Timeout) => Err(DirectoryError::SearchTimeout { timeout_secs: 30 }),
            None => Ok(self
                .state
                .entries
                .lock()
                .unwrap()
                .get(&request.filter)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// =============================================================================
// Mock Repository
// =============================================================================

/// Counting wrapper around [`InMemoryIdentityRepository`] with injectable
/// failures.
pub struct CountingRepository {
    inner: InMemoryIdentityRepository,
    fail_list: Mutex<bool>,
    fail_updates: Mutex<HashSet<String>>,
    pub lists: AtomicUsize,
    pub gets: AtomicUsize,
    pub updates: AtomicUsize,
}

impl CountingRepository {
    pub fn new(model: PermissionModel) -> Self {
        Self {
            inner: InMemoryIdentityRepository::new(model),
            fail_list: Mutex::new(false),
            fail_updates: Mutex::new(HashSet::new()),
            lists: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    pub fn fail_update(&self, login: &str) {
        self.fail_updates.lock().unwrap().insert(login.to_string());
    }

    pub async fn snapshot(&self) -> PermissionModel {
        self.inner.snapshot().await
    }

    pub async fn dn_of(&self, login: &str) -> Option<String> {
        self.snapshot()
            .await
            .directory_user_by_login(login)
            .and_then(|u| u.dn().map(str::to_string))
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityRepository for CountingRepository {
    async fn list_directory_users(&self) -> RepositoryResult<Vec<DirectoryUser>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if *self.fail_list.lock().unwrap() {
            return Err(RepositoryError::Storage("connection reset".to_string()));
        }
        self.inner.list_directory_users().await
    }

    async fn get_directory_user(&self, login: &str) -> RepositoryResult<Option<DirectoryUser>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_directory_user(login).await
    }

    async fn update_directory_user(&self, user: &DirectoryUser) -> RepositoryResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.lock().unwrap().contains(user.username()) {
            return Err(RepositoryError::Storage("write rejected".to_string()));
        }
        self.inner.update_directory_user(user).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub const SERVER_URL: &str = "ldap://dc01.example.com:389";
pub const BASE_DN: &str = "DC=example,DC=com";
pub const DOMAIN: &str = "EXAMPLE";

pub fn config() -> DirectoryConfig {
    DirectoryConfig::new(SERVER_URL, BASE_DN)
        .with_domain(DOMAIN)
        .with_bind("svc-dirsync", "s3cret")
}

pub fn user_dn(name: &str) -> String {
    format!("CN={name},OU=Users,DC=example,DC=com")
}

/// alice, bob and carol as directory users; alice holds `ViewPortfolio`
/// directly and `ManageUsers` through the `Administrators` team; dave is a
/// managed user.
pub fn model() -> PermissionModel {
    let mut model = PermissionModel::new();
    let view = model.create_permission("ViewPortfolio").unwrap();
    let manage = model.create_permission("ManageUsers").unwrap();
    let admins = model.create_team("Administrators").unwrap();
    model.grant(manage, admins).unwrap();

    let alice = model.add_directory_user("alice").unwrap();
    model.grant(view, alice).unwrap();
    model.add_member(admins, alice).unwrap();

    model.add_directory_user("bob").unwrap();
    model.add_directory_user("carol").unwrap();

    let dave = model.add_managed_user("dave").unwrap();
    model.add_member(admins, dave).unwrap();
    model
}

/// Directory holding an entry for every directory user of [`model`].
pub fn populated_directory() -> Arc<DirectoryState> {
    let state = DirectoryState::new();
    for login in ["alice", "bob", "carol"] {
        state.set_entries(&format!("{login}@{DOMAIN}"), &[&user_dn(login)]);
    }
    state
}
