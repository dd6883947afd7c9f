//! Permission, team and user entities.
//!
//! Entities live in an arena ([`PermissionModel`]) and refer to each other by
//! identifier only. Every association is stored on both sides as an ordered
//! set of identifiers; all mutations go through the model so both sides
//! always change together, and [`PermissionModel::check_consistency`]
//! verifies the symmetry.
//!
//! Listings are returned in name order (permission name, team name or login
//! name) so presentation is deterministic.

use std::collections::{BTreeSet, HashMap};

use dirsync_core::{ManagedUserId, PermissionId, TeamId, UserId};

use crate::error::{ModelError, ModelResult};
use crate::validation::{PermissionName, ValidationError};

/// DN assigned to a local user whose directory record was not found.
pub const INVALID_DN: &str = "INVALID";

/// A user that can belong to teams and hold permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Member {
    /// Directory-backed user.
    Directory(UserId),
    /// Locally-managed user.
    Managed(ManagedUserId),
}

impl From<UserId> for Member {
    fn from(id: UserId) -> Self {
        Member::Directory(id)
    }
}

impl From<ManagedUserId> for Member {
    fn from(id: ManagedUserId) -> Self {
        Member::Managed(id)
    }
}

/// Anything a permission can be granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grantee {
    /// A team; members inherit the permission.
    Team(TeamId),
    /// A single user.
    Member(Member),
}

impl From<TeamId> for Grantee {
    fn from(id: TeamId) -> Self {
        Grantee::Team(id)
    }
}

impl From<Member> for Grantee {
    fn from(member: Member) -> Self {
        Grantee::Member(member)
    }
}

impl From<UserId> for Grantee {
    fn from(id: UserId) -> Self {
        Grantee::Member(Member::Directory(id))
    }
}

impl From<ManagedUserId> for Grantee {
    fn from(id: ManagedUserId) -> Self {
        Grantee::Member(Member::Managed(id))
    }
}

/// A named capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    id: PermissionId,
    name: PermissionName,
    teams: BTreeSet<TeamId>,
    directory_users: BTreeSet<UserId>,
    managed_users: BTreeSet<ManagedUserId>,
}

impl Permission {
    fn new(name: PermissionName) -> Self {
        Self {
            id: PermissionId::new(),
            name,
            teams: BTreeSet::new(),
            directory_users: BTreeSet::new(),
            managed_users: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &PermissionName {
        &self.name
    }

    /// Number of teams and users this permission is granted to.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.teams.len() + self.directory_users.len() + self.managed_users.len()
    }
}

/// A named group owning permissions and users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id: TeamId,
    name: String,
    permissions: BTreeSet<PermissionId>,
    directory_users: BTreeSet<UserId>,
    managed_users: BTreeSet<ManagedUserId>,
}

impl Team {
    #[must_use]
    pub fn id(&self) -> TeamId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permissions
    }
}

/// Local projection of a directory principal.
///
/// The login name is fixed at creation and is the join key against the
/// directory. The DN is `None` until the first reconciliation, then either
/// the directory-assigned DN or [`INVALID_DN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    id: UserId,
    username: String,
    dn: Option<String>,
    permissions: BTreeSet<PermissionId>,
    teams: BTreeSet<TeamId>,
}

impl DirectoryUser {
    /// A user record with no associations and no DN.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            dn: None,
            permissions: BTreeSet::new(),
            teams: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn dn(&self) -> Option<&str> {
        self.dn.as_deref()
    }

    /// Record the DN the directory holds for this user.
    pub fn set_dn(&mut self, dn: impl Into<String>) {
        self.dn = Some(dn.into());
    }

    /// Record that the directory has no entry for this user.
    pub fn mark_invalid(&mut self) {
        self.dn = Some(INVALID_DN.to_string());
    }

    /// Whether the last reconciliation found no directory entry.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.dn.as_deref() == Some(INVALID_DN)
    }

    /// Whether the last reconciliation matched a directory entry.
    #[must_use]
    pub fn is_directory_verified(&self) -> bool {
        matches!(self.dn.as_deref(), Some(dn) if dn != INVALID_DN)
    }

    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permissions
    }

    #[must_use]
    pub fn team_ids(&self) -> &BTreeSet<TeamId> {
        &self.teams
    }
}

/// A user managed locally, with no directory counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedUser {
    id: ManagedUserId,
    username: String,
    permissions: BTreeSet<PermissionId>,
    teams: BTreeSet<TeamId>,
}

impl ManagedUser {
    #[must_use]
    pub fn id(&self) -> ManagedUserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permissions
    }

    #[must_use]
    pub fn team_ids(&self) -> &BTreeSet<TeamId> {
        &self.teams
    }
}

/// Arena of permissions, teams and users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionModel {
    permissions: HashMap<PermissionId, Permission>,
    permission_names: HashMap<String, PermissionId>,
    teams: HashMap<TeamId, Team>,
    directory_users: HashMap<UserId, DirectoryUser>,
    directory_logins: HashMap<String, UserId>,
    managed_users: HashMap<ManagedUserId, ManagedUser>,
    managed_logins: HashMap<String, ManagedUserId>,
}

impl PermissionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Create a permission. The name is validated and must be unique
    /// (case-sensitive).
    pub fn create_permission(&mut self, name: &str) -> ModelResult<PermissionId> {
        let name = PermissionName::parse(name)?;
        if self.permission_names.contains_key(name.as_str()) {
            return Err(ModelError::DuplicatePermission {
                name: name.to_string(),
            });
        }

        let permission = Permission::new(name);
        let id = permission.id;
        self.permission_names
            .insert(permission.name.to_string(), id);
        self.permissions.insert(id, permission);
        Ok(id)
    }

    /// Rename a permission, applying the same rules as creation.
    pub fn rename_permission(&mut self, id: PermissionId, name: &str) -> ModelResult<()> {
        let name = PermissionName::parse(name)?;
        if let Some(existing) = self.permission_names.get(name.as_str()) {
            if *existing == id {
                return Ok(());
            }
            return Err(ModelError::DuplicatePermission {
                name: name.to_string(),
            });
        }

        let permission = self
            .permissions
            .get_mut(&id)
            .ok_or(ModelError::PermissionNotFound(id))?;
        self.permission_names.remove(permission.name.as_str());
        self.permission_names.insert(name.to_string(), id);
        permission.name = name;
        Ok(())
    }

    /// Remove a permission that is no longer granted to anything.
    pub fn remove_permission(&mut self, id: PermissionId) -> ModelResult<Permission> {
        let permission = self
            .permissions
            .get(&id)
            .ok_or(ModelError::PermissionNotFound(id))?;

        let references = permission.reference_count();
        if references > 0 {
            return Err(ModelError::PermissionInUse {
                name: permission.name.to_string(),
                references,
            });
        }

        self.permission_names.remove(permission.name.as_str());
        self.permissions
            .remove(&id)
            .ok_or(ModelError::PermissionNotFound(id))
    }

    /// Create a team with a unique, non-blank name.
    pub fn create_team(&mut self, name: &str) -> ModelResult<TeamId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "required", "The team name is required").into());
        }
        if self.teams.values().any(|t| t.name == name) {
            return Err(ModelError::DuplicateTeam {
                name: name.to_string(),
            });
        }

        let team = Team {
            id: TeamId::new(),
            name: name.to_string(),
            permissions: BTreeSet::new(),
            directory_users: BTreeSet::new(),
            managed_users: BTreeSet::new(),
        };
        let id = team.id;
        self.teams.insert(id, team);
        Ok(id)
    }

    /// Provision a directory-backed user. The login name is immutable.
    pub fn add_directory_user(&mut self, username: &str) -> ModelResult<UserId> {
        let username = require_login(username)?;
        if self.directory_logins.contains_key(&username) {
            return Err(ModelError::DuplicateLogin { login: username });
        }

        let user = DirectoryUser::new(username.clone());
        let id = user.id;
        self.directory_logins.insert(username, id);
        self.directory_users.insert(id, user);
        Ok(id)
    }

    /// Provision a locally-managed user.
    pub fn add_managed_user(&mut self, username: &str) -> ModelResult<ManagedUserId> {
        let username = require_login(username)?;
        if self.managed_logins.contains_key(&username) {
            return Err(ModelError::DuplicateLogin { login: username });
        }

        let user = ManagedUser {
            id: ManagedUserId::new(),
            username: username.clone(),
            permissions: BTreeSet::new(),
            teams: BTreeSet::new(),
        };
        let id = user.id;
        self.managed_logins.insert(username, id);
        self.managed_users.insert(id, user);
        Ok(id)
    }

    /// Set or clear the DN of a directory user. A DN, when set, is either
    /// a directory DN or [`INVALID_DN`]; blank values are rejected.
    pub fn set_directory_user_dn(&mut self, id: UserId, dn: Option<String>) -> ModelResult<()> {
        let user = self
            .directory_users
            .get_mut(&id)
            .ok_or(ModelError::UserNotFound(id))?;
        if dn.as_deref().is_some_and(|dn| dn.trim().is_empty()) {
            return Err(ModelError::BlankDn {
                login: user.username.clone(),
            });
        }
        user.dn = dn;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    /// Grant a permission. Returns `false` when it was already granted.
    pub fn grant(&mut self, permission: PermissionId, grantee: impl Into<Grantee>) -> ModelResult<bool> {
        let grantee = grantee.into();
        if !self.permissions.contains_key(&permission) {
            return Err(ModelError::PermissionNotFound(permission));
        }

        let added = self.grantee_permissions_mut(grantee)?.insert(permission);
        let entry = self
            .permissions
            .get_mut(&permission)
            .ok_or(ModelError::PermissionNotFound(permission))?;
        match grantee {
            Grantee::Team(id) => entry.teams.insert(id),
            Grantee::Member(Member::Directory(id)) => entry.directory_users.insert(id),
            Grantee::Member(Member::Managed(id)) => entry.managed_users.insert(id),
        };

        debug_assert!(self.check_consistency().is_ok());
        Ok(added)
    }

    /// Revoke a permission. Returns `false` when it was not granted.
    pub fn revoke(&mut self, permission: PermissionId, grantee: impl Into<Grantee>) -> ModelResult<bool> {
        let grantee = grantee.into();
        if !self.permissions.contains_key(&permission) {
            return Err(ModelError::PermissionNotFound(permission));
        }

        let removed = self.grantee_permissions_mut(grantee)?.remove(&permission);
        let entry = self
            .permissions
            .get_mut(&permission)
            .ok_or(ModelError::PermissionNotFound(permission))?;
        match grantee {
            Grantee::Team(id) => entry.teams.remove(&id),
            Grantee::Member(Member::Directory(id)) => entry.directory_users.remove(&id),
            Grantee::Member(Member::Managed(id)) => entry.managed_users.remove(&id),
        };

        debug_assert!(self.check_consistency().is_ok());
        Ok(removed)
    }

    /// Add a user to a team. Returns `false` when already a member.
    pub fn add_member(&mut self, team: TeamId, member: impl Into<Member>) -> ModelResult<bool> {
        let member = member.into();
        if !self.teams.contains_key(&team) {
            return Err(ModelError::TeamNotFound(team));
        }

        let added = self.member_teams_mut(member)?.insert(team);
        let entry = self.teams.get_mut(&team).ok_or(ModelError::TeamNotFound(team))?;
        match member {
            Member::Directory(id) => entry.directory_users.insert(id),
            Member::Managed(id) => entry.managed_users.insert(id),
        };

        debug_assert!(self.check_consistency().is_ok());
        Ok(added)
    }

    /// Remove a user from a team. Returns `false` when not a member.
    pub fn remove_member(&mut self, team: TeamId, member: impl Into<Member>) -> ModelResult<bool> {
        let member = member.into();
        if !self.teams.contains_key(&team) {
            return Err(ModelError::TeamNotFound(team));
        }

        let removed = self.member_teams_mut(member)?.remove(&team);
        let entry = self.teams.get_mut(&team).ok_or(ModelError::TeamNotFound(team))?;
        match member {
            Member::Directory(id) => entry.directory_users.remove(&id),
            Member::Managed(id) => entry.managed_users.remove(&id),
        };

        debug_assert!(self.check_consistency().is_ok());
        Ok(removed)
    }

    fn grantee_permissions_mut(
        &mut self,
        grantee: Grantee,
    ) -> ModelResult<&mut BTreeSet<PermissionId>> {
        match grantee {
            Grantee::Team(id) => self
                .teams
                .get_mut(&id)
                .map(|t| &mut t.permissions)
                .ok_or(ModelError::TeamNotFound(id)),
            Grantee::Member(Member::Directory(id)) => self
                .directory_users
                .get_mut(&id)
                .map(|u| &mut u.permissions)
                .ok_or(ModelError::UserNotFound(id)),
            Grantee::Member(Member::Managed(id)) => self
                .managed_users
                .get_mut(&id)
                .map(|u| &mut u.permissions)
                .ok_or(ModelError::ManagedUserNotFound(id)),
        }
    }

    fn member_teams_mut(&mut self, member: Member) -> ModelResult<&mut BTreeSet<TeamId>> {
        match member {
            Member::Directory(id) => self
                .directory_users
                .get_mut(&id)
                .map(|u| &mut u.teams)
                .ok_or(ModelError::UserNotFound(id)),
            Member::Managed(id) => self
                .managed_users
                .get_mut(&id)
                .map(|u| &mut u.teams)
                .ok_or(ModelError::ManagedUserNotFound(id)),
        }
    }

    fn member_sets(
        &self,
        member: Member,
    ) -> ModelResult<(&BTreeSet<PermissionId>, &BTreeSet<TeamId>)> {
        match member {
            Member::Directory(id) => self
                .directory_users
                .get(&id)
                .map(|u| (&u.permissions, &u.teams))
                .ok_or(ModelError::UserNotFound(id)),
            Member::Managed(id) => self
                .managed_users
                .get(&id)
                .map(|u| (&u.permissions, &u.teams))
                .ok_or(ModelError::ManagedUserNotFound(id)),
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    #[must_use]
    pub fn permission(&self, id: PermissionId) -> Option<&Permission> {
        self.permissions.get(&id)
    }

    #[must_use]
    pub fn permission_by_name(&self, name: &str) -> Option<&Permission> {
        self.permission_names
            .get(name)
            .and_then(|id| self.permissions.get(id))
    }

    #[must_use]
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    #[must_use]
    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        self.teams.values().find(|t| t.name == name)
    }

    #[must_use]
    pub fn directory_user(&self, id: UserId) -> Option<&DirectoryUser> {
        self.directory_users.get(&id)
    }

    #[must_use]
    pub fn directory_user_by_login(&self, login: &str) -> Option<&DirectoryUser> {
        self.directory_logins
            .get(login)
            .and_then(|id| self.directory_users.get(id))
    }

    #[must_use]
    pub fn managed_user(&self, id: ManagedUserId) -> Option<&ManagedUser> {
        self.managed_users.get(&id)
    }

    #[must_use]
    pub fn managed_user_by_login(&self, login: &str) -> Option<&ManagedUser> {
        self.managed_logins
            .get(login)
            .and_then(|id| self.managed_users.get(id))
    }

    // ------------------------------------------------------------------
    // Ordered listings
    // ------------------------------------------------------------------

    /// All permissions, by name.
    #[must_use]
    pub fn permissions(&self) -> Vec<&Permission> {
        sorted_by(self.permissions.values(), |p| p.name.as_str())
    }

    /// All teams, by name.
    #[must_use]
    pub fn teams(&self) -> Vec<&Team> {
        sorted_by(self.teams.values(), |t| t.name.as_str())
    }

    /// All directory-backed users, by login name.
    #[must_use]
    pub fn directory_users(&self) -> Vec<&DirectoryUser> {
        sorted_by(self.directory_users.values(), |u| u.username.as_str())
    }

    /// All managed users, by login name.
    #[must_use]
    pub fn managed_users(&self) -> Vec<&ManagedUser> {
        sorted_by(self.managed_users.values(), |u| u.username.as_str())
    }

    /// Teams holding a permission, by team name.
    pub fn permission_teams(&self, id: PermissionId) -> ModelResult<Vec<&Team>> {
        let permission = self.permissions.get(&id).ok_or(ModelError::PermissionNotFound(id))?;
        Ok(sorted_by(
            permission.teams.iter().filter_map(|t| self.teams.get(t)),
            |t| t.name.as_str(),
        ))
    }

    /// Directory users holding a permission directly, by login name.
    pub fn permission_directory_users(&self, id: PermissionId) -> ModelResult<Vec<&DirectoryUser>> {
        let permission = self.permissions.get(&id).ok_or(ModelError::PermissionNotFound(id))?;
        Ok(sorted_by(
            permission
                .directory_users
                .iter()
                .filter_map(|u| self.directory_users.get(u)),
            |u| u.username.as_str(),
        ))
    }

    /// Managed users holding a permission directly, by login name.
    pub fn permission_managed_users(&self, id: PermissionId) -> ModelResult<Vec<&ManagedUser>> {
        let permission = self.permissions.get(&id).ok_or(ModelError::PermissionNotFound(id))?;
        Ok(sorted_by(
            permission
                .managed_users
                .iter()
                .filter_map(|u| self.managed_users.get(u)),
            |u| u.username.as_str(),
        ))
    }

    /// Permissions owned by a team, by name.
    pub fn team_permissions(&self, id: TeamId) -> ModelResult<Vec<&Permission>> {
        let team = self.teams.get(&id).ok_or(ModelError::TeamNotFound(id))?;
        Ok(self.permissions_by_name(team.permissions.iter()))
    }

    /// Directory users in a team, by login name.
    pub fn team_directory_users(&self, id: TeamId) -> ModelResult<Vec<&DirectoryUser>> {
        let team = self.teams.get(&id).ok_or(ModelError::TeamNotFound(id))?;
        Ok(sorted_by(
            team.directory_users
                .iter()
                .filter_map(|u| self.directory_users.get(u)),
            |u| u.username.as_str(),
        ))
    }

    /// Managed users in a team, by login name.
    pub fn team_managed_users(&self, id: TeamId) -> ModelResult<Vec<&ManagedUser>> {
        let team = self.teams.get(&id).ok_or(ModelError::TeamNotFound(id))?;
        Ok(sorted_by(
            team.managed_users
                .iter()
                .filter_map(|u| self.managed_users.get(u)),
            |u| u.username.as_str(),
        ))
    }

    /// Teams a user belongs to, by name.
    pub fn member_teams(&self, member: impl Into<Member>) -> ModelResult<Vec<&Team>> {
        let (_, teams) = self.member_sets(member.into())?;
        Ok(sorted_by(
            teams.iter().filter_map(|t| self.teams.get(t)),
            |t| t.name.as_str(),
        ))
    }

    /// Permissions granted to a user directly, by name.
    pub fn direct_permissions(&self, member: impl Into<Member>) -> ModelResult<Vec<&Permission>> {
        let (permissions, _) = self.member_sets(member.into())?;
        Ok(self.permissions_by_name(permissions.iter()))
    }

    /// Direct permissions plus those of every team the user belongs to,
    /// de-duplicated and by name.
    pub fn effective_permissions(&self, member: impl Into<Member>) -> ModelResult<Vec<&Permission>> {
        let (permissions, teams) = self.member_sets(member.into())?;
        let mut ids: BTreeSet<PermissionId> = permissions.clone();
        for team in teams.iter().filter_map(|t| self.teams.get(t)) {
            ids.extend(team.permissions.iter().copied());
        }
        Ok(self.permissions_by_name(ids.iter()))
    }

    /// Authorization check: whether the user holds the named permission
    /// directly or through a team. Unknown users hold nothing.
    #[must_use]
    pub fn has_permission(&self, member: impl Into<Member>, name: &str) -> bool {
        let Some(permission) = self.permission_names.get(name) else {
            return false;
        };
        let Ok((permissions, teams)) = self.member_sets(member.into()) else {
            return false;
        };

        permissions.contains(permission)
            || teams
                .iter()
                .filter_map(|t| self.teams.get(t))
                .any(|t| t.permissions.contains(permission))
    }

    fn permissions_by_name<'a>(
        &self,
        ids: impl Iterator<Item = &'a PermissionId>,
    ) -> Vec<&Permission> {
        sorted_by(
            ids.filter_map(|id| self.permissions.get(id)),
            |p| p.name.as_str(),
        )
    }

    // ------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------

    /// Verify that every association is recorded on both sides, that every
    /// referenced identifier exists and that the name indexes match.
    pub fn check_consistency(&self) -> ModelResult<()> {
        for (id, permission) in &self.permissions {
            if self.permission_names.get(permission.name.as_str()) != Some(id) {
                return Err(inconsistent(format!(
                    "permission {} is missing from the name index",
                    permission.name
                )));
            }
            for team in &permission.teams {
                let holds = self.teams.get(team).is_some_and(|t| t.permissions.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "permission {} lists team {team} which does not list it back",
                        permission.name
                    )));
                }
            }
            for user in &permission.directory_users {
                let holds = self
                    .directory_users
                    .get(user)
                    .is_some_and(|u| u.permissions.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "permission {} lists directory user {user} which does not list it back",
                        permission.name
                    )));
                }
            }
            for user in &permission.managed_users {
                let holds = self
                    .managed_users
                    .get(user)
                    .is_some_and(|u| u.permissions.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "permission {} lists managed user {user} which does not list it back",
                        permission.name
                    )));
                }
            }
        }

        if self.permission_names.len() != self.permissions.len() {
            return Err(inconsistent("permission name index has stale entries"));
        }

        for (id, team) in &self.teams {
            for permission in &team.permissions {
                let holds = self
                    .permissions
                    .get(permission)
                    .is_some_and(|p| p.teams.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "team {} lists permission {permission} which does not list it back",
                        team.name
                    )));
                }
            }
            for user in &team.directory_users {
                let holds = self
                    .directory_users
                    .get(user)
                    .is_some_and(|u| u.teams.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "team {} lists directory user {user} which does not list it back",
                        team.name
                    )));
                }
            }
            for user in &team.managed_users {
                let holds = self
                    .managed_users
                    .get(user)
                    .is_some_and(|u| u.teams.contains(id));
                if !holds {
                    return Err(inconsistent(format!(
                        "team {} lists managed user {user} which does not list it back",
                        team.name
                    )));
                }
            }
        }

        for (id, user) in &self.directory_users {
            if self.directory_logins.get(&user.username) != Some(id) {
                return Err(inconsistent(format!(
                    "directory user {} is missing from the login index",
                    user.username
                )));
            }
            self.check_member_side(Member::Directory(*id), &user.username, &user.permissions, &user.teams)?;
        }

        for (id, user) in &self.managed_users {
            if self.managed_logins.get(&user.username) != Some(id) {
                return Err(inconsistent(format!(
                    "managed user {} is missing from the login index",
                    user.username
                )));
            }
            self.check_member_side(Member::Managed(*id), &user.username, &user.permissions, &user.teams)?;
        }

        Ok(())
    }

    fn check_member_side(
        &self,
        member: Member,
        username: &str,
        permissions: &BTreeSet<PermissionId>,
        teams: &BTreeSet<TeamId>,
    ) -> ModelResult<()> {
        for permission in permissions {
            let holds = self.permissions.get(permission).is_some_and(|p| match member {
                Member::Directory(id) => p.directory_users.contains(&id),
                Member::Managed(id) => p.managed_users.contains(&id),
            });
            if !holds {
                return Err(inconsistent(format!(
                    "user {username} lists permission {permission} which does not list it back"
                )));
            }
        }
        for team in teams {
            let holds = self.teams.get(team).is_some_and(|t| match member {
                Member::Directory(id) => t.directory_users.contains(&id),
                Member::Managed(id) => t.managed_users.contains(&id),
            });
            if !holds {
                return Err(inconsistent(format!(
                    "user {username} lists team {team} which does not list it back"
                )));
            }
        }
        Ok(())
    }
}

fn require_login(username: &str) -> ModelResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::new("username", "required", "The login name is required").into());
    }
    Ok(username.to_string())
}

fn inconsistent(message: impl Into<String>) -> ModelError {
    ModelError::Inconsistent(message.into())
}

fn sorted_by<'a, T, I, F>(items: I, key: F) -> Vec<&'a T>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    let mut items: Vec<&T> = items.collect();
    items.sort_by(|a, b| key(a).cmp(key(b)));
    items
}
