//! JSON seed format for an identity store.
//!
//! ```json
//! {
//!   "permissions": ["ViewPortfolio", "ManageUsers"],
//!   "teams": [{ "name": "Administrators", "permissions": ["ManageUsers"] }],
//!   "directory_users": [
//!     { "username": "alice", "permissions": ["ViewPortfolio"], "teams": ["Administrators"] }
//!   ],
//!   "managed_users": [{ "username": "admin", "teams": ["Administrators"] }]
//! }
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::error::ModelError;
use crate::model::PermissionModel;

/// Errors produced while loading a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed is not valid JSON for this format.
    #[error("Invalid seed document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The seed describes an invalid model.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A team and the permissions it owns.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamSeed {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A user with direct permissions and team memberships.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub username: String,
    /// Previously reconciled DN, directory users only.
    #[serde(default)]
    pub dn: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

/// Initial content of an identity store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentitySeed {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub teams: Vec<TeamSeed>,
    #[serde(default)]
    pub directory_users: Vec<UserSeed>,
    #[serde(default)]
    pub managed_users: Vec<UserSeed>,
}

impl IdentitySeed {
    /// Parse a seed document.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a model from the seed. Every referenced permission and team must
    /// be declared.
    pub fn into_model(self) -> Result<PermissionModel, SeedError> {
        let mut model = PermissionModel::new();

        for name in &self.permissions {
            model.create_permission(name)?;
        }

        for team in &self.teams {
            let created = model.create_team(&team.name)?;
            for name in &team.permissions {
                let permission = permission_id(&model, name)?;
                model.grant(permission, created)?;
            }
        }

        for user in &self.directory_users {
            let user_id = model.add_directory_user(&user.username)?;
            model.set_directory_user_dn(user_id, user.dn.clone())?;
            for name in &user.permissions {
                let permission = permission_id(&model, name)?;
                model.grant(permission, user_id)?;
            }
            for name in &user.teams {
                let team = team_id(&model, name)?;
                model.add_member(team, user_id)?;
            }
        }

        for user in &self.managed_users {
            let user_id = model.add_managed_user(&user.username)?;
            for name in &user.permissions {
                let permission = permission_id(&model, name)?;
                model.grant(permission, user_id)?;
            }
            for name in &user.teams {
                let team = team_id(&model, name)?;
                model.add_member(team, user_id)?;
            }
        }

        model.check_consistency()?;
        Ok(model)
    }
}

fn permission_id(
    model: &PermissionModel,
    name: &str,
) -> Result<dirsync_core::PermissionId, ModelError> {
    model
        .permission_by_name(name)
        .map(|p| p.id())
        .ok_or_else(|| ModelError::UnknownName {
            kind: "permission",
            name: name.to_string(),
        })
}

fn team_id(model: &PermissionModel, name: &str) -> Result<dirsync_core::TeamId, ModelError> {
    model
        .team_by_name(name)
        .map(|t| t.id())
        .ok_or_else(|| ModelError::UnknownName {
            kind: "team",
            name: name.to_string(),
        })
}
