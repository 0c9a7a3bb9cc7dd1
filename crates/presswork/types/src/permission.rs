//! Fine-grained permission model
//!
//! A `Permission` is a coded capability domain (e.g. "Users Management" /
//! `USERS`). Each permission owns named roles — the actions inside that
//! domain — and a `UserPermission` grants one role of one permission to one
//! user. Holding the `Manage` role of a permission implies every other role
//! under it; that shortcut is evaluated explicitly by the authorization
//! engine, never assumed by naming convention elsewhere.

use crate::{PermissionId, PermissionRoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The standard role names every built-in permission declares.
pub mod roles {
    pub const VIEW: &str = "View";
    pub const CREATE: &str = "Create";
    pub const EDIT: &str = "Edit";
    pub const DELETE: &str = "Delete";
    pub const MANAGE: &str = "Manage";

    pub const STANDARD: [&str; 5] = [VIEW, CREATE, EDIT, DELETE, MANAGE];
}

/// A named, coded capability domain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Unique display name.
    pub name: String,
    /// Unique short code used in policy names, e.g. `USERS`.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: PermissionId::generate(),
            name: name.into(),
            code: code.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named action within a permission's domain.
///
/// `(permission_id, role_name)` is unique; roles are owned by their
/// permission and cascade-deleted with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PermissionRole {
    pub id: PermissionRoleId,
    pub permission_id: PermissionId,
    pub role_name: String,
}

impl PermissionRole {
    pub fn new(permission_id: PermissionId, role_name: impl Into<String>) -> Self {
        Self {
            id: PermissionRoleId::generate(),
            permission_id,
            role_name: role_name.into(),
        }
    }
}

/// A concrete grant of one role of one permission to one user.
///
/// `(user_id, permission_id, role_id)` is unique — no duplicate grants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub role_id: PermissionRoleId,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<UserId>,
}

impl UserPermission {
    pub fn new(user_id: UserId, permission_id: PermissionId, role_id: PermissionRoleId) -> Self {
        Self {
            user_id,
            permission_id,
            role_id,
            granted_at: Utc::now(),
            granted_by: None,
        }
    }

    pub fn granted_by(mut self, granter: UserId) -> Self {
        self.granted_by = Some(granter);
        self
    }
}
