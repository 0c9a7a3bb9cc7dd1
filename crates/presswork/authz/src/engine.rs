//! Access evaluation against the permission store.

use crate::{AuthzError, AuthzResult};
use presswork_storage::PermissionStore;
use presswork_types::{roles, Permission, PermissionRole, UserId, UserPermission};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// All denials carry the same reason so callers learn nothing about which
/// step failed.
const DENIED: &str = "access denied";

/// Outcome of one access check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessDecision {
    pub authorized: bool,
    pub reason: String,
    /// The role that satisfied the check: the requested role, or `Manage`
    /// when the shortcut applied. `None` on denial.
    pub matched_role: Option<String>,
}

impl AccessDecision {
    fn allowed(matched_role: &str) -> Self {
        Self {
            authorized: true,
            reason: format!("granted via {matched_role}"),
            matched_role: Some(matched_role.to_string()),
        }
    }

    fn denied() -> Self {
        Self {
            authorized: false,
            reason: DENIED.to_string(),
            matched_role: None,
        }
    }
}

/// Evaluates user access against permissions, roles, and grants.
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<dyn PermissionStore>,
}

impl AuthorizationEngine {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// Check whether `user` holds `role_name` of the permission with
    /// `permission_code`, or its `Manage` role.
    ///
    /// Unknown permission codes and role names deny; they are not errors.
    pub async fn is_authorized(
        &self,
        user: &UserId,
        permission_code: &str,
        role_name: &str,
    ) -> AuthzResult<AccessDecision> {
        let Some(permission) = self.store.find_permission_by_code(permission_code).await? else {
            return Ok(AccessDecision::denied());
        };

        let Some(role) = self.store.find_role(&permission.id, role_name).await? else {
            return Ok(AccessDecision::denied());
        };

        if self.store.has_grant(user, &permission.id, &role.id).await? {
            return Ok(AccessDecision::allowed(&role.role_name));
        }

        // Manage shortcut: holding Manage of the same permission satisfies
        // any of its roles. Checked explicitly so the grant tables stay
        // literal.
        if role_name != roles::MANAGE {
            if let Some(manage) = self.store.find_role(&permission.id, roles::MANAGE).await? {
                if self.store.has_grant(user, &permission.id, &manage.id).await? {
                    return Ok(AccessDecision::allowed(roles::MANAGE));
                }
            }
        }

        Ok(AccessDecision::denied())
    }

    /// Grant `role_name` of the permission `permission_code` to `user`.
    ///
    /// Administrative call: unresolvable codes and roles are reported as
    /// errors here, unlike in access checks.
    pub async fn grant_role(
        &self,
        user: &UserId,
        permission_code: &str,
        role_name: &str,
        granted_by: Option<&UserId>,
    ) -> AuthzResult<()> {
        let (permission, role) = self.resolve(permission_code, role_name).await?;
        let mut grant = UserPermission::new(user.clone(), permission.id, role.id);
        if let Some(granter) = granted_by {
            grant = grant.granted_by(granter.clone());
        }
        self.store.grant(grant).await?;
        tracing::info!(
            user = %user,
            permission = permission_code,
            role = role_name,
            "permission role granted"
        );
        Ok(())
    }

    /// Revoke `role_name` of the permission `permission_code` from `user`.
    pub async fn revoke_role(
        &self,
        user: &UserId,
        permission_code: &str,
        role_name: &str,
    ) -> AuthzResult<()> {
        let (permission, role) = self.resolve(permission_code, role_name).await?;
        self.store.revoke(user, &permission.id, &role.id).await?;
        tracing::info!(
            user = %user,
            permission = permission_code,
            role = role_name,
            "permission role revoked"
        );
        Ok(())
    }

    async fn resolve(
        &self,
        permission_code: &str,
        role_name: &str,
    ) -> AuthzResult<(Permission, PermissionRole)> {
        let permission = self
            .store
            .find_permission_by_code(permission_code)
            .await?
            .ok_or_else(|| AuthzError::UnknownPermission(permission_code.to_string()))?;
        let role = self
            .store
            .find_role(&permission.id, role_name)
            .await?
            .ok_or_else(|| AuthzError::UnknownRole {
                code: permission_code.to_string(),
                role: role_name.to_string(),
            })?;
        Ok((permission, role))
    }
}
