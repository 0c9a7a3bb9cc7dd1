//! Named policy checks.
//!
//! A policy is a named requirement of the form "role R of permission C".
//! Handlers and services gate on policy names; the registry maps those names
//! to requirements, falling back to the `CODE.Role` naming convention when
//! no explicit entry exists. A name that resolves to nothing denies.

use crate::engine::{AccessDecision, AuthorizationEngine};
use crate::{AuthzError, AuthzResult};
use presswork_types::UserId;
use std::collections::HashMap;
use std::sync::RwLock;

/// What a policy demands: one role of one permission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRequirement {
    pub permission_code: String,
    pub role_name: String,
}

impl PolicyRequirement {
    pub fn new(permission_code: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            permission_code: permission_code.into(),
            role_name: role_name.into(),
        }
    }

    /// Parse a conventional `CODE.Role` policy name. The split is on the
    /// first dot; both halves must be non-empty. Anything else is `None`,
    /// which callers treat as a denial.
    pub fn parse(policy_name: &str) -> Option<Self> {
        let (code, role) = policy_name.split_once('.')?;
        if code.is_empty() || role.is_empty() {
            return None;
        }
        Some(Self::new(code, role))
    }
}

/// Maps policy names to requirements.
pub struct PolicyRegistry {
    table: RwLock<HashMap<String, PolicyRequirement>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry pre-populated with explicit entries, without going
    /// through the lock.
    pub fn with_entries<I, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, PolicyRequirement)>,
        N: Into<String>,
    {
        Self {
            table: RwLock::new(
                entries
                    .into_iter()
                    .map(|(name, requirement)| (name.into(), requirement))
                    .collect(),
            ),
        }
    }

    /// Register or replace an explicit policy entry.
    pub fn register(
        &self,
        policy_name: impl Into<String>,
        requirement: PolicyRequirement,
    ) -> AuthzResult<()> {
        let mut table = self.table.write().map_err(|_| AuthzError::LockPoisoned)?;
        table.insert(policy_name.into(), requirement);
        Ok(())
    }

    /// Resolve a policy name: the explicit table wins, then the `CODE.Role`
    /// convention.
    pub fn resolve(&self, policy_name: &str) -> AuthzResult<Option<PolicyRequirement>> {
        let table = self.table.read().map_err(|_| AuthzError::LockPoisoned)?;
        if let Some(requirement) = table.get(policy_name) {
            return Ok(Some(requirement.clone()));
        }
        Ok(PolicyRequirement::parse(policy_name))
    }

    /// Evaluate a policy for a user. Unresolvable names deny.
    pub async fn authorize(
        &self,
        engine: &AuthorizationEngine,
        policy_name: &str,
        user: &UserId,
    ) -> AuthzResult<AccessDecision> {
        let Some(requirement) = self.resolve(policy_name)? else {
            tracing::debug!(policy = policy_name, "policy did not resolve, denying");
            return Ok(AccessDecision {
                authorized: false,
                reason: "access denied".to_string(),
                matched_role: None,
            });
        };
        engine
            .is_authorized(user, &requirement.permission_code, &requirement.role_name)
            .await
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presswork_storage::memory::InMemoryStore;
    use presswork_storage::PermissionStore;
    use presswork_types::{roles, Permission, PermissionRole};
    use std::sync::Arc;

    #[test]
    fn test_parse_convention() {
        let requirement = PolicyRequirement::parse("ORDERS.Edit").unwrap();
        assert_eq!(requirement.permission_code, "ORDERS");
        assert_eq!(requirement.role_name, "Edit");

        // Only the first dot splits; the rest belongs to the role name.
        let requirement = PolicyRequirement::parse("MASTER_DATA.Sub.View").unwrap();
        assert_eq!(requirement.permission_code, "MASTER_DATA");
        assert_eq!(requirement.role_name, "Sub.View");
    }

    #[test]
    fn test_parse_fails_closed() {
        assert!(PolicyRequirement::parse("").is_none());
        assert!(PolicyRequirement::parse("ORDERS").is_none());
        assert!(PolicyRequirement::parse(".Edit").is_none());
        assert!(PolicyRequirement::parse("ORDERS.").is_none());
    }

    #[test]
    fn test_explicit_entry_wins_over_convention() {
        let registry = PolicyRegistry::new();
        registry
            .register(
                "ORDERS.Cancel",
                PolicyRequirement::new("ORDERS", roles::DELETE),
            )
            .unwrap();

        let requirement = registry.resolve("ORDERS.Cancel").unwrap().unwrap();
        assert_eq!(requirement.role_name, roles::DELETE);
    }

    #[test]
    fn test_with_entries_prepopulates_table() {
        let registry = PolicyRegistry::with_entries([(
            "ORDERS.Cancel",
            PolicyRequirement::new("ORDERS", roles::DELETE),
        )]);

        let requirement = registry.resolve("ORDERS.Cancel").unwrap().unwrap();
        assert_eq!(requirement.role_name, roles::DELETE);
        // Convention names still fall through.
        let requirement = registry.resolve("ORDERS.Edit").unwrap().unwrap();
        assert_eq!(requirement.role_name, "Edit");
    }

    #[tokio::test]
    async fn test_unresolvable_policy_denies() {
        let store = Arc::new(InMemoryStore::new());
        let engine = AuthorizationEngine::new(store);
        let registry = PolicyRegistry::new();
        let user = UserId::generate();

        let decision = registry.authorize(&engine, "no-dot-name", &user).await.unwrap();
        assert!(!decision.authorized);
    }

    #[tokio::test]
    async fn test_policy_check_end_to_end() {
        let store = Arc::new(InMemoryStore::new());
        let permission = Permission::new("Orders Management", "ORDERS");
        let permission_id = permission.id.clone();
        store.create_permission(permission).await.unwrap();
        store
            .add_role(PermissionRole::new(permission_id.clone(), roles::EDIT))
            .await
            .unwrap();

        let engine = AuthorizationEngine::new(store);
        let registry = PolicyRegistry::new();
        let user = UserId::generate();

        let denied = registry.authorize(&engine, "ORDERS.Edit", &user).await.unwrap();
        assert!(!denied.authorized);

        engine
            .grant_role(&user, "ORDERS", roles::EDIT, None)
            .await
            .unwrap();
        let allowed = registry.authorize(&engine, "ORDERS.Edit", &user).await.unwrap();
        assert!(allowed.authorized);
    }
}
