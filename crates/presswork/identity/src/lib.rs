//! Presswork Identity - user accounts and application roles
//!
//! This crate provides the user directory for the order management system.
//! Accounts carry coarse application roles (Admin, Manager, User); the
//! fine-grained per-feature access rules live in the authorization engine,
//! which consults the permission store rather than these roles.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use presswork_types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Coarse application role attached to an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityRole {
    /// Full administrative access, including destructive operations.
    Admin,
    /// Day-to-day order management.
    Manager,
    /// Regular account; access is driven entirely by permission grants.
    User,
}

impl IdentityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityRole::Admin => "Admin",
            IdentityRole::Manager => "Manager",
            IdentityRole::User => "User",
        }
    }
}

/// A registered user account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub roles: Vec<IdentityRole>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

/// Request to register a new account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub display_name: String,
    pub roles: Vec<IdentityRole>,
}

impl RegistrationRequest {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            roles: vec![IdentityRole::User],
        }
    }

    pub fn with_roles(mut self, roles: Vec<IdentityRole>) -> Self {
        self.roles = roles;
        self
    }
}

/// In-process user directory.
pub struct UserDirectory {
    accounts: RwLock<HashMap<UserId, UserAccount>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new account. Usernames are unique, case-sensitive.
    pub fn register(&self, request: RegistrationRequest) -> Result<UserAccount, IdentityError> {
        if request.username.trim().is_empty() {
            return Err(IdentityError::InvalidUsername(request.username));
        }

        let mut accounts = self.accounts.write().map_err(|_| IdentityError::LockError)?;
        if accounts.values().any(|a| a.username == request.username) {
            return Err(IdentityError::DuplicateUsername(request.username));
        }

        let account = UserAccount {
            user_id: UserId::new(uuid::Uuid::new_v4().to_string()),
            username: request.username,
            display_name: request.display_name,
            roles: request.roles,
            active: true,
            registered_at: Utc::now(),
        };
        accounts.insert(account.user_id.clone(), account.clone());
        Ok(account)
    }

    pub fn lookup(&self, user_id: &UserId) -> Result<Option<UserAccount>, IdentityError> {
        let accounts = self.accounts.read().map_err(|_| IdentityError::LockError)?;
        Ok(accounts.get(user_id).cloned())
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, IdentityError> {
        let accounts = self.accounts.read().map_err(|_| IdentityError::LockError)?;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    /// Add a role to an account. No-op when already present.
    pub fn assign_role(&self, user_id: &UserId, role: IdentityRole) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().map_err(|_| IdentityError::LockError)?;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::NotFound(user_id.0.clone()))?;
        if !account.roles.contains(&role) {
            account.roles.push(role);
        }
        Ok(())
    }

    pub fn remove_from_role(
        &self,
        user_id: &UserId,
        role: IdentityRole,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().map_err(|_| IdentityError::LockError)?;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::NotFound(user_id.0.clone()))?;
        account.roles.retain(|r| *r != role);
        Ok(())
    }

    pub fn has_role(&self, user_id: &UserId, role: IdentityRole) -> Result<bool, IdentityError> {
        let accounts = self.accounts.read().map_err(|_| IdentityError::LockError)?;
        Ok(accounts
            .get(user_id)
            .map(|a| a.active && a.roles.contains(&role))
            .unwrap_or(false))
    }

    /// Deactivate an account. The record is kept so historical timeline
    /// entries still resolve to a user.
    pub fn deactivate(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().map_err(|_| IdentityError::LockError)?;
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| IdentityError::NotFound(user_id.0.clone()))?;
        account.active = false;
        Ok(())
    }

    pub fn list_accounts(&self) -> Result<Vec<UserAccount>, IdentityError> {
        let accounts = self.accounts.read().map_err(|_| IdentityError::LockError)?;
        let mut all: Vec<UserAccount> = accounts.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity-related errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("Lock error")]
    LockError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let directory = UserDirectory::new();

        let account = directory
            .register(RegistrationRequest::new("mkowalski", "Maria Kowalski"))
            .unwrap();
        let found = directory.lookup(&account.user_id).unwrap();

        assert!(found.is_some());
        assert_eq!(found.unwrap().username, "mkowalski");
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let directory = UserDirectory::new();

        directory
            .register(RegistrationRequest::new("ops", "Operations"))
            .unwrap();
        let err = directory
            .register(RegistrationRequest::new("ops", "Other Operations"))
            .unwrap_err();

        assert!(matches!(err, IdentityError::DuplicateUsername(_)));
    }

    #[test]
    fn test_role_assignment() {
        let directory = UserDirectory::new();

        let account = directory
            .register(RegistrationRequest::new("admin", "Site Admin"))
            .unwrap();
        assert!(!directory
            .has_role(&account.user_id, IdentityRole::Admin)
            .unwrap());

        directory
            .assign_role(&account.user_id, IdentityRole::Admin)
            .unwrap();
        assert!(directory
            .has_role(&account.user_id, IdentityRole::Admin)
            .unwrap());

        directory
            .remove_from_role(&account.user_id, IdentityRole::Admin)
            .unwrap();
        assert!(!directory
            .has_role(&account.user_id, IdentityRole::Admin)
            .unwrap());
    }

    #[test]
    fn test_deactivated_account_loses_roles() {
        let directory = UserDirectory::new();

        let account = directory
            .register(
                RegistrationRequest::new("temp", "Temp Worker")
                    .with_roles(vec![IdentityRole::Manager]),
            )
            .unwrap();
        assert!(directory
            .has_role(&account.user_id, IdentityRole::Manager)
            .unwrap());

        directory.deactivate(&account.user_id).unwrap();
        assert!(!directory
            .has_role(&account.user_id, IdentityRole::Manager)
            .unwrap());
        // The record survives for history resolution.
        assert!(directory.lookup(&account.user_id).unwrap().is_some());
    }
}
