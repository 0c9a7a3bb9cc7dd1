//! Presswork Authorization - per-feature access control
//!
//! Access in Presswork is granted per permission role, not per account type:
//! a user may act when they hold the exact role a policy requires, or the
//! `Manage` role of the same permission. Policies are named checks resolved
//! either from an explicit registry entry or from the `CODE.Role` naming
//! convention; anything that fails to resolve denies.
//!
//! # Design Principles
//! - Fail closed: unknown permissions, unknown roles, and malformed policy
//!   names all deny rather than error.
//! - Denials are uniform: callers cannot distinguish "no such permission"
//!   from "no grant", so probing reveals nothing about the catalog.

#![deny(unsafe_code)]

mod engine;
mod policy;
mod seed;

pub use engine::{AccessDecision, AuthorizationEngine};
pub use policy::{PolicyRegistry, PolicyRequirement};
pub use seed::{ensure_seed_data, SeedReport, BUILTIN_PERMISSIONS};

use presswork_storage::StorageError;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Authorization-layer errors.
///
/// These surface only from administrative calls (granting, revoking,
/// seeding). Access checks themselves return an `AccessDecision` and only
/// fail on storage trouble.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("unknown permission code: {0}")]
    UnknownPermission(String),

    #[error("unknown role {role} for permission {code}")]
    UnknownRole { code: String, role: String },

    #[error("policy registry lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
