//! Presswork storage abstractions.
//!
//! This crate defines the persistence contract for the order workflow and
//! permission engines:
//! - order records with an optimistic-concurrency version token
//! - manufacturing items and intake attachments owned by orders
//! - the append-only order timeline
//! - the permission/role/grant model with its unique constraints
//! - master reference data
//!
//! Design stance:
//! - `commit_transition` is the single atomic unit for order mutation: the
//!   version-checked order update, item writes, and the timeline append
//!   either all persist or none do. Engines never write these separately.
//! - The in-memory adapter is the deterministic reference implementation;
//!   production deployments use the feature-gated PostgreSQL adapter as the
//!   transactional source of truth.

#![deny(unsafe_code)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{
    AttachmentStore, CatalogStore, ItemCompletion, ItemStore, OrderStore, PermissionStore,
    PressworkStore, QueryWindow, TimelineStore, TransitionWrite,
};
