//! Presswork Domain Types
//!
//! Shared types for the printed-material order management core.
//!
//! # Key Concepts
//!
//! - **Order**: The central workflow entity. It carries a business-assigned,
//!   globally unique order number and moves through four sequential stages
//!   (Intake, Review, Manufacturing, Printing). The orthogonal status flag
//!   (Active/Cancelled/Completed/Late) tracks lifecycle outcome.
//! - **ManufacturingItem**: One unit of manufacturing work owned by an order.
//!   An order only leaves Manufacturing once every item is completed.
//! - **TimelineEntry**: Append-only audit record of every stage transition,
//!   status change, and item completion.
//! - **Permission / PermissionRole / UserPermission**: The fine-grained
//!   authorization model — a permission is a coded capability domain, roles
//!   are named actions inside it, and grants tie one role to one user.
//! - **ReferenceItem**: Master reference data (materials, machines, molds,
//!   suppliers, knives, cartons, cores, roll directions).
//!
//! # Design Principles
//!
//! 1. Stages only advance forward; cancellation is the only escape hatch.
//! 2. The order `version` field is the optimistic concurrency token — every
//!    committed transition bumps it by exactly one.
//! 3. Timeline records are never mutated or deleted after creation.

#![deny(unsafe_code)]

mod actor;
mod catalog;
mod ids;
mod order;
mod permission;
mod timeline;

pub use actor::*;
pub use catalog::*;
pub use ids::*;
pub use order::*;
pub use permission::*;
pub use timeline::*;
