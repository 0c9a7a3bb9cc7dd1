//! Presswork Workflow - the order lifecycle engine
//!
//! Orders move through four sequential stages: Intake, Review, Manufacturing,
//! Printing. The engine in this crate owns every transition rule:
//! - stages advance strictly forward, one at a time
//! - Review requires customer, supplier, and product to be filled in
//! - Manufacturing starts with at least one manufacturing item and only ends
//!   once every item is completed
//! - completing Printing closes the order; cancellation is the only other
//!   way out
//!
//! Every mutation commits through the storage layer's single atomic
//! transition unit, so the order version, item state, and the timeline entry
//! always land together. Concurrent writers lose with a `Conflict` and must
//! re-read.

#![deny(unsafe_code)]

mod engine;
mod errors;

pub use engine::{NewOrder, OrderWorkflowEngine};
pub use errors::{WorkflowError, WorkflowResult};
