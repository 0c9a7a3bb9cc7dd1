//! Append-only order timeline records

use crate::{Actor, OrderId, OrderStage, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timeline event to be appended. The store assigns the id and sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineAppend {
    pub order_id: OrderId,
    pub stage: OrderStage,
    pub status: OrderStatus,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub actor: Actor,
    pub recorded_at: DateTime<Utc>,
}

/// A stored timeline record. Never mutated or deleted after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub entry_id: String,
    /// Monotonic append sequence, assigned by the store.
    pub sequence: u64,
    pub order_id: OrderId,
    /// Stage at the time the event was recorded.
    pub stage: OrderStage,
    /// Status at the time the event was recorded.
    pub status: OrderStatus,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub actor: Actor,
    pub recorded_at: DateTime<Utc>,
}
