//! Order, manufacturing item, and attachment types

use crate::{AttachmentId, ItemId, OrderId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four sequential workflow stages an order passes through.
///
/// Stages advance strictly forward, one at a time. There is no regression
/// and no skipping; cancellation is a status change, not a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderStage {
    Intake,
    Review,
    Manufacturing,
    Printing,
}

impl OrderStage {
    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<OrderStage> {
        match self {
            OrderStage::Intake => Some(OrderStage::Review),
            OrderStage::Review => Some(OrderStage::Manufacturing),
            OrderStage::Manufacturing => Some(OrderStage::Printing),
            OrderStage::Printing => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStage::Intake => "Intake",
            OrderStage::Review => "Review",
            OrderStage::Manufacturing => "Manufacturing",
            OrderStage::Printing => "Printing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Intake" => Some(OrderStage::Intake),
            "Review" => Some(OrderStage::Review),
            "Manufacturing" => Some(OrderStage::Manufacturing),
            "Printing" => Some(OrderStage::Printing),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status, orthogonal to the stage.
///
/// `Late` is an advisory flag — a late order still moves through stages.
/// `Cancelled` and `Completed` are terminal: no further transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Cancelled,
    Completed,
    Late,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "Active",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
            OrderStatus::Late => "Late",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(OrderStatus::Active),
            "Cancelled" => Some(OrderStatus::Cancelled),
            "Completed" => Some(OrderStatus::Completed),
            "Late" => Some(OrderStatus::Late),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The central workflow entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Business-assigned number. Unique across all orders, immutable after
    /// creation.
    pub order_number: String,
    pub stage: OrderStage,
    pub status: OrderStatus,
    pub customer: String,
    pub supplier: String,
    pub product: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token. Starts at 1; every committed transition
    /// bumps it by exactly one.
    pub version: u64,
}

impl Order {
    /// Create a fresh order in Intake with version 1.
    pub fn new(order_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::generate(),
            order_number: order_number.into(),
            stage: OrderStage::Intake,
            status: OrderStatus::Active,
            customer: String::new(),
            supplier: String::new(),
            product: String::new(),
            notes: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = customer.into();
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = supplier.into();
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// One unit of manufacturing work owned by an order.
///
/// Created when the order enters Manufacturing; mutated only by completion
/// events; never completed twice and never un-completed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManufacturingItem {
    pub id: ItemId,
    pub order_id: OrderId,
    pub description: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<UserId>,
}

impl ManufacturingItem {
    pub fn new(order_id: OrderId, description: impl Into<String>) -> Self {
        Self {
            id: ItemId::generate(),
            order_id,
            description: description.into(),
            completed: false,
            completed_at: None,
            completed_by: None,
        }
    }
}

/// Attachment metadata recorded during intake.
///
/// The blob itself lives in external file storage; the core only records the
/// path and who uploaded it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub order_id: OrderId,
    pub file_name: String,
    pub storage_path: String,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(
        order_id: OrderId,
        file_name: impl Into<String>,
        storage_path: impl Into<String>,
        uploaded_by: UserId,
    ) -> Self {
        Self {
            id: AttachmentId::generate(),
            order_id,
            file_name: file_name.into(),
            storage_path: storage_path.into(),
            uploaded_by,
            uploaded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        assert_eq!(OrderStage::Intake.next(), Some(OrderStage::Review));
        assert_eq!(OrderStage::Review.next(), Some(OrderStage::Manufacturing));
        assert_eq!(
            OrderStage::Manufacturing.next(),
            Some(OrderStage::Printing)
        );
        assert_eq!(OrderStage::Printing.next(), None);
    }

    #[test]
    fn stage_labels_round_trip() {
        for stage in [
            OrderStage::Intake,
            OrderStage::Review,
            OrderStage::Manufacturing,
            OrderStage::Printing,
        ] {
            assert_eq!(OrderStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(OrderStage::parse("Shipping"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Active.is_terminal());
        assert!(!OrderStatus::Late.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn incomplete_item_omits_completion_fields_in_json() {
        let item = ManufacturingItem::new(OrderId::generate(), "Roll A");
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("completed_at").is_none());
        assert!(json.get("completed_by").is_none());
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn new_order_starts_in_intake() {
        let order = Order::new("ORD-1001").with_customer("Acme");
        assert_eq!(order.stage, OrderStage::Intake);
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.version, 1);
        assert!(order.is_open());
    }
}
