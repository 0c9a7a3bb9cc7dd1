//! The order workflow engine.

use crate::{WorkflowError, WorkflowResult};
use chrono::Utc;
use presswork_storage::{
    ItemCompletion, PressworkStore, QueryWindow, TransitionWrite,
};
use presswork_types::{
    Actor, Attachment, AttachmentId, ItemId, ManufacturingItem, Order, OrderId, OrderStage,
    OrderStatus, TimelineAppend, TimelineEntry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to create a new order.
///
/// Only the order number is mandatory at intake; customer, supplier, and
/// product may arrive later but must be present before the move to Review.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: String,
    pub customer: String,
    pub supplier: String,
    pub product: String,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn new(order_number: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            ..Self::default()
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
}

/// Drives orders through the Intake → Review → Manufacturing → Printing
/// lifecycle.
#[derive(Clone)]
pub struct OrderWorkflowEngine {
    store: Arc<dyn PressworkStore>,
}

impl OrderWorkflowEngine {
    pub fn new(store: Arc<dyn PressworkStore>) -> Self {
        Self { store }
    }

    // ── Creation and intake ──────────────────────────────────────────────

    /// Create an order in Intake. The order number must be non-blank and
    /// unique across all orders, including cancelled and completed ones.
    pub async fn create_order(&self, request: NewOrder, actor: &Actor) -> WorkflowResult<Order> {
        if request.order_number.trim().is_empty() {
            return Err(WorkflowError::validation("order number must not be blank"));
        }

        let mut order = Order::new(request.order_number)
            .with_customer(request.customer)
            .with_supplier(request.supplier)
            .with_product(request.product);
        order.notes = request.notes;

        let entry = Self::entry(&order, "Order created", None, actor);
        self.store.create_order(order.clone(), entry).await?;
        tracing::info!(order = %order.id, number = %order.order_number, "order created");
        Ok(order)
    }

    /// Attach a file reference to an order. Attachments are an intake-stage
    /// activity; later stages work from the frozen intake record.
    pub async fn add_attachment(
        &self,
        order_id: &OrderId,
        file_name: impl Into<String>,
        storage_path: impl Into<String>,
        actor: &Actor,
    ) -> WorkflowResult<Attachment> {
        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Intake)?;

        let attachment = Attachment::new(
            order.id.clone(),
            file_name,
            storage_path,
            actor.user_id.clone(),
        );
        let updated = Self::bump(&order);
        let entry = Self::entry(
            &updated,
            "Attachment added",
            Some(attachment.file_name.clone()),
            actor,
        );
        self.store
            .commit_transition(
                TransitionWrite::new(updated, order.version, entry)
                    .with_attachment(attachment.clone()),
            )
            .await?;
        tracing::info!(order = %order.id, file = %attachment.file_name, "attachment added");
        Ok(attachment)
    }

    // ── Stage transitions ────────────────────────────────────────────────

    /// Move an order from Intake to Review. Customer, supplier, and product
    /// must all be filled in; every missing field is reported.
    pub async fn move_to_review(&self, order_id: &OrderId, actor: &Actor) -> WorkflowResult<Order> {
        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Intake)?;

        let mut missing = Vec::new();
        if order.customer.trim().is_empty() {
            missing.push("customer must be filled in before review".to_string());
        }
        if order.supplier.trim().is_empty() {
            missing.push("supplier must be filled in before review".to_string());
        }
        if order.product.trim().is_empty() {
            missing.push("product must be filled in before review".to_string());
        }
        if !missing.is_empty() {
            return Err(WorkflowError::Validation(missing));
        }

        let mut updated = Self::bump(&order);
        updated.stage = OrderStage::Review;
        let entry = Self::entry(&updated, "Moved to Review", None, actor);
        self.store
            .commit_transition(TransitionWrite::new(updated.clone(), order.version, entry))
            .await?;
        tracing::info!(order = %order.id, "order moved to Review");
        Ok(updated)
    }

    /// Move an order from Review to Manufacturing, creating its item list.
    /// At least one item description is required; manufacturing without work
    /// units would make the stage impossible to leave.
    pub async fn move_to_manufacturing(
        &self,
        order_id: &OrderId,
        item_descriptions: Vec<String>,
        actor: &Actor,
    ) -> WorkflowResult<Order> {
        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Review)?;

        let descriptions: Vec<String> = item_descriptions
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if descriptions.is_empty() {
            return Err(WorkflowError::validation(
                "at least one manufacturing item is required",
            ));
        }

        let items: Vec<ManufacturingItem> = descriptions
            .into_iter()
            .map(|d| ManufacturingItem::new(order.id.clone(), d))
            .collect();

        let mut updated = Self::bump(&order);
        updated.stage = OrderStage::Manufacturing;
        let entry = Self::entry(
            &updated,
            "Moved to Manufacturing",
            Some(format!("{} manufacturing item(s)", items.len())),
            actor,
        );
        self.store
            .commit_transition(
                TransitionWrite::new(updated.clone(), order.version, entry).with_items(items),
            )
            .await?;
        tracing::info!(order = %order.id, "order moved to Manufacturing");
        Ok(updated)
    }

    /// Move an order from Manufacturing to Printing. Refused until every
    /// manufacturing item is completed.
    pub async fn move_to_printing(
        &self,
        order_id: &OrderId,
        actor: &Actor,
    ) -> WorkflowResult<Order> {
        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Manufacturing)?;

        let items = self.store.list_items(&order.id).await?;
        let open = items.iter().filter(|i| !i.completed).count();
        if items.is_empty() || open > 0 {
            return Err(WorkflowError::validation(format!(
                "{open} of {} manufacturing item(s) still open",
                items.len()
            )));
        }

        let mut updated = Self::bump(&order);
        updated.stage = OrderStage::Printing;
        let entry = Self::entry(&updated, "Moved to Printing", None, actor);
        self.store
            .commit_transition(TransitionWrite::new(updated.clone(), order.version, entry))
            .await?;
        tracing::info!(order = %order.id, "order moved to Printing");
        Ok(updated)
    }

    /// Finish the Printing stage and close the order as Completed.
    pub async fn complete_printing(
        &self,
        order_id: &OrderId,
        actor: &Actor,
    ) -> WorkflowResult<Order> {
        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Printing)?;

        let mut updated = Self::bump(&order);
        updated.status = OrderStatus::Completed;
        let entry = Self::entry(&updated, "Printing completed", None, actor);
        self.store
            .commit_transition(TransitionWrite::new(updated.clone(), order.version, entry))
            .await?;
        tracing::info!(order = %order.id, "order completed");
        Ok(updated)
    }

    // ── Manufacturing items ──────────────────────────────────────────────

    /// Mark one manufacturing item as completed.
    ///
    /// Completing an already-completed item is a no-op that returns the item
    /// unchanged; nothing is written and no timeline entry appears.
    pub async fn complete_item(
        &self,
        item_id: &ItemId,
        actor: &Actor,
    ) -> WorkflowResult<ManufacturingItem> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| WorkflowError::ItemNotFound(item_id.clone()))?;
        if item.completed {
            return Ok(item);
        }

        let order = self.load_order(&item.order_id).await?;
        Self::require_open(&order)?;
        Self::require_stage(&order, OrderStage::Manufacturing)?;

        let completed_at = Utc::now();
        let updated = Self::bump(&order);
        let entry = Self::entry(
            &updated,
            "Manufacturing item completed",
            Some(item.description.clone()),
            actor,
        );
        self.store
            .commit_transition(
                TransitionWrite::new(updated, order.version, entry).with_completed_item(
                    ItemCompletion {
                        item_id: item.id.clone(),
                        completed_by: actor.user_id.clone(),
                        completed_at,
                    },
                ),
            )
            .await?;
        tracing::info!(order = %order.id, item = %item.id, "manufacturing item completed");

        Ok(ManufacturingItem {
            completed: true,
            completed_at: Some(completed_at),
            completed_by: Some(actor.user_id.clone()),
            ..item
        })
    }

    /// Whether every manufacturing item of the order is completed. An order
    /// with no items reports `false`: it has not produced anything yet.
    pub async fn are_all_items_completed(&self, order_id: &OrderId) -> WorkflowResult<bool> {
        let order = self.load_order(order_id).await?;
        let items = self.store.list_items(&order.id).await?;
        Ok(!items.is_empty() && items.iter().all(|i| i.completed))
    }

    // ── Status changes ───────────────────────────────────────────────────

    /// Cancel an order from any non-terminal state. A non-blank reason is
    /// required and recorded in the timeline.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: impl Into<String>,
        actor: &Actor,
    ) -> WorkflowResult<Order> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(WorkflowError::validation(
                "a cancellation reason is required",
            ));
        }

        let order = self.load_order(order_id).await?;
        Self::require_open(&order)?;

        let mut updated = Self::bump(&order);
        updated.status = OrderStatus::Cancelled;
        let entry = Self::entry(&updated, "Order cancelled", Some(reason), actor);
        self.store
            .commit_transition(TransitionWrite::new(updated.clone(), order.version, entry))
            .await?;
        tracing::info!(order = %order.id, "order cancelled");
        Ok(updated)
    }

    /// Flag an order as late. Advisory only: a late order keeps moving
    /// through stages. Flagging an already-late order is a no-op.
    pub async fn flag_late(&self, order_id: &OrderId, actor: &Actor) -> WorkflowResult<Order> {
        let order = self.load_order(order_id).await?;
        if order.status == OrderStatus::Late {
            return Ok(order);
        }
        Self::require_open(&order)?;

        let mut updated = Self::bump(&order);
        updated.status = OrderStatus::Late;
        let entry = Self::entry(&updated, "Order flagged late", None, actor);
        self.store
            .commit_transition(TransitionWrite::new(updated.clone(), order.version, entry))
            .await?;
        tracing::info!(order = %order.id, "order flagged late");
        Ok(updated)
    }

    // ── Queries and administration ───────────────────────────────────────

    pub async fn get_order(&self, order_id: &OrderId) -> WorkflowResult<Order> {
        self.load_order(order_id).await
    }

    pub async fn find_order_by_number(&self, order_number: &str) -> WorkflowResult<Option<Order>> {
        Ok(self.store.find_order_by_number(order_number).await?)
    }

    /// List orders newest-first.
    pub async fn list_orders(&self, window: QueryWindow) -> WorkflowResult<Vec<Order>> {
        Ok(self.store.list_orders(window).await?)
    }

    /// An order's full history, oldest first.
    pub async fn timeline(&self, order_id: &OrderId) -> WorkflowResult<Vec<TimelineEntry>> {
        let order = self.load_order(order_id).await?;
        Ok(self.store.list_timeline(&order.id).await?)
    }

    pub async fn items(&self, order_id: &OrderId) -> WorkflowResult<Vec<ManufacturingItem>> {
        let order = self.load_order(order_id).await?;
        Ok(self.store.list_items(&order.id).await?)
    }

    pub async fn attachments(&self, order_id: &OrderId) -> WorkflowResult<Vec<Attachment>> {
        let order = self.load_order(order_id).await?;
        Ok(self.store.list_attachments(&order.id).await?)
    }

    pub async fn get_attachment(
        &self,
        attachment_id: &AttachmentId,
    ) -> WorkflowResult<Option<Attachment>> {
        Ok(self.store.get_attachment(attachment_id).await?)
    }

    /// Administrative hard delete. Removes the order with its items,
    /// attachments, and timeline. Not a workflow transition; regular flows
    /// cancel instead.
    pub async fn delete_order(&self, order_id: &OrderId, actor: &Actor) -> WorkflowResult<()> {
        let order = self.load_order(order_id).await?;
        self.store.delete_order(&order.id).await?;
        tracing::warn!(order = %order.id, actor = %actor.user_id, "order hard-deleted");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn load_order(&self, order_id: &OrderId) -> WorkflowResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| WorkflowError::OrderNotFound(order_id.clone()))
    }

    fn require_open(order: &Order) -> WorkflowResult<()> {
        if order.is_open() {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!(
                "order {} is {} and accepts no further changes",
                order.order_number, order.status
            )))
        }
    }

    fn require_stage(order: &Order, expected: OrderStage) -> WorkflowResult<()> {
        if order.stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!(
                "order {} is in {}, expected {}",
                order.order_number, order.stage, expected
            )))
        }
    }

    /// Copy of the order with the version advanced and timestamp refreshed.
    fn bump(order: &Order) -> Order {
        let mut updated = order.clone();
        updated.version = order.version + 1;
        updated.updated_at = Utc::now();
        updated
    }

    fn entry(order: &Order, action: &str, notes: Option<String>, actor: &Actor) -> TimelineAppend {
        TimelineAppend {
            order_id: order.id.clone(),
            stage: order.stage,
            status: order.status,
            action: action.to_string(),
            notes,
            actor: actor.clone(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presswork_storage::memory::InMemoryStore;
    use presswork_types::UserId;

    fn actor() -> Actor {
        Actor::new(UserId::generate(), "Test Operator")
    }

    fn engine() -> OrderWorkflowEngine {
        OrderWorkflowEngine::new(Arc::new(InMemoryStore::new()))
    }

    async fn order_in_review(engine: &OrderWorkflowEngine, actor: &Actor) -> Order {
        let order = engine
            .create_order(
                NewOrder::new("ORD-1001")
                    .with_customer("Acme Labels")
                    .with_supplier("Paper North")
                    .with_product("Foil label roll"),
                actor,
            )
            .await
            .unwrap();
        engine.move_to_review(&order.id, actor).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        assert_eq!(order.stage, OrderStage::Review);
        assert_eq!(order.version, 2);

        let order = engine
            .move_to_manufacturing(
                &order.id,
                vec!["Print run".to_string(), "Die cut".to_string()],
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(order.stage, OrderStage::Manufacturing);

        let items = engine.items(&order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        for item in &items {
            engine.complete_item(&item.id, &actor).await.unwrap();
        }
        assert!(engine.are_all_items_completed(&order.id).await.unwrap());

        let order = engine.move_to_printing(&order.id, &actor).await.unwrap();
        assert_eq!(order.stage, OrderStage::Printing);

        let order = engine.complete_printing(&order.id, &actor).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(!order.is_open());

        let history = engine.timeline(&order.id).await.unwrap();
        let actions: Vec<&str> = history.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "Order created",
                "Moved to Review",
                "Moved to Manufacturing",
                "Manufacturing item completed",
                "Manufacturing item completed",
                "Moved to Printing",
                "Printing completed",
            ]
        );
    }

    #[tokio::test]
    async fn test_review_requires_intake_details() {
        let engine = engine();
        let actor = actor();

        let order = engine
            .create_order(NewOrder::new("ORD-2001").with_customer("Acme"), &actor)
            .await
            .unwrap();

        let err = engine.move_to_review(&order.id, &actor).await.unwrap_err();
        match err {
            WorkflowError::Validation(messages) => {
                // Both missing fields are reported in one rejection.
                assert_eq!(messages.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // The failed attempt changed nothing.
        let reloaded = engine.get_order(&order.id).await.unwrap();
        assert_eq!(reloaded.stage, OrderStage::Intake);
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn test_stage_skipping_is_rejected() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let err = engine.move_to_printing(&order.id, &actor).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_manufacturing_requires_items() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let err = engine
            .move_to_manufacturing(&order.id, vec!["  ".to_string()], &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_printing_blocked_until_all_items_done() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let order = engine
            .move_to_manufacturing(
                &order.id,
                vec!["A".into(), "B".into(), "C".into()],
                &actor,
            )
            .await
            .unwrap();

        let items = engine.items(&order.id).await.unwrap();
        engine.complete_item(&items[0].id, &actor).await.unwrap();
        engine.complete_item(&items[1].id, &actor).await.unwrap();

        assert!(!engine.are_all_items_completed(&order.id).await.unwrap());
        let err = engine.move_to_printing(&order.id, &actor).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        engine.complete_item(&items[2].id, &actor).await.unwrap();
        engine.move_to_printing(&order.id, &actor).await.unwrap();
    }

    #[tokio::test]
    async fn test_completing_item_twice_is_noop() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let order = engine
            .move_to_manufacturing(&order.id, vec!["Only item".into()], &actor)
            .await
            .unwrap();
        let items = engine.items(&order.id).await.unwrap();

        let first = engine.complete_item(&items[0].id, &actor).await.unwrap();
        let second = engine.complete_item(&items[0].id, &actor).await.unwrap();
        assert_eq!(first.completed_at, second.completed_at);

        // Only one completion entry, and only one version bump.
        let history = engine.timeline(&order.id).await.unwrap();
        let completions = history
            .iter()
            .filter(|e| e.action == "Manufacturing item completed")
            .count();
        assert_eq!(completions, 1);
        let reloaded = engine.get_order(&order.id).await.unwrap();
        assert_eq!(reloaded.version, 4);
    }

    #[tokio::test]
    async fn test_zero_item_order_is_not_complete() {
        let engine = engine();
        let actor = actor();

        let order = engine
            .create_order(NewOrder::new("ORD-3001"), &actor)
            .await
            .unwrap();
        assert!(!engine.are_all_items_completed(&order.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_requires_reason_and_blocks_everything() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let err = engine.cancel_order(&order.id, "  ", &actor).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let cancelled = engine
            .cancel_order(&order.id, "Customer withdrew the job", &actor)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = engine
            .move_to_manufacturing(&order.id, vec!["Item".into()], &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let err = engine
            .cancel_order(&order.id, "Again", &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let history = engine.timeline(&order.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.action, "Order cancelled");
        assert_eq!(last.notes.as_deref(), Some("Customer withdrew the job"));
    }

    #[tokio::test]
    async fn test_late_flag_is_advisory_and_idempotent() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        let late = engine.flag_late(&order.id, &actor).await.unwrap();
        assert_eq!(late.status, OrderStatus::Late);

        let again = engine.flag_late(&order.id, &actor).await.unwrap();
        assert_eq!(again.version, late.version);

        // A late order still advances.
        let order = engine
            .move_to_manufacturing(&order.id, vec!["Item".into()], &actor)
            .await
            .unwrap();
        assert_eq!(order.stage, OrderStage::Manufacturing);
        assert_eq!(order.status, OrderStatus::Late);
    }

    #[tokio::test]
    async fn test_attachments_only_during_intake() {
        let engine = engine();
        let actor = actor();

        let order = engine
            .create_order(
                NewOrder::new("ORD-4001")
                    .with_customer("Acme")
                    .with_supplier("Paper North")
                    .with_product("Labels"),
                &actor,
            )
            .await
            .unwrap();
        engine
            .add_attachment(&order.id, "artwork.pdf", "blobs/artwork.pdf", &actor)
            .await
            .unwrap();

        let order = engine.move_to_review(&order.id, &actor).await.unwrap();
        let err = engine
            .add_attachment(&order.id, "late.pdf", "blobs/late.pdf", &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let attachments = engine.attachments(&order.id).await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].file_name, "artwork.pdf");
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let engine = engine();
        let actor = actor();

        engine
            .create_order(NewOrder::new("ORD-5001"), &actor)
            .await
            .unwrap();
        let err = engine
            .create_order(NewOrder::new("ORD-5001"), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_transition_single_winner() {
        let engine = engine();
        let actor = actor();

        let order = engine
            .create_order(
                NewOrder::new("ORD-6001")
                    .with_customer("Acme")
                    .with_supplier("Paper North")
                    .with_product("Labels"),
                &actor,
            )
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            engine.move_to_review(&order.id, &actor),
            engine.move_to_review(&order.id, &actor),
        );
        assert_eq!(
            [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
            1,
            "exactly one concurrent transition may win"
        );

        let reloaded = engine.get_order(&order.id).await.unwrap();
        assert_eq!(reloaded.stage, OrderStage::Review);
        assert_eq!(reloaded.version, 2);
        let moves = engine
            .timeline(&order.id)
            .await
            .unwrap()
            .iter()
            .filter(|e| e.action == "Moved to Review")
            .count();
        assert_eq!(moves, 1);
    }

    #[tokio::test]
    async fn test_delete_order_cascades() {
        let engine = engine();
        let actor = actor();

        let order = order_in_review(&engine, &actor).await;
        engine.delete_order(&order.id, &actor).await.unwrap();

        let err = engine.get_order(&order.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::OrderNotFound(_)));
    }
}
