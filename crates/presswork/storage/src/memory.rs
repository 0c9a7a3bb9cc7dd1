//! In-memory reference implementation for the Presswork storage traits.
//!
//! This adapter is deterministic and test-friendly. Production deployments
//! should use a transactional backend (PostgreSQL) for source-of-truth data.

use crate::traits::{
    AttachmentStore, CatalogStore, ItemStore, OrderStore, PermissionStore, QueryWindow,
    TimelineStore, TransitionWrite,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use presswork_types::{
    Attachment, AttachmentId, ItemId, ManufacturingItem, Order, OrderId, Permission, PermissionId,
    PermissionRole, PermissionRoleId, ReferenceId, ReferenceItem, ReferenceKind, TimelineAppend,
    TimelineEntry, UserId, UserPermission,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory Presswork storage adapter.
#[derive(Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    items: RwLock<HashMap<ItemId, ManufacturingItem>>,
    attachments: RwLock<HashMap<AttachmentId, Attachment>>,
    timeline: RwLock<Vec<TimelineEntry>>,
    /// Last assigned timeline sequence. Never decreases, even when a cascade
    /// delete removes entries, so surviving histories stay in append order.
    timeline_sequence: AtomicU64,
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    roles: RwLock<HashMap<PermissionRoleId, PermissionRole>>,
    grants: RwLock<Vec<UserPermission>>,
    references: RwLock<HashMap<ReferenceId, ReferenceItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.timeline_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn stored_entry(event: TimelineAppend, sequence: u64) -> TimelineEntry {
    TimelineEntry {
        entry_id: format!("tl-{}", Uuid::new_v4()),
        sequence,
        order_id: event.order_id,
        stage: event.stage,
        status: event.status,
        action: event.action,
        notes: event.notes,
        actor: event.actor,
        recorded_at: event.recorded_at,
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create_order(&self, order: Order, entry: TimelineAppend) -> StorageResult<()> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        let mut timeline = self
            .timeline
            .write()
            .map_err(|_| StorageError::Backend("timeline lock poisoned".to_string()))?;

        if orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(StorageError::UniqueViolation(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        timeline.push(stored_entry(entry, self.next_sequence()));
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        Ok(orders.get(id).cloned())
    }

    async fn find_order_by_number(&self, order_number: &str) -> StorageResult<Option<Order>> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        Ok(orders
            .values()
            .find(|order| order.order_number == order_number)
            .cloned())
    }

    async fn commit_transition(&self, write: TransitionWrite) -> StorageResult<()> {
        // Fixed lock order: orders, items, attachments, timeline.
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        let mut items = self
            .items
            .write()
            .map_err(|_| StorageError::Backend("items lock poisoned".to_string()))?;
        let mut attachments = self
            .attachments
            .write()
            .map_err(|_| StorageError::Backend("attachments lock poisoned".to_string()))?;
        let mut timeline = self
            .timeline
            .write()
            .map_err(|_| StorageError::Backend("timeline lock poisoned".to_string()))?;

        let stored = orders.get(&write.order.id).ok_or_else(|| {
            StorageError::NotFound(format!("order {} not found", write.order.id))
        })?;

        if stored.version != write.expected_version {
            return Err(StorageError::Conflict(format!(
                "order {} changed: expected version {}, found {}",
                write.order.id, write.expected_version, stored.version
            )));
        }

        if stored.order_number != write.order.order_number {
            return Err(StorageError::InvariantViolation(format!(
                "order number is immutable: {} -> {}",
                stored.order_number, write.order.order_number
            )));
        }

        // Validate everything before mutating anything, so a failed commit
        // leaves no partial state behind.
        if let Some(completion) = &write.completed_item {
            let item = items.get(&completion.item_id).ok_or_else(|| {
                StorageError::NotFound(format!("item {} not found", completion.item_id))
            })?;
            if item.order_id != write.order.id {
                return Err(StorageError::InvariantViolation(format!(
                    "item {} does not belong to order {}",
                    completion.item_id, write.order.id
                )));
            }
            if item.completed {
                return Err(StorageError::InvariantViolation(format!(
                    "item {} is already completed",
                    completion.item_id
                )));
            }
        }

        for item in &write.new_items {
            items.insert(item.id.clone(), item.clone());
        }
        if let Some(completion) = write.completed_item {
            if let Some(item) = items.get_mut(&completion.item_id) {
                item.completed = true;
                item.completed_at = Some(completion.completed_at);
                item.completed_by = Some(completion.completed_by);
            }
        }
        if let Some(attachment) = write.new_attachment {
            attachments.insert(attachment.id.clone(), attachment);
        }
        timeline.push(stored_entry(write.entry, self.next_sequence()));
        orders.insert(write.order.id.clone(), write.order);
        Ok(())
    }

    async fn list_orders(&self, window: QueryWindow) -> StorageResult<Vec<Order>> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        let mut values = orders.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_window(values, window))
    }

    async fn delete_order(&self, id: &OrderId) -> StorageResult<()> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StorageError::Backend("orders lock poisoned".to_string()))?;
        let mut items = self
            .items
            .write()
            .map_err(|_| StorageError::Backend("items lock poisoned".to_string()))?;
        let mut attachments = self
            .attachments
            .write()
            .map_err(|_| StorageError::Backend("attachments lock poisoned".to_string()))?;
        let mut timeline = self
            .timeline
            .write()
            .map_err(|_| StorageError::Backend("timeline lock poisoned".to_string()))?;

        if orders.remove(id).is_none() {
            return Err(StorageError::NotFound(format!("order {id} not found")));
        }
        items.retain(|_, item| item.order_id != *id);
        attachments.retain(|_, attachment| attachment.order_id != *id);
        timeline.retain(|entry| entry.order_id != *id);
        Ok(())
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn get_item(&self, id: &ItemId) -> StorageResult<Option<ManufacturingItem>> {
        let items = self
            .items
            .read()
            .map_err(|_| StorageError::Backend("items lock poisoned".to_string()))?;
        Ok(items.get(id).cloned())
    }

    async fn list_items(&self, order_id: &OrderId) -> StorageResult<Vec<ManufacturingItem>> {
        let items = self
            .items
            .read()
            .map_err(|_| StorageError::Backend("items lock poisoned".to_string()))?;
        let mut values = items
            .values()
            .filter(|item| item.order_id == *order_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(values)
    }
}

#[async_trait]
impl AttachmentStore for InMemoryStore {
    async fn get_attachment(&self, id: &AttachmentId) -> StorageResult<Option<Attachment>> {
        let attachments = self
            .attachments
            .read()
            .map_err(|_| StorageError::Backend("attachments lock poisoned".to_string()))?;
        Ok(attachments.get(id).cloned())
    }

    async fn list_attachments(&self, order_id: &OrderId) -> StorageResult<Vec<Attachment>> {
        let attachments = self
            .attachments
            .read()
            .map_err(|_| StorageError::Backend("attachments lock poisoned".to_string()))?;
        let mut values = attachments
            .values()
            .filter(|attachment| attachment.order_id == *order_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(values)
    }
}

#[async_trait]
impl TimelineStore for InMemoryStore {
    async fn append_entry(&self, event: TimelineAppend) -> StorageResult<TimelineEntry> {
        let mut timeline = self
            .timeline
            .write()
            .map_err(|_| StorageError::Backend("timeline lock poisoned".to_string()))?;
        let entry = stored_entry(event, self.next_sequence());
        timeline.push(entry.clone());
        Ok(entry)
    }

    async fn list_timeline(&self, order_id: &OrderId) -> StorageResult<Vec<TimelineEntry>> {
        let timeline = self
            .timeline
            .read()
            .map_err(|_| StorageError::Backend("timeline lock poisoned".to_string()))?;
        let mut values = timeline
            .iter()
            .filter(|entry| entry.order_id == *order_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.sequence.cmp(&b.sequence));
        Ok(values)
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn create_permission(&self, permission: Permission) -> StorageResult<()> {
        let mut permissions = self
            .permissions
            .write()
            .map_err(|_| StorageError::Backend("permissions lock poisoned".to_string()))?;
        if permissions
            .values()
            .any(|existing| existing.code == permission.code)
        {
            return Err(StorageError::UniqueViolation(format!(
                "permission code {} already exists",
                permission.code
            )));
        }
        if permissions
            .values()
            .any(|existing| existing.name == permission.name)
        {
            return Err(StorageError::UniqueViolation(format!(
                "permission name {} already exists",
                permission.name
            )));
        }
        permissions.insert(permission.id.clone(), permission);
        Ok(())
    }

    async fn find_permission_by_code(&self, code: &str) -> StorageResult<Option<Permission>> {
        let permissions = self
            .permissions
            .read()
            .map_err(|_| StorageError::Backend("permissions lock poisoned".to_string()))?;
        Ok(permissions
            .values()
            .find(|permission| permission.code == code)
            .cloned())
    }

    async fn list_permissions(&self) -> StorageResult<Vec<Permission>> {
        let permissions = self
            .permissions
            .read()
            .map_err(|_| StorageError::Backend("permissions lock poisoned".to_string()))?;
        let mut values = permissions.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(values)
    }

    async fn delete_permission(&self, id: &PermissionId) -> StorageResult<()> {
        let mut permissions = self
            .permissions
            .write()
            .map_err(|_| StorageError::Backend("permissions lock poisoned".to_string()))?;
        let roles = self
            .roles
            .read()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;

        if !permissions.contains_key(id) {
            return Err(StorageError::NotFound(format!("permission {id} not found")));
        }
        if roles.values().any(|role| role.permission_id == *id) {
            return Err(StorageError::InvariantViolation(format!(
                "permission {id} still has roles; remove them first"
            )));
        }
        permissions.remove(id);
        Ok(())
    }

    async fn add_role(&self, role: PermissionRole) -> StorageResult<()> {
        let permissions = self
            .permissions
            .read()
            .map_err(|_| StorageError::Backend("permissions lock poisoned".to_string()))?;
        let mut roles = self
            .roles
            .write()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;

        if !permissions.contains_key(&role.permission_id) {
            return Err(StorageError::NotFound(format!(
                "permission {} not found",
                role.permission_id
            )));
        }
        if roles.values().any(|existing| {
            existing.permission_id == role.permission_id && existing.role_name == role.role_name
        }) {
            return Err(StorageError::UniqueViolation(format!(
                "role {} already declared for permission {}",
                role.role_name, role.permission_id
            )));
        }
        roles.insert(role.id.clone(), role);
        Ok(())
    }

    async fn find_role(
        &self,
        permission_id: &PermissionId,
        role_name: &str,
    ) -> StorageResult<Option<PermissionRole>> {
        let roles = self
            .roles
            .read()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;
        Ok(roles
            .values()
            .find(|role| role.permission_id == *permission_id && role.role_name == role_name)
            .cloned())
    }

    async fn list_roles(&self, permission_id: &PermissionId) -> StorageResult<Vec<PermissionRole>> {
        let roles = self
            .roles
            .read()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;
        let mut values = roles
            .values()
            .filter(|role| role.permission_id == *permission_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.role_name.cmp(&b.role_name));
        Ok(values)
    }

    async fn remove_role(&self, id: &PermissionRoleId) -> StorageResult<()> {
        let mut roles = self
            .roles
            .write()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;
        let mut grants = self
            .grants
            .write()
            .map_err(|_| StorageError::Backend("grants lock poisoned".to_string()))?;

        if roles.remove(id).is_none() {
            return Err(StorageError::NotFound(format!("role {id} not found")));
        }
        grants.retain(|grant| grant.role_id != *id);
        Ok(())
    }

    async fn grant(&self, grant: UserPermission) -> StorageResult<()> {
        let roles = self
            .roles
            .read()
            .map_err(|_| StorageError::Backend("roles lock poisoned".to_string()))?;
        let mut grants = self
            .grants
            .write()
            .map_err(|_| StorageError::Backend("grants lock poisoned".to_string()))?;

        let role = roles.get(&grant.role_id).ok_or_else(|| {
            StorageError::NotFound(format!("role {} not found", grant.role_id))
        })?;
        if role.permission_id != grant.permission_id {
            return Err(StorageError::InvariantViolation(format!(
                "role {} does not belong to permission {}",
                grant.role_id, grant.permission_id
            )));
        }
        if grants.iter().any(|existing| {
            existing.user_id == grant.user_id
                && existing.permission_id == grant.permission_id
                && existing.role_id == grant.role_id
        }) {
            return Err(StorageError::UniqueViolation(format!(
                "grant already exists for user {} on role {}",
                grant.user_id, grant.role_id
            )));
        }
        grants.push(grant);
        Ok(())
    }

    async fn revoke(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        role_id: &PermissionRoleId,
    ) -> StorageResult<()> {
        let mut grants = self
            .grants
            .write()
            .map_err(|_| StorageError::Backend("grants lock poisoned".to_string()))?;
        let before = grants.len();
        grants.retain(|grant| {
            !(grant.user_id == *user_id
                && grant.permission_id == *permission_id
                && grant.role_id == *role_id)
        });
        if grants.len() == before {
            return Err(StorageError::NotFound(format!(
                "no grant for user {user_id} on role {role_id}"
            )));
        }
        Ok(())
    }

    async fn has_grant(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        role_id: &PermissionRoleId,
    ) -> StorageResult<bool> {
        let grants = self
            .grants
            .read()
            .map_err(|_| StorageError::Backend("grants lock poisoned".to_string()))?;
        Ok(grants.iter().any(|grant| {
            grant.user_id == *user_id
                && grant.permission_id == *permission_id
                && grant.role_id == *role_id
        }))
    }

    async fn list_grants(&self, user_id: &UserId) -> StorageResult<Vec<UserPermission>> {
        let grants = self
            .grants
            .read()
            .map_err(|_| StorageError::Backend("grants lock poisoned".to_string()))?;
        Ok(grants
            .iter()
            .filter(|grant| grant.user_id == *user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_reference(&self, item: ReferenceItem) -> StorageResult<()> {
        let mut references = self
            .references
            .write()
            .map_err(|_| StorageError::Backend("references lock poisoned".to_string()))?;
        if references
            .values()
            .any(|existing| existing.kind == item.kind && existing.name == item.name)
        {
            return Err(StorageError::UniqueViolation(format!(
                "{} named {} already exists",
                item.kind, item.name
            )));
        }
        references.insert(item.id.clone(), item);
        Ok(())
    }

    async fn list_references(&self, kind: ReferenceKind) -> StorageResult<Vec<ReferenceItem>> {
        let references = self
            .references
            .read()
            .map_err(|_| StorageError::Backend("references lock poisoned".to_string()))?;
        let mut values = references
            .values()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(values)
    }

    async fn deactivate_reference(&self, id: &ReferenceId) -> StorageResult<()> {
        let mut references = self
            .references
            .write()
            .map_err(|_| StorageError::Backend("references lock poisoned".to_string()))?;
        let item = references
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("reference {id} not found")))?;
        item.active = false;
        item.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use presswork_types::{Actor, OrderStage, OrderStatus};

    fn actor() -> Actor {
        Actor::new(UserId::new("user-1"), "Test User")
    }

    fn entry_for(order: &Order, action: &str) -> TimelineAppend {
        TimelineAppend {
            order_id: order.id.clone(),
            stage: order.stage,
            status: order.status,
            action: action.to_string(),
            notes: None,
            actor: actor(),
            recorded_at: Utc::now(),
        }
    }

    async fn seeded_order(store: &InMemoryStore, number: &str) -> Order {
        let order = Order::new(number)
            .with_customer("Acme")
            .with_supplier("PaperCo")
            .with_product("Labels");
        store
            .create_order(order.clone(), entry_for(&order, "Order created"))
            .await
            .unwrap();
        order
    }

    #[tokio::test]
    async fn order_numbers_are_unique() {
        let store = InMemoryStore::new();
        seeded_order(&store, "ORD-1001").await;

        let duplicate = Order::new("ORD-1001");
        let result = store
            .create_order(duplicate.clone(), entry_for(&duplicate, "Order created"))
            .await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn commit_transition_checks_version() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store, "ORD-1001").await;

        let mut first = order.clone();
        first.stage = OrderStage::Review;
        first.version = 2;
        let mut second = first.clone();

        store
            .commit_transition(TransitionWrite::new(
                first.clone(),
                1,
                entry_for(&first, "Moved to Review"),
            ))
            .await
            .unwrap();

        // Same expected version again: the stored record has moved on.
        second.stage = OrderStage::Manufacturing;
        let result = store
            .commit_transition(TransitionWrite::new(
                second.clone(),
                1,
                entry_for(&second, "Moved to Manufacturing"),
            ))
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let stored = store.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, OrderStage::Review);
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn commit_transition_rejects_unknown_order() {
        let store = InMemoryStore::new();
        let order = Order::new("ORD-9999");
        let result = store
            .commit_transition(TransitionWrite::new(
                order.clone(),
                1,
                entry_for(&order, "Moved to Review"),
            ))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_completion_leaves_no_timeline_entry() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store, "ORD-1001").await;
        let item = ManufacturingItem::new(order.id.clone(), "Roll A");

        let mut updated = order.clone();
        updated.version = 2;
        store
            .commit_transition(
                TransitionWrite::new(updated.clone(), 1, entry_for(&updated, "Items created"))
                    .with_items(vec![item.clone()]),
            )
            .await
            .unwrap();

        let completion = crate::ItemCompletion {
            item_id: item.id.clone(),
            completed_by: UserId::new("user-1"),
            completed_at: Utc::now(),
        };
        let mut next = updated.clone();
        next.version = 3;
        store
            .commit_transition(
                TransitionWrite::new(next.clone(), 2, entry_for(&next, "Item completed"))
                    .with_completed_item(completion.clone()),
            )
            .await
            .unwrap();

        // Re-completing inside a commit violates the never-un-complete rule
        // and must not leak a timeline entry or a version bump.
        let mut again = next.clone();
        again.version = 4;
        let result = store
            .commit_transition(
                TransitionWrite::new(again.clone(), 3, entry_for(&again, "Item completed"))
                    .with_completed_item(completion),
            )
            .await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        let history = store.list_timeline(&order.id).await.unwrap();
        assert_eq!(history.len(), 3);
        let stored = store.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn delete_order_cascades() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store, "ORD-1001").await;
        let item = ManufacturingItem::new(order.id.clone(), "Roll A");

        let mut updated = order.clone();
        updated.version = 2;
        store
            .commit_transition(
                TransitionWrite::new(updated.clone(), 1, entry_for(&updated, "Items created"))
                    .with_items(vec![item.clone()]),
            )
            .await
            .unwrap();

        store.delete_order(&order.id).await.unwrap();
        assert!(store.get_order(&order.id).await.unwrap().is_none());
        assert!(store.get_item(&item.id).await.unwrap().is_none());
        assert!(store.list_timeline(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeline_reads_ascending() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store, "ORD-1001").await;

        let mut updated = order.clone();
        updated.stage = OrderStage::Review;
        updated.version = 2;
        store
            .commit_transition(TransitionWrite::new(
                updated.clone(),
                1,
                entry_for(&updated, "Moved to Review"),
            ))
            .await
            .unwrap();

        let history = store.list_timeline(&order.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, "Order created");
        assert_eq!(history[1].action, "Moved to Review");
        assert!(history[0].sequence < history[1].sequence);
    }

    #[tokio::test]
    async fn sequences_stay_ascending_after_cascade_delete() {
        let store = InMemoryStore::new();
        let keeper = seeded_order(&store, "ORD-1001").await;
        let doomed = seeded_order(&store, "ORD-1002").await;

        // Interleave the two histories before the delete.
        let mut doomed_reviewed = doomed.clone();
        doomed_reviewed.stage = OrderStage::Review;
        doomed_reviewed.version = 2;
        store
            .commit_transition(TransitionWrite::new(
                doomed_reviewed.clone(),
                1,
                entry_for(&doomed_reviewed, "Moved to Review"),
            ))
            .await
            .unwrap();

        let mut reviewed = keeper.clone();
        reviewed.stage = OrderStage::Review;
        reviewed.version = 2;
        store
            .commit_transition(TransitionWrite::new(
                reviewed.clone(),
                1,
                entry_for(&reviewed, "Moved to Review"),
            ))
            .await
            .unwrap();

        store.delete_order(&doomed.id).await.unwrap();

        let mut cancelled = reviewed.clone();
        cancelled.status = OrderStatus::Cancelled;
        cancelled.version = 3;
        store
            .commit_transition(TransitionWrite::new(
                cancelled.clone(),
                2,
                entry_for(&cancelled, "Order cancelled"),
            ))
            .await
            .unwrap();

        // The survivor's history must read in append order even though the
        // cascade shrank the backing store.
        let history = store.list_timeline(&keeper.id).await.unwrap();
        let actions: Vec<&str> = history.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec!["Order created", "Moved to Review", "Order cancelled"]
        );
        assert!(history.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[tokio::test]
    async fn permission_codes_are_unique() {
        let store = InMemoryStore::new();
        store
            .create_permission(Permission::new("Users Management", "USERS"))
            .await
            .unwrap();
        let result = store
            .create_permission(Permission::new("Other Name", "USERS"))
            .await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn role_names_are_unique_per_permission() {
        let store = InMemoryStore::new();
        let permission = Permission::new("Users Management", "USERS");
        store.create_permission(permission.clone()).await.unwrap();

        store
            .add_role(PermissionRole::new(permission.id.clone(), "Edit"))
            .await
            .unwrap();
        let result = store
            .add_role(PermissionRole::new(permission.id.clone(), "Edit"))
            .await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn remove_role_cascades_grants() {
        let store = InMemoryStore::new();
        let permission = Permission::new("Users Management", "USERS");
        store.create_permission(permission.clone()).await.unwrap();
        let role = PermissionRole::new(permission.id.clone(), "Edit");
        store.add_role(role.clone()).await.unwrap();

        let user = UserId::new("user-1");
        store
            .grant(UserPermission::new(
                user.clone(),
                permission.id.clone(),
                role.id.clone(),
            ))
            .await
            .unwrap();
        assert!(store
            .has_grant(&user, &permission.id, &role.id)
            .await
            .unwrap());

        store.remove_role(&role.id).await.unwrap();
        assert!(!store
            .has_grant(&user, &permission.id, &role.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_permission_is_restricted_while_roles_exist() {
        let store = InMemoryStore::new();
        let permission = Permission::new("Users Management", "USERS");
        store.create_permission(permission.clone()).await.unwrap();
        let role = PermissionRole::new(permission.id.clone(), "Edit");
        store.add_role(role.clone()).await.unwrap();

        let result = store.delete_permission(&permission.id).await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        store.remove_role(&role.id).await.unwrap();
        store.delete_permission(&permission.id).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_grants_are_rejected() {
        let store = InMemoryStore::new();
        let permission = Permission::new("Users Management", "USERS");
        store.create_permission(permission.clone()).await.unwrap();
        let role = PermissionRole::new(permission.id.clone(), "Edit");
        store.add_role(role.clone()).await.unwrap();

        let user = UserId::new("user-1");
        store
            .grant(UserPermission::new(
                user.clone(),
                permission.id.clone(),
                role.id.clone(),
            ))
            .await
            .unwrap();
        let result = store
            .grant(UserPermission::new(
                user.clone(),
                permission.id.clone(),
                role.id.clone(),
            ))
            .await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn reference_names_are_unique_per_kind() {
        let store = InMemoryStore::new();
        store
            .create_reference(ReferenceItem::new(ReferenceKind::Material, "Vinyl"))
            .await
            .unwrap();
        // Same name under a different kind is fine.
        store
            .create_reference(ReferenceItem::new(ReferenceKind::Supplier, "Vinyl"))
            .await
            .unwrap();
        let result = store
            .create_reference(ReferenceItem::new(ReferenceKind::Material, "Vinyl"))
            .await;
        assert!(matches!(result, Err(StorageError::UniqueViolation(_))));
    }
}
