use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use presswork_types::{
    Attachment, AttachmentId, ItemId, ManufacturingItem, Order, OrderId, Permission, PermissionId,
    PermissionRole, PermissionRoleId, ReferenceId, ReferenceItem, ReferenceKind, TimelineAppend,
    TimelineEntry, UserId, UserPermission,
};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Completion of one manufacturing item, applied inside a transition commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCompletion {
    pub item_id: ItemId,
    pub completed_by: UserId,
    pub completed_at: DateTime<Utc>,
}

/// One atomic order mutation.
///
/// Carries the fully updated order (version already bumped by the caller),
/// the version the caller read, and everything that must land in the same
/// commit: new manufacturing items, at most one item completion, at most one
/// new attachment, and the timeline entry. A store either persists all of it
/// or none of it.
#[derive(Debug, Clone)]
pub struct TransitionWrite {
    pub order: Order,
    pub expected_version: u64,
    pub new_items: Vec<ManufacturingItem>,
    pub completed_item: Option<ItemCompletion>,
    pub new_attachment: Option<Attachment>,
    pub entry: TimelineAppend,
}

impl TransitionWrite {
    pub fn new(order: Order, expected_version: u64, entry: TimelineAppend) -> Self {
        Self {
            order,
            expected_version,
            new_items: Vec::new(),
            completed_item: None,
            new_attachment: None,
            entry,
        }
    }

    pub fn with_items(mut self, items: Vec<ManufacturingItem>) -> Self {
        self.new_items = items;
        self
    }

    pub fn with_completed_item(mut self, completion: ItemCompletion) -> Self {
        self.completed_item = Some(completion);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.new_attachment = Some(attachment);
        self
    }
}

/// Storage interface for order records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order and its creation timeline entry in one commit.
    /// The order number must be unique across all orders, active or not.
    async fn create_order(&self, order: Order, entry: TimelineAppend) -> StorageResult<()>;

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>>;

    async fn find_order_by_number(&self, order_number: &str) -> StorageResult<Option<Order>>;

    /// Apply one atomic transition. Fails with `Conflict` when the stored
    /// version no longer matches `expected_version`, and `NotFound` when the
    /// order does not exist. Nothing is written on failure.
    async fn commit_transition(&self, write: TransitionWrite) -> StorageResult<()>;

    /// List orders newest-first.
    async fn list_orders(&self, window: QueryWindow) -> StorageResult<Vec<Order>>;

    /// Administrative delete: removes the order and cascades to its items,
    /// attachments, and timeline. Distinct from cancellation.
    async fn delete_order(&self, id: &OrderId) -> StorageResult<()>;
}

/// Read access to manufacturing items. Mutation happens exclusively through
/// `OrderStore::commit_transition` so item state, the order version, and the
/// timeline cannot diverge.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_item(&self, id: &ItemId) -> StorageResult<Option<ManufacturingItem>>;

    async fn list_items(&self, order_id: &OrderId) -> StorageResult<Vec<ManufacturingItem>>;
}

/// Read access to intake attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn get_attachment(&self, id: &AttachmentId) -> StorageResult<Option<Attachment>>;

    async fn list_attachments(&self, order_id: &OrderId) -> StorageResult<Vec<Attachment>>;
}

/// Storage interface for the append-only order timeline.
#[async_trait]
pub trait TimelineStore: Send + Sync {
    /// Append an event outside an order transition (collaborator use).
    async fn append_entry(&self, event: TimelineAppend) -> StorageResult<TimelineEntry>;

    /// Read an order's history, ascending by append sequence.
    async fn list_timeline(&self, order_id: &OrderId) -> StorageResult<Vec<TimelineEntry>>;
}

/// Storage interface for permissions, their roles, and user grants.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Insert a permission. Both `code` and `name` are unique.
    async fn create_permission(&self, permission: Permission) -> StorageResult<()>;

    async fn find_permission_by_code(&self, code: &str) -> StorageResult<Option<Permission>>;

    async fn list_permissions(&self) -> StorageResult<Vec<Permission>>;

    /// Delete a permission. Restricted: fails while roles still exist, so
    /// grants tied to a live permission are never silently orphaned.
    async fn delete_permission(&self, id: &PermissionId) -> StorageResult<()>;

    /// Add a role. `(permission_id, role_name)` is unique.
    async fn add_role(&self, role: PermissionRole) -> StorageResult<()>;

    async fn find_role(
        &self,
        permission_id: &PermissionId,
        role_name: &str,
    ) -> StorageResult<Option<PermissionRole>>;

    async fn list_roles(&self, permission_id: &PermissionId) -> StorageResult<Vec<PermissionRole>>;

    /// Remove a role. Cascades: dependent user grants are removed with it.
    async fn remove_role(&self, id: &PermissionRoleId) -> StorageResult<()>;

    /// Insert a grant. `(user_id, permission_id, role_id)` is unique.
    async fn grant(&self, grant: UserPermission) -> StorageResult<()>;

    async fn revoke(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        role_id: &PermissionRoleId,
    ) -> StorageResult<()>;

    /// Pure existence check for one grant triple.
    async fn has_grant(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        role_id: &PermissionRoleId,
    ) -> StorageResult<bool>;

    async fn list_grants(&self, user_id: &UserId) -> StorageResult<Vec<UserPermission>>;
}

/// Storage interface for master reference data.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a reference record. `(kind, name)` is unique.
    async fn create_reference(&self, item: ReferenceItem) -> StorageResult<()>;

    async fn list_references(&self, kind: ReferenceKind) -> StorageResult<Vec<ReferenceItem>>;

    async fn deactivate_reference(&self, id: &ReferenceId) -> StorageResult<()>;
}

/// Unified storage bundle consumed by the Presswork engines.
pub trait PressworkStore:
    OrderStore + ItemStore + AttachmentStore + TimelineStore + PermissionStore + CatalogStore + Send + Sync
{
}

impl<T> PressworkStore for T where
    T: OrderStore
        + ItemStore
        + AttachmentStore
        + TimelineStore
        + PermissionStore
        + CatalogStore
        + Send
        + Sync
{
}
