//! PostgreSQL adapter for Presswork storage.
//!
//! This adapter is the transactional source-of-truth backend. Every
//! `commit_transition` runs as a single transaction: the version-checked
//! order update, item writes, attachment insert, and timeline append commit
//! together or not at all. Unique constraints mirror the contract in
//! `traits.rs` and surface as `UniqueViolation`.

use crate::traits::{
    AttachmentStore, CatalogStore, ItemStore, OrderStore, PermissionStore, QueryWindow,
    TimelineStore, TransitionWrite,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use presswork_types::{
    Actor, Attachment, AttachmentId, ItemId, ManufacturingItem, Order, OrderId, OrderStage,
    OrderStatus, Permission, PermissionId, PermissionRole, PermissionRoleId, ReferenceId,
    ReferenceItem, ReferenceKind, TimelineAppend, TimelineEntry, UserId, UserPermission,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS presswork_orders (
                id TEXT PRIMARY KEY,
                order_number TEXT NOT NULL UNIQUE,
                stage TEXT NOT NULL,
                status TEXT NOT NULL,
                customer TEXT NOT NULL,
                supplier TEXT NOT NULL,
                product TEXT NOT NULL,
                notes TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                version BIGINT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_items (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                description TEXT NOT NULL,
                completed BOOLEAN NOT NULL,
                completed_at TIMESTAMPTZ,
                completed_by TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_attachments (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                uploaded_by TEXT NOT NULL,
                uploaded_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_timeline (
                entry_id TEXT PRIMARY KEY,
                sequence BIGSERIAL UNIQUE,
                order_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                status TEXT NOT NULL,
                action TEXT NOT NULL,
                notes TEXT,
                actor_id TEXT NOT NULL,
                actor_name TEXT NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_permissions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                code TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_permission_roles (
                id TEXT PRIMARY KEY,
                permission_id TEXT NOT NULL,
                role_name TEXT NOT NULL,
                UNIQUE (permission_id, role_name)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_grants (
                user_id TEXT NOT NULL,
                permission_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                granted_at TIMESTAMPTZ NOT NULL,
                granted_by TEXT,
                PRIMARY KEY (user_id, permission_id, role_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS presswork_references (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                active BOOLEAN NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (kind, name)
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn map_unique(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::UniqueViolation(db.message().to_string())
        }
        _ => StorageError::Backend(e.to_string()),
    }
}

fn order_from_row(row: &PgRow) -> StorageResult<Order> {
    let stage_raw: String = row.try_get("stage").map_err(backend)?;
    let status_raw: String = row.try_get("status").map_err(backend)?;
    let stage = OrderStage::parse(&stage_raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown stage: {stage_raw}")))?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown status: {status_raw}")))?;
    Ok(Order {
        id: OrderId::new(row.try_get::<String, _>("id").map_err(backend)?),
        order_number: row.try_get("order_number").map_err(backend)?,
        stage,
        status,
        customer: row.try_get("customer").map_err(backend)?,
        supplier: row.try_get("supplier").map_err(backend)?,
        product: row.try_get("product").map_err(backend)?,
        notes: row.try_get("notes").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
        version: row.try_get::<i64, _>("version").map_err(backend)? as u64,
    })
}

fn item_from_row(row: &PgRow) -> StorageResult<ManufacturingItem> {
    Ok(ManufacturingItem {
        id: ItemId::new(row.try_get::<String, _>("id").map_err(backend)?),
        order_id: OrderId::new(row.try_get::<String, _>("order_id").map_err(backend)?),
        description: row.try_get("description").map_err(backend)?,
        completed: row.try_get("completed").map_err(backend)?,
        completed_at: row.try_get("completed_at").map_err(backend)?,
        completed_by: row
            .try_get::<Option<String>, _>("completed_by")
            .map_err(backend)?
            .map(UserId::new),
    })
}

fn attachment_from_row(row: &PgRow) -> StorageResult<Attachment> {
    Ok(Attachment {
        id: AttachmentId::new(row.try_get::<String, _>("id").map_err(backend)?),
        order_id: OrderId::new(row.try_get::<String, _>("order_id").map_err(backend)?),
        file_name: row.try_get("file_name").map_err(backend)?,
        storage_path: row.try_get("storage_path").map_err(backend)?,
        uploaded_by: UserId::new(row.try_get::<String, _>("uploaded_by").map_err(backend)?),
        uploaded_at: row.try_get("uploaded_at").map_err(backend)?,
    })
}

fn entry_from_row(row: &PgRow) -> StorageResult<TimelineEntry> {
    let stage_raw: String = row.try_get("stage").map_err(backend)?;
    let status_raw: String = row.try_get("status").map_err(backend)?;
    let stage = OrderStage::parse(&stage_raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown stage: {stage_raw}")))?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown status: {status_raw}")))?;
    Ok(TimelineEntry {
        entry_id: row.try_get("entry_id").map_err(backend)?,
        sequence: row.try_get::<i64, _>("sequence").map_err(backend)? as u64,
        order_id: OrderId::new(row.try_get::<String, _>("order_id").map_err(backend)?),
        stage,
        status,
        action: row.try_get("action").map_err(backend)?,
        notes: row.try_get("notes").map_err(backend)?,
        actor: Actor::new(
            UserId::new(row.try_get::<String, _>("actor_id").map_err(backend)?),
            row.try_get::<String, _>("actor_name").map_err(backend)?,
        ),
        recorded_at: row.try_get("recorded_at").map_err(backend)?,
    })
}

fn permission_from_row(row: &PgRow) -> StorageResult<Permission> {
    Ok(Permission {
        id: PermissionId::new(row.try_get::<String, _>("id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        code: row.try_get("code").map_err(backend)?,
        description: row.try_get("description").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

fn role_from_row(row: &PgRow) -> StorageResult<PermissionRole> {
    Ok(PermissionRole {
        id: PermissionRoleId::new(row.try_get::<String, _>("id").map_err(backend)?),
        permission_id: PermissionId::new(
            row.try_get::<String, _>("permission_id").map_err(backend)?,
        ),
        role_name: row.try_get("role_name").map_err(backend)?,
    })
}

fn grant_from_row(row: &PgRow) -> StorageResult<UserPermission> {
    Ok(UserPermission {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(backend)?),
        permission_id: PermissionId::new(
            row.try_get::<String, _>("permission_id").map_err(backend)?,
        ),
        role_id: PermissionRoleId::new(row.try_get::<String, _>("role_id").map_err(backend)?),
        granted_at: row.try_get("granted_at").map_err(backend)?,
        granted_by: row
            .try_get::<Option<String>, _>("granted_by")
            .map_err(backend)?
            .map(UserId::new),
    })
}

fn reference_from_row(row: &PgRow) -> StorageResult<ReferenceItem> {
    let kind_raw: String = row.try_get("kind").map_err(backend)?;
    let kind = ReferenceKind::parse(&kind_raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown reference kind: {kind_raw}")))?;
    Ok(ReferenceItem {
        id: ReferenceId::new(row.try_get::<String, _>("id").map_err(backend)?),
        kind,
        name: row.try_get("name").map_err(backend)?,
        active: row.try_get("active").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

async fn insert_timeline_entry<'a>(
    tx: &mut sqlx::Transaction<'a, sqlx::Postgres>,
    event: &TimelineAppend,
) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO presswork_timeline
            (entry_id, order_id, stage, status, action, notes, actor_id, actor_name, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(format!("tl-{}", Uuid::new_v4()))
    .bind(event.order_id.0.clone())
    .bind(event.stage.as_str())
    .bind(event.status.as_str())
    .bind(event.action.clone())
    .bind(event.notes.clone())
    .bind(event.actor.user_id.0.clone())
    .bind(event.actor.display_name.clone())
    .bind(event.recorded_at)
    .execute(&mut **tx)
    .await
    .map_err(backend)?;
    Ok(())
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: Order, entry: TimelineAppend) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO presswork_orders
                (id, order_number, stage, status, customer, supplier, product, notes, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.0.clone())
        .bind(order.order_number.clone())
        .bind(order.stage.as_str())
        .bind(order.status.as_str())
        .bind(order.customer.clone())
        .bind(order.supplier.clone())
        .bind(order.product.clone())
        .bind(order.notes.clone())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.version as i64)
        .execute(&mut *tx)
        .await
        .map_err(map_unique)?;

        insert_timeline_entry(&mut tx, &entry).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM presswork_orders WHERE id = $1")
            .bind(id.0.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_order_by_number(&self, order_number: &str) -> StorageResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM presswork_orders WHERE order_number = $1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn commit_transition(&self, write: TransitionWrite) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Version-checked update; the order number is deliberately never
        // written back (immutable post-creation).
        let result = sqlx::query(
            r#"
            UPDATE presswork_orders
               SET stage = $1,
                   status = $2,
                   customer = $3,
                   supplier = $4,
                   product = $5,
                   notes = $6,
                   updated_at = $7,
                   version = $8
             WHERE id = $9
               AND version = $10
            "#,
        )
        .bind(write.order.stage.as_str())
        .bind(write.order.status.as_str())
        .bind(write.order.customer.clone())
        .bind(write.order.supplier.clone())
        .bind(write.order.product.clone())
        .bind(write.order.notes.clone())
        .bind(write.order.updated_at)
        .bind(write.order.version as i64)
        .bind(write.order.id.0.clone())
        .bind(write.expected_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM presswork_orders WHERE id = $1")
                .bind(write.order.id.0.clone())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?
                .is_some();
            if exists {
                return Err(StorageError::Conflict(format!(
                    "order {} changed: expected version {}",
                    write.order.id, write.expected_version
                )));
            }
            return Err(StorageError::NotFound(format!(
                "order {} not found",
                write.order.id
            )));
        }

        for item in &write.new_items {
            sqlx::query(
                r#"
                INSERT INTO presswork_items
                    (id, order_id, description, completed, completed_at, completed_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id.0.clone())
            .bind(item.order_id.0.clone())
            .bind(item.description.clone())
            .bind(item.completed)
            .bind(item.completed_at)
            .bind(item.completed_by.as_ref().map(|u| u.0.clone()))
            .execute(&mut *tx)
            .await
            .map_err(map_unique)?;
        }

        if let Some(completion) = &write.completed_item {
            let result = sqlx::query(
                r#"
                UPDATE presswork_items
                   SET completed = TRUE,
                       completed_at = $1,
                       completed_by = $2
                 WHERE id = $3
                   AND order_id = $4
                   AND completed = FALSE
                "#,
            )
            .bind(completion.completed_at)
            .bind(completion.completed_by.0.clone())
            .bind(completion.item_id.0.clone())
            .bind(write.order.id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 0 {
                let exists = sqlx::query("SELECT 1 FROM presswork_items WHERE id = $1")
                    .bind(completion.item_id.0.clone())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?
                    .is_some();
                if exists {
                    return Err(StorageError::InvariantViolation(format!(
                        "item {} is already completed or belongs to another order",
                        completion.item_id
                    )));
                }
                return Err(StorageError::NotFound(format!(
                    "item {} not found",
                    completion.item_id
                )));
            }
        }

        if let Some(attachment) = &write.new_attachment {
            sqlx::query(
                r#"
                INSERT INTO presswork_attachments
                    (id, order_id, file_name, storage_path, uploaded_by, uploaded_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attachment.id.0.clone())
            .bind(attachment.order_id.0.clone())
            .bind(attachment.file_name.clone())
            .bind(attachment.storage_path.clone())
            .bind(attachment.uploaded_by.0.clone())
            .bind(attachment.uploaded_at)
            .execute(&mut *tx)
            .await
            .map_err(map_unique)?;
        }

        insert_timeline_entry(&mut tx, &write.entry).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn list_orders(&self, window: QueryWindow) -> StorageResult<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM presswork_orders
             ORDER BY created_at DESC
             LIMIT NULLIF($1, 0) OFFSET $2
            "#,
        )
        .bind(window.limit as i64)
        .bind(window.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn delete_order(&self, id: &OrderId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let result = sqlx::query("DELETE FROM presswork_orders WHERE id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("order {id} not found")));
        }

        sqlx::query("DELETE FROM presswork_items WHERE order_id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM presswork_attachments WHERE order_id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        sqlx::query("DELETE FROM presswork_timeline WHERE order_id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PostgresStore {
    async fn get_item(&self, id: &ItemId) -> StorageResult<Option<ManufacturingItem>> {
        let row = sqlx::query("SELECT * FROM presswork_items WHERE id = $1")
            .bind(id.0.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self, order_id: &OrderId) -> StorageResult<Vec<ManufacturingItem>> {
        let rows = sqlx::query("SELECT * FROM presswork_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id.0.clone())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(item_from_row).collect()
    }
}

#[async_trait]
impl AttachmentStore for PostgresStore {
    async fn get_attachment(&self, id: &AttachmentId) -> StorageResult<Option<Attachment>> {
        let row = sqlx::query("SELECT * FROM presswork_attachments WHERE id = $1")
            .bind(id.0.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(attachment_from_row).transpose()
    }

    async fn list_attachments(&self, order_id: &OrderId) -> StorageResult<Vec<Attachment>> {
        let rows = sqlx::query(
            "SELECT * FROM presswork_attachments WHERE order_id = $1 ORDER BY uploaded_at",
        )
        .bind(order_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(attachment_from_row).collect()
    }
}

#[async_trait]
impl TimelineStore for PostgresStore {
    async fn append_entry(&self, event: TimelineAppend) -> StorageResult<TimelineEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO presswork_timeline
                (entry_id, order_id, stage, status, action, notes, actor_id, actor_name, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(format!("tl-{}", Uuid::new_v4()))
        .bind(event.order_id.0.clone())
        .bind(event.stage.as_str())
        .bind(event.status.as_str())
        .bind(event.action.clone())
        .bind(event.notes.clone())
        .bind(event.actor.user_id.0.clone())
        .bind(event.actor.display_name.clone())
        .bind(event.recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        entry_from_row(&row)
    }

    async fn list_timeline(&self, order_id: &OrderId) -> StorageResult<Vec<TimelineEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM presswork_timeline WHERE order_id = $1 ORDER BY sequence",
        )
        .bind(order_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl PermissionStore for PostgresStore {
    async fn create_permission(&self, permission: Permission) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO presswork_permissions (id, name, code, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(permission.id.0.clone())
        .bind(permission.name.clone())
        .bind(permission.code.clone())
        .bind(permission.description.clone())
        .bind(permission.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_permission_by_code(&self, code: &str) -> StorageResult<Option<Permission>> {
        let row = sqlx::query("SELECT * FROM presswork_permissions WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref().map(permission_from_row).transpose()
    }

    async fn list_permissions(&self) -> StorageResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT * FROM presswork_permissions ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(permission_from_row).collect()
    }

    async fn delete_permission(&self, id: &PermissionId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let has_roles =
            sqlx::query("SELECT 1 FROM presswork_permission_roles WHERE permission_id = $1 LIMIT 1")
                .bind(id.0.clone())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?
                .is_some();
        if has_roles {
            return Err(StorageError::InvariantViolation(format!(
                "permission {id} still has roles; remove them first"
            )));
        }

        let result = sqlx::query("DELETE FROM presswork_permissions WHERE id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("permission {id} not found")));
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn add_role(&self, role: PermissionRole) -> StorageResult<()> {
        let permission_exists = sqlx::query("SELECT 1 FROM presswork_permissions WHERE id = $1")
            .bind(role.permission_id.0.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .is_some();
        if !permission_exists {
            return Err(StorageError::NotFound(format!(
                "permission {} not found",
                role.permission_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO presswork_permission_roles (id, permission_id, role_name)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(role.id.0.clone())
        .bind(role.permission_id.0.clone())
        .bind(role.role_name.clone())
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn find_role(
        &self,
        permission_id: &PermissionId,
        role_name: &str,
    ) -> StorageResult<Option<PermissionRole>> {
        let row = sqlx::query(
            "SELECT * FROM presswork_permission_roles WHERE permission_id = $1 AND role_name = $2",
        )
        .bind(permission_id.0.clone())
        .bind(role_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.as_ref().map(role_from_row).transpose()
    }

    async fn list_roles(&self, permission_id: &PermissionId) -> StorageResult<Vec<PermissionRole>> {
        let rows = sqlx::query(
            "SELECT * FROM presswork_permission_roles WHERE permission_id = $1 ORDER BY role_name",
        )
        .bind(permission_id.0.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(role_from_row).collect()
    }

    async fn remove_role(&self, id: &PermissionRoleId) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM presswork_grants WHERE role_id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("DELETE FROM presswork_permission_roles WHERE id = $1")
            .bind(id.0.clone())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("role {id} not found")));
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn grant(&self, grant: UserPermission) -> StorageResult<()> {
        let role_row =
            sqlx::query("SELECT permission_id FROM presswork_permission_roles WHERE id = $1")
                .bind(grant.role_id.0.clone())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        let Some(role_row) = role_row else {
            return Err(StorageError::NotFound(format!(
                "role {} not found",
                grant.role_id
            )));
        };
        let owner: String = role_row.try_get("permission_id").map_err(backend)?;
        if owner != grant.permission_id.0 {
            return Err(StorageError::InvariantViolation(format!(
                "role {} does not belong to permission {}",
                grant.role_id, grant.permission_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO presswork_grants (user_id, permission_id, role_id, granted_at, granted_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(grant.user_id.0.clone())
        .bind(grant.permission_id.0.clone())
        .bind(grant.role_id.0.clone())
        .bind(grant.granted_at)
        .bind(grant.granted_by.as_ref().map(|u| u.0.clone()))
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn revoke(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        role_id: &PermissionRoleId,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "DELETE FROM presswork_grants WHERE user_id = $1 AND permission_id = $2 AND role_id = $3",
        )
        .bind(user_id.0.clone())
        .bind(permission_id.0.clone())
        .bind(role_id.0.clone())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
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
        let row = sqlx::query(
            "SELECT 1 FROM presswork_grants WHERE user_id = $1 AND permission_id = $2 AND role_id = $3",
        )
        .bind(user_id.0.clone())
        .bind(permission_id.0.clone())
        .bind(role_id.0.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn list_grants(&self, user_id: &UserId) -> StorageResult<Vec<UserPermission>> {
        let rows = sqlx::query("SELECT * FROM presswork_grants WHERE user_id = $1")
            .bind(user_id.0.clone())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(grant_from_row).collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_reference(&self, item: ReferenceItem) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO presswork_references (id, kind, name, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id.0.clone())
        .bind(item.kind.as_str())
        .bind(item.name.clone())
        .bind(item.active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn list_references(&self, kind: ReferenceKind) -> StorageResult<Vec<ReferenceItem>> {
        let rows = sqlx::query("SELECT * FROM presswork_references WHERE kind = $1 ORDER BY name")
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(reference_from_row).collect()
    }

    async fn deactivate_reference(&self, id: &ReferenceId) -> StorageResult<()> {
        let result =
            sqlx::query("UPDATE presswork_references SET active = FALSE, updated_at = $1 WHERE id = $2")
                .bind(Utc::now())
                .bind(id.0.clone())
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("reference {id} not found")));
        }
        Ok(())
    }
}
