//! Presswork Service - the authorization-gated application facade
//!
//! This is the one entry point callers are meant to use. Every mutating and
//! reading operation names a policy, resolves it through the policy
//! registry, and evaluates the caller's grants before touching the workflow
//! engine. The engines themselves stay permission-free; the gate lives here.
//!
//! Policy names follow the `CODE.Role` convention (`ORDERS.Edit`), with a
//! small explicit table for operations whose required role differs from
//! their name — cancellation, for instance, demands the `Delete` role.

#![deny(unsafe_code)]

use presswork_authz::{
    ensure_seed_data, AuthorizationEngine, AuthzError, PolicyRegistry, PolicyRequirement,
    SeedReport,
};
use presswork_identity::{
    IdentityError, IdentityRole, RegistrationRequest, UserAccount, UserDirectory,
};
use presswork_storage::memory::InMemoryStore;
use presswork_storage::{PermissionStore, PressworkStore, QueryWindow};
use presswork_types::{
    roles, Actor, Attachment, ManufacturingItem, Order, OrderId, TimelineEntry, UserId,
};
use presswork_workflow::{NewOrder, OrderWorkflowEngine, WorkflowError};
use std::sync::Arc;
use thiserror::Error;

mod policies {
    pub const ORDERS_VIEW: &str = "ORDERS.View";
    pub const ORDERS_CREATE: &str = "ORDERS.Create";
    pub const ORDERS_EDIT: &str = "ORDERS.Edit";
    pub const ORDERS_CANCEL: &str = "ORDERS.Cancel";
    pub const ORDERS_DELETE: &str = "ORDERS.Delete";
}

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller lacks the required permission role. Carries no detail
    /// about which check failed.
    #[error("access denied")]
    Denied,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The unified Presswork service.
pub struct PressworkService {
    workflow: OrderWorkflowEngine,
    authz: AuthorizationEngine,
    policies: PolicyRegistry,
    directory: UserDirectory,
    permission_store: Arc<dyn PermissionStore>,
}

impl PressworkService {
    /// Create a service over the in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Create a service over an explicit storage backend.
    pub fn with_store<S: PressworkStore + 'static>(store: Arc<S>) -> Self {
        Self {
            workflow: OrderWorkflowEngine::new(store.clone()),
            authz: AuthorizationEngine::new(store.clone()),
            policies: Self::default_policies(),
            directory: UserDirectory::new(),
            permission_store: store,
        }
    }

    fn default_policies() -> PolicyRegistry {
        // Cancellation is an Edit-shaped verb with Delete-shaped authority.
        PolicyRegistry::with_entries([(
            policies::ORDERS_CANCEL,
            PolicyRequirement::new("ORDERS", roles::DELETE),
        )])
    }

    /// Register the bootstrap administrator and seed the permission tables.
    /// Safe to call on every startup; repeat runs change nothing.
    pub async fn bootstrap(
        &self,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> ServiceResult<(UserAccount, SeedReport)> {
        let username = username.into();
        let account = match self.directory.find_by_username(&username)? {
            Some(existing) => existing,
            None => self.directory.register(
                RegistrationRequest::new(username, display_name)
                    .with_roles(vec![IdentityRole::Admin]),
            )?,
        };
        let report = ensure_seed_data(self.permission_store.as_ref(), &account.user_id).await?;
        if !report.is_noop() {
            tracing::info!(admin = %account.username, "bootstrap seeded permission data");
        }
        Ok((account, report))
    }

    /// Register a regular account with no grants. Access comes later,
    /// through `grant_role`.
    pub fn register_user(
        &self,
        username: impl Into<String>,
        display_name: impl Into<String>,
    ) -> ServiceResult<UserAccount> {
        Ok(self
            .directory
            .register(RegistrationRequest::new(username, display_name))?)
    }

    // ── Grant administration ─────────────────────────────────────────────

    pub async fn grant_role(
        &self,
        granter: &UserId,
        user: &UserId,
        permission_code: &str,
        role_name: &str,
    ) -> ServiceResult<()> {
        self.require("PERMISSIONS.Edit", granter).await?;
        self.authz
            .grant_role(user, permission_code, role_name, Some(granter))
            .await?;
        Ok(())
    }

    pub async fn revoke_role(
        &self,
        granter: &UserId,
        user: &UserId,
        permission_code: &str,
        role_name: &str,
    ) -> ServiceResult<()> {
        self.require("PERMISSIONS.Edit", granter).await?;
        self.authz.revoke_role(user, permission_code, role_name).await?;
        Ok(())
    }

    // ── Order operations ─────────────────────────────────────────────────

    pub async fn create_order(&self, user: &UserId, request: NewOrder) -> ServiceResult<Order> {
        self.require(policies::ORDERS_CREATE, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.create_order(request, &actor).await?)
    }

    pub async fn add_attachment(
        &self,
        user: &UserId,
        order_id: &OrderId,
        file_name: &str,
        storage_path: &str,
    ) -> ServiceResult<Attachment> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self
            .workflow
            .add_attachment(order_id, file_name, storage_path, &actor)
            .await?)
    }

    pub async fn move_to_review(&self, user: &UserId, order_id: &OrderId) -> ServiceResult<Order> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.move_to_review(order_id, &actor).await?)
    }

    pub async fn move_to_manufacturing(
        &self,
        user: &UserId,
        order_id: &OrderId,
        item_descriptions: Vec<String>,
    ) -> ServiceResult<Order> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self
            .workflow
            .move_to_manufacturing(order_id, item_descriptions, &actor)
            .await?)
    }

    pub async fn complete_item(
        &self,
        user: &UserId,
        item_id: &presswork_types::ItemId,
    ) -> ServiceResult<ManufacturingItem> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.complete_item(item_id, &actor).await?)
    }

    pub async fn move_to_printing(&self, user: &UserId, order_id: &OrderId) -> ServiceResult<Order> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.move_to_printing(order_id, &actor).await?)
    }

    pub async fn complete_printing(
        &self,
        user: &UserId,
        order_id: &OrderId,
    ) -> ServiceResult<Order> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.complete_printing(order_id, &actor).await?)
    }

    pub async fn cancel_order(
        &self,
        user: &UserId,
        order_id: &OrderId,
        reason: &str,
    ) -> ServiceResult<Order> {
        self.require(policies::ORDERS_CANCEL, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.cancel_order(order_id, reason, &actor).await?)
    }

    pub async fn flag_late(&self, user: &UserId, order_id: &OrderId) -> ServiceResult<Order> {
        self.require(policies::ORDERS_EDIT, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.flag_late(order_id, &actor).await?)
    }

    pub async fn delete_order(&self, user: &UserId, order_id: &OrderId) -> ServiceResult<()> {
        self.require(policies::ORDERS_DELETE, user).await?;
        let actor = self.actor_for(user)?;
        Ok(self.workflow.delete_order(order_id, &actor).await?)
    }

    // ── Order queries ────────────────────────────────────────────────────

    pub async fn get_order(&self, user: &UserId, order_id: &OrderId) -> ServiceResult<Order> {
        self.require(policies::ORDERS_VIEW, user).await?;
        Ok(self.workflow.get_order(order_id).await?)
    }

    pub async fn list_orders(
        &self,
        user: &UserId,
        window: QueryWindow,
    ) -> ServiceResult<Vec<Order>> {
        self.require(policies::ORDERS_VIEW, user).await?;
        Ok(self.workflow.list_orders(window).await?)
    }

    pub async fn timeline(
        &self,
        user: &UserId,
        order_id: &OrderId,
    ) -> ServiceResult<Vec<TimelineEntry>> {
        self.require(policies::ORDERS_VIEW, user).await?;
        Ok(self.workflow.timeline(order_id).await?)
    }

    pub async fn items(
        &self,
        user: &UserId,
        order_id: &OrderId,
    ) -> ServiceResult<Vec<ManufacturingItem>> {
        self.require(policies::ORDERS_VIEW, user).await?;
        Ok(self.workflow.items(order_id).await?)
    }

    pub async fn attachments(
        &self,
        user: &UserId,
        order_id: &OrderId,
    ) -> ServiceResult<Vec<Attachment>> {
        self.require(policies::ORDERS_VIEW, user).await?;
        Ok(self.workflow.attachments(order_id).await?)
    }

    // ── Component access ─────────────────────────────────────────────────

    pub fn workflow(&self) -> &OrderWorkflowEngine {
        &self.workflow
    }

    pub fn authz(&self) -> &AuthorizationEngine {
        &self.authz
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn require(&self, policy: &str, user: &UserId) -> ServiceResult<()> {
        let decision = self.policies.authorize(&self.authz, policy, user).await?;
        if decision.authorized {
            Ok(())
        } else {
            tracing::debug!(policy, user = %user, "request denied");
            Err(ServiceError::Denied)
        }
    }

    fn actor_for(&self, user: &UserId) -> ServiceResult<Actor> {
        let account = self
            .directory
            .lookup(user)?
            .ok_or_else(|| IdentityError::NotFound(user.0.clone()))?;
        if !account.active {
            return Err(ServiceError::Denied);
        }
        Ok(Actor::new(account.user_id, account.display_name))
    }
}

impl Default for PressworkService {
    fn default() -> Self {
        Self::new()
    }
}
