//! Built-in permission seeding.
//!
//! On a fresh deployment the permission tables are empty, which would lock
//! everyone out. `ensure_seed_data` creates the built-in permissions, their
//! standard roles, and a `Manage` grant for the bootstrap administrator. It
//! is idempotent: every write is guarded by an existence check, so running
//! it on every startup is safe.

use crate::AuthzResult;
use presswork_storage::PermissionStore;
use presswork_types::{roles, Permission, PermissionRole, UserId, UserPermission};

/// The permissions every deployment starts with, as `(name, code)`.
pub const BUILTIN_PERMISSIONS: [(&str, &str); 4] = [
    ("Users Management", "USERS"),
    ("Orders Management", "ORDERS"),
    ("Master Data", "MASTER_DATA"),
    ("Permissions Management", "PERMISSIONS"),
];

/// What a seeding pass actually created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub grants_created: usize,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Seed built-in permissions and standard roles, and grant `Manage` of each
/// to `admin`.
pub async fn ensure_seed_data(
    store: &dyn PermissionStore,
    admin: &UserId,
) -> AuthzResult<SeedReport> {
    let mut report = SeedReport::default();

    for (name, code) in BUILTIN_PERMISSIONS {
        let permission = match store.find_permission_by_code(code).await? {
            Some(existing) => existing,
            None => {
                let permission = Permission::new(name, code);
                store.create_permission(permission.clone()).await?;
                report.permissions_created += 1;
                tracing::info!(code, "seeded permission");
                permission
            }
        };

        for role_name in roles::STANDARD {
            if store.find_role(&permission.id, role_name).await?.is_none() {
                store
                    .add_role(PermissionRole::new(permission.id.clone(), role_name))
                    .await?;
                report.roles_created += 1;
            }
        }

        // Bootstrap admin gets Manage of everything. The Manage shortcut in
        // the engine then covers the remaining roles.
        if let Some(manage) = store.find_role(&permission.id, roles::MANAGE).await? {
            if !store.has_grant(admin, &permission.id, &manage.id).await? {
                store
                    .grant(UserPermission::new(
                        admin.clone(),
                        permission.id.clone(),
                        manage.id.clone(),
                    ))
                    .await?;
                report.grants_created += 1;
                tracing::info!(code, admin = %admin, "seeded admin Manage grant");
            }
        }
    }

    Ok(report)
}
