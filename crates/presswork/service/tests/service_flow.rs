//! End-to-end service tests: bootstrap, grants, and the gated order flow.

use presswork_service::{PressworkService, ServiceError};
use presswork_storage::QueryWindow;
use presswork_types::{roles, OrderStage, OrderStatus, UserId};
use presswork_workflow::NewOrder;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("info")
        .try_init();
}

async fn bootstrapped() -> (PressworkService, UserId) {
    init_tracing();
    let service = PressworkService::new();
    let (admin, report) = service.bootstrap("admin", "Site Admin").await.unwrap();
    assert!(!report.is_noop());
    (service, admin.user_id)
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let (service, admin) = bootstrapped().await;
    let (account, report) = service.bootstrap("admin", "Site Admin").await.unwrap();
    assert_eq!(account.user_id, admin);
    assert!(report.is_noop());
}

#[tokio::test]
async fn admin_runs_full_order_lifecycle() {
    let (service, admin) = bootstrapped().await;

    let order = service
        .create_order(
            &admin,
            NewOrder::new("ORD-1001")
                .with_customer("Acme Labels")
                .with_supplier("Paper North")
                .with_product("Foil label roll"),
        )
        .await
        .unwrap();

    service
        .add_attachment(&admin, &order.id, "artwork.pdf", "blobs/ord-1001/artwork.pdf")
        .await
        .unwrap();
    service.move_to_review(&admin, &order.id).await.unwrap();
    service
        .move_to_manufacturing(&admin, &order.id, vec!["Print run".into(), "Die cut".into()])
        .await
        .unwrap();

    for item in service.items(&admin, &order.id).await.unwrap() {
        service.complete_item(&admin, &item.id).await.unwrap();
    }
    service.move_to_printing(&admin, &order.id).await.unwrap();
    let done = service.complete_printing(&admin, &order.id).await.unwrap();

    assert_eq!(done.stage, OrderStage::Printing);
    assert_eq!(done.status, OrderStatus::Completed);

    let listed = service.list_orders(&admin, QueryWindow::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    let history = service.timeline(&admin, &order.id).await.unwrap();
    assert_eq!(history.first().unwrap().action, "Order created");
    assert_eq!(history.last().unwrap().action, "Printing completed");
}

#[tokio::test]
async fn ungranted_user_is_denied() {
    let (service, admin) = bootstrapped().await;
    let worker = service.register_user("worker", "Shop Worker").unwrap();

    let err = service
        .create_order(&worker.user_id, NewOrder::new("ORD-2001"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));

    // Viewing is gated too.
    let order = service
        .create_order(&admin, NewOrder::new("ORD-2002"))
        .await
        .unwrap();
    let err = service.get_order(&worker.user_id, &order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Denied));
}

#[tokio::test]
async fn granted_roles_open_exactly_their_operations() {
    let (service, admin) = bootstrapped().await;
    let clerk = service.register_user("clerk", "Order Clerk").unwrap();

    service
        .grant_role(&admin, &clerk.user_id, "ORDERS", roles::CREATE)
        .await
        .unwrap();
    service
        .grant_role(&admin, &clerk.user_id, "ORDERS", roles::EDIT)
        .await
        .unwrap();

    let order = service
        .create_order(
            &clerk.user_id,
            NewOrder::new("ORD-3001")
                .with_customer("Acme")
                .with_supplier("Paper North")
                .with_product("Labels"),
        )
        .await
        .unwrap();
    service.move_to_review(&clerk.user_id, &order.id).await.unwrap();

    // Cancellation needs the Delete role, which the clerk lacks.
    let err = service
        .cancel_order(&clerk.user_id, &order.id, "wrong entry")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));

    service
        .grant_role(&admin, &clerk.user_id, "ORDERS", roles::DELETE)
        .await
        .unwrap();
    let cancelled = service
        .cancel_order(&clerk.user_id, &order.id, "wrong entry")
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn revocation_closes_access_again() {
    let (service, admin) = bootstrapped().await;
    let temp = service.register_user("temp", "Temp Account").unwrap();

    service
        .grant_role(&admin, &temp.user_id, "ORDERS", roles::VIEW)
        .await
        .unwrap();
    service
        .list_orders(&temp.user_id, QueryWindow::default())
        .await
        .unwrap();

    service
        .revoke_role(&admin, &temp.user_id, "ORDERS", roles::VIEW)
        .await
        .unwrap();
    let err = service
        .list_orders(&temp.user_id, QueryWindow::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));
}

#[tokio::test]
async fn non_admin_cannot_administer_grants() {
    let (service, _) = bootstrapped().await;
    let a = service.register_user("a", "User A").unwrap();
    let b = service.register_user("b", "User B").unwrap();

    let err = service
        .grant_role(&a.user_id, &b.user_id, "ORDERS", roles::VIEW)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));
}

#[tokio::test]
async fn deactivated_account_cannot_act() {
    let (service, admin) = bootstrapped().await;
    let leaver = service.register_user("leaver", "Leaving Soon").unwrap();
    service
        .grant_role(&admin, &leaver.user_id, "ORDERS", roles::CREATE)
        .await
        .unwrap();

    service.directory().deactivate(&leaver.user_id).unwrap();
    let err = service
        .create_order(&leaver.user_id, NewOrder::new("ORD-4001"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Denied));
}
