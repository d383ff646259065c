mod common;

use farm_market_api::{
    domain::{OrderStatus, Role},
    dto::orders::{ItemStatusUpdate, UpdateItemStatusesRequest, UpdateOrderStatusRequest},
    error::AppError,
    services::{admin_service, farmer_service},
};
use rust_decimal_macros::dec;

use common::{
    add_bundles, create_customer, create_product, create_user, place_cod_order, setup_state,
    unread_messages,
};

fn status(value: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: value.to_string(),
    }
}

#[tokio::test]
async fn farmer_request_reopens_approval_without_touching_order_status() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let spinach = create_product(&state, &farmer, dec!(30), 10, 1).await?;
    add_bundles(&state, &customer, spinach.id, 2).await?;
    let placed = place_cod_order(&state, &customer).await?;
    let order_id = placed.order.id;

    let approved =
        admin_service::admin_update_order_status(&state, &admin, order_id, status("processing"))
            .await?;
    assert!(approved.warning.is_none());
    let order = approved.data.expect("order");
    assert_eq!(order.status, OrderStatus::Processing);
    assert!(order.admin_approved);

    let customer_messages = unread_messages(&state, customer.user_id).await?;
    assert!(customer_messages.iter().any(|m| m.contains("is now Processing")));

    let requested =
        farmer_service::update_order_status(&state, &farmer, order_id, status("shipped")).await?;
    assert!(requested.warning.is_none());
    let detail = requested.data.expect("farmer detail");
    assert_eq!(detail.order.status, OrderStatus::Processing);
    assert_eq!(detail.order.farmer_status, OrderStatus::Shipped);
    assert!(!detail.order.admin_approved);
    assert!(detail.items.iter().all(|line| line.status == OrderStatus::Shipped));

    let admin_messages = unread_messages(&state, admin.user_id).await?;
    assert!(
        admin_messages
            .iter()
            .any(|m| m.contains(&placed.order.invoice_number))
    );

    // Going back is refused and nothing changes.
    let backward =
        farmer_service::update_order_status(&state, &farmer, order_id, status("processing"))
            .await?;
    assert_eq!(
        backward.warning.as_deref(),
        Some("Your items cannot move to processing.")
    );
    let detail = backward.data.expect("farmer detail");
    assert_eq!(detail.order.farmer_status, OrderStatus::Shipped);

    Ok(())
}

#[tokio::test]
async fn farmer_without_items_in_the_order_is_forbidden() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let stranger = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let okra = create_product(&state, &farmer, dec!(60), 10, 1).await?;
    add_bundles(&state, &customer, okra.id, 1).await?;
    let placed = place_cod_order(&state, &customer).await?;

    let result =
        farmer_service::update_order_status(&state, &stranger, placed.order.id, status("shipped"))
            .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    let view = farmer_service::get_farmer_order(&state, &stranger, placed.order.id).await;
    assert!(matches!(view, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn admin_item_edits_derive_the_order_status() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let first_farmer = create_user(&state, Role::Farmer).await?;
    let second_farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let rice = create_product(&state, &first_farmer, dec!(120), 20, 1).await?;
    let dal = create_product(&state, &second_farmer, dec!(90), 20, 1).await?;

    add_bundles(&state, &customer, rice.id, 1).await?;
    add_bundles(&state, &customer, dal.id, 1).await?;
    let split = place_cod_order(&state, &customer).await?;
    let item_of = |product_id| {
        split
            .items
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.id)
            .expect("line for product")
    };

    let resp = admin_service::admin_update_item_statuses(
        &state,
        &admin,
        split.order.id,
        UpdateItemStatusesRequest {
            items: vec![
                ItemStatusUpdate {
                    item_id: item_of(rice.id),
                    status: "delivered".into(),
                },
                ItemStatusUpdate {
                    item_id: item_of(dal.id),
                    status: "cancelled".into(),
                },
            ],
        },
    )
    .await?;
    assert!(resp.warning.is_none());
    let data = resp.data.expect("order with items");
    // One line cancelled never cancels or completes the whole order.
    assert_eq!(data.order.status, OrderStatus::Processing);
    assert!(data.order.admin_approved);

    for farmer in [&first_farmer, &second_farmer] {
        let messages = unread_messages(&state, farmer.user_id).await?;
        assert!(
            messages
                .iter()
                .any(|m| m.starts_with("Admin has finalized the status of order"))
        );
    }

    add_bundles(&state, &customer, rice.id, 1).await?;
    add_bundles(&state, &customer, dal.id, 1).await?;
    let complete = place_cod_order(&state, &customer).await?;
    let updates = complete
        .items
        .iter()
        .map(|line| ItemStatusUpdate {
            item_id: line.id,
            status: "delivered".into(),
        })
        .collect();
    let resp = admin_service::admin_update_item_statuses(
        &state,
        &admin,
        complete.order.id,
        UpdateItemStatusesRequest { items: updates },
    )
    .await?;
    let data = resp.data.expect("order with items");
    assert_eq!(data.order.status, OrderStatus::Delivered);
    assert!(data.order.admin_approved);

    // A finished order ignores further item edits.
    let resp = admin_service::admin_update_item_statuses(
        &state,
        &admin,
        complete.order.id,
        UpdateItemStatusesRequest {
            items: vec![ItemStatusUpdate {
                item_id: complete.items[0].id,
                status: "cancelled".into(),
            }],
        },
    )
    .await?;
    assert!(resp.warning.is_some());
    assert_eq!(
        resp.data.expect("order with items").order.status,
        OrderStatus::Delivered
    );

    Ok(())
}

#[tokio::test]
async fn item_outside_the_order_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let garlic = create_product(&state, &farmer, dec!(25), 10, 1).await?;
    add_bundles(&state, &customer, garlic.id, 1).await?;
    let first = place_cod_order(&state, &customer).await?;
    add_bundles(&state, &customer, garlic.id, 1).await?;
    let second = place_cod_order(&state, &customer).await?;

    let result = admin_service::admin_update_item_statuses(
        &state,
        &admin,
        first.order.id,
        UpdateItemStatusesRequest {
            items: vec![ItemStatusUpdate {
                item_id: second.items[0].id,
                status: "shipped".into(),
            }],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn invalid_admin_writes_are_ignored_with_a_warning() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let ginger = create_product(&state, &farmer, dec!(45), 10, 1).await?;
    add_bundles(&state, &customer, ginger.id, 1).await?;
    let placed = place_cod_order(&state, &customer).await?;
    let order_id = placed.order.id;

    let unknown =
        admin_service::admin_update_order_status(&state, &admin, order_id, status("archived"))
            .await?;
    assert_eq!(
        unknown.warning.as_deref(),
        Some("Unknown status 'archived' ignored.")
    );
    let order = unknown.data.expect("order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(!order.admin_approved);

    admin_service::admin_update_order_status(&state, &admin, order_id, status("delivered"))
        .await?;

    let backward =
        admin_service::admin_update_order_status(&state, &admin, order_id, status("processing"))
            .await?;
    assert_eq!(
        backward.warning.as_deref(),
        Some("Cannot move order from delivered to processing.")
    );
    assert_eq!(
        backward.data.expect("order").status,
        OrderStatus::Delivered
    );

    let cancel = admin_service::admin_cancel_order(&state, &admin, order_id).await?;
    assert_eq!(
        cancel.warning.as_deref(),
        Some("A delivered order cannot be cancelled.")
    );
    assert_eq!(cancel.data.expect("order").status, OrderStatus::Delivered);

    Ok(())
}

#[tokio::test]
async fn admin_can_cancel_an_open_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let peas = create_product(&state, &farmer, dec!(35), 10, 1).await?;
    add_bundles(&state, &customer, peas.id, 1).await?;
    let placed = place_cod_order(&state, &customer).await?;

    let resp = admin_service::admin_cancel_order(&state, &admin, placed.order.id).await?;
    assert!(resp.warning.is_none());
    let order = resp.data.expect("order");
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.admin_approved);

    let messages = unread_messages(&state, customer.user_id).await?;
    assert!(messages.iter().any(|m| m.contains("has been cancelled")));

    let customer_role = admin_service::admin_cancel_order(&state, &customer, placed.order.id).await;
    assert!(matches!(customer_role, Err(AppError::Forbidden)));

    Ok(())
}
