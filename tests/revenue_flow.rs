mod common;

use farm_market_api::{
    domain::{OrderStatus, Role},
    dto::orders::{
        ItemStatusUpdate, PlaceOrderResponse, UpdateItemStatusesRequest, UpdateOrderStatusRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{admin_service, farmer_service, report_service},
    state::AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::{
    add_bundles, create_customer, create_product, create_user, place_cod_order, setup_state,
};

/// Mark every item delivered, which approves the derived `delivered` status.
async fn deliver(
    state: &AppState,
    admin: &AuthUser,
    placed: &PlaceOrderResponse,
) -> anyhow::Result<()> {
    let items = placed
        .items
        .iter()
        .map(|line| ItemStatusUpdate {
            item_id: line.id,
            status: "delivered".into(),
        })
        .collect();
    let resp = admin_service::admin_update_item_statuses(
        state,
        admin,
        placed.order.id,
        UpdateItemStatusesRequest { items },
    )
    .await?;
    let order = resp.data.expect("order with items").order;
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.admin_approved);
    Ok(())
}

#[tokio::test]
async fn only_delivered_and_approved_orders_earn_revenue() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let other_farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let tomatoes = create_product(&state, &farmer, dec!(100), 50, 1).await?;
    let saffron = create_product(&state, &other_farmer, dec!(400), 5, 1).await?;

    // Delivered and approved: 2 x 100, plus 50 delivery and 50 COD.
    add_bundles(&state, &customer, tomatoes.id, 2).await?;
    let counted = place_cod_order(&state, &customer).await?;
    deliver(&state, &admin, &counted).await?;

    // Delivered, then reopened by a farmer request: not approved.
    add_bundles(&state, &customer, tomatoes.id, 1).await?;
    let reopened = place_cod_order(&state, &customer).await?;
    admin_service::admin_update_order_status(
        &state,
        &admin,
        reopened.order.id,
        UpdateOrderStatusRequest {
            status: "delivered".into(),
        },
    )
    .await?;
    let detail = farmer_service::update_order_status(
        &state,
        &farmer,
        reopened.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?
    .data
    .expect("farmer detail");
    assert_eq!(detail.order.status, OrderStatus::Delivered);
    assert!(!detail.order.admin_approved);

    // Still pending.
    add_bundles(&state, &customer, tomatoes.id, 3).await?;
    place_cod_order(&state, &customer).await?;

    // Another farmer's delivered order: 400, free delivery, 50 COD.
    add_bundles(&state, &customer, saffron.id, 1).await?;
    let elsewhere = place_cod_order(&state, &customer).await?;
    deliver(&state, &admin, &elsewhere).await?;

    let report = report_service::farmer_sales(&state, &farmer)
        .await?
        .data
        .expect("farmer report");
    assert_eq!(report.farmer_id, farmer.user_id);
    assert_eq!(report.total_orders, 1);
    assert_eq!(report.total_quantity, 2);
    // Surcharges stay with the platform.
    assert_eq!(report.total_earnings, dec!(200));
    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].name, tomatoes.name);
    assert_eq!(report.products[0].revenue, dec!(200));

    let other = report_service::farmer_sales(&state, &other_farmer)
        .await?
        .data
        .expect("farmer report");
    assert_eq!(other.total_earnings, dec!(400));

    let dashboard = report_service::farmer_dashboard(&state, &farmer)
        .await?
        .data
        .expect("farmer dashboard");
    assert_eq!(dashboard.product_count, 1);
    assert_eq!(dashboard.order_count, 3);
    assert_eq!(dashboard.total_sales, dec!(200));
    assert!(dashboard.average_rating.is_none());
    assert_eq!(dashboard.review_count, 0);

    // Admin view covers every farmer; both of ours are in it.
    let sales = report_service::admin_sales(&state, &admin)
        .await?
        .data
        .expect("sales report");
    let revenue_of = |farmer_id| {
        sales
            .farmers
            .iter()
            .find(|row| row.farmer_id == farmer_id)
            .map(|row| row.revenue)
    };
    assert_eq!(revenue_of(farmer.user_id), Some(dec!(200)));
    assert_eq!(revenue_of(other_farmer.user_id), Some(dec!(400)));
    let tomato_row = sales
        .products
        .iter()
        .find(|row| row.name == tomatoes.name)
        .expect("tomato row");
    assert_eq!(tomato_row.quantity, 2);
    assert!(sales.total_earnings >= dec!(750));
    assert_eq!(sales.status_counts.len(), OrderStatus::ALL.len());

    let dashboard = report_service::admin_dashboard(&state, &admin)
        .await?
        .data
        .expect("admin dashboard");
    assert!(dashboard.total_earnings >= dashboard.total_revenue);
    assert!(dashboard.total_revenue >= dec!(600));
    assert!(dashboard.total_orders >= 4);

    Ok(())
}

#[tokio::test]
async fn admin_farmer_report_requires_a_farmer() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, Role::Admin).await?;
    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;

    let report = report_service::farmer_sales_for_admin(&state, &admin, farmer.user_id)
        .await?
        .data
        .expect("farmer report");
    assert_eq!(report.total_orders, 0);
    assert_eq!(report.total_earnings, Decimal::ZERO);
    assert!(report.products.is_empty());

    let not_a_farmer =
        report_service::farmer_sales_for_admin(&state, &admin, customer.user_id).await;
    assert!(matches!(not_a_farmer, Err(AppError::NotFound)));

    let as_farmer = report_service::admin_sales(&state, &farmer).await;
    assert!(matches!(as_farmer, Err(AppError::Forbidden)));

    Ok(())
}
