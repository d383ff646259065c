mod common;

use std::sync::Arc;

use farm_market_api::{
    domain::{OrderStatus, PaymentMethod, Role},
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{NextStep, PlaceOrderRequest},
        products::UpdateProductRequest,
    },
    entity::Products,
    error::AppError,
    middleware::auth::AuthUser,
    services::{cart_service, order_service, product_service},
    state::AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

use common::{
    FailingGateway, add_bundles, create_customer, create_product, create_user, setup_state,
    setup_state_with, unread_messages,
};

fn order_request(payment_method: PaymentMethod) -> PlaceOrderRequest {
    PlaceOrderRequest {
        full_name: None,
        phone: None,
        email: None,
        address: None,
        payment_method,
    }
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(product.stock)
}

async fn cart_len(state: &AppState, customer: &AuthUser) -> anyhow::Result<usize> {
    let cart = cart_service::get_cart(state, customer).await?;
    Ok(cart.data.map(|c| c.items.len()).unwrap_or_default())
}

#[tokio::test]
async fn cod_order_snapshots_prices_decrements_stock_and_notifies_once_per_farmer()
-> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let apples = create_product(&state, &farmer, dec!(100), 20, 5).await?;
    let beans = create_product(&state, &farmer, dec!(50), 10, 2).await?;

    // 10 apples at 100 per 5 = 200, 2 beans at 50 per 2 = 50.
    add_bundles(&state, &customer, apples.id, 2).await?;
    add_bundles(&state, &customer, beans.id, 1).await?;

    let placed = order_service::place_order(&state, &customer, order_request(PaymentMethod::Cod))
        .await?
        .data
        .expect("placement data");

    assert_eq!(placed.charges.subtotal, dec!(250));
    assert_eq!(placed.charges.delivery_charge, dec!(50));
    assert_eq!(placed.charges.cod_charge, dec!(50));
    assert_eq!(placed.order.total_amount, dec!(350));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.farmer_status, OrderStatus::Pending);
    assert!(!placed.order.admin_approved);
    assert_eq!(placed.next_step, NextStep::Success);
    assert!(placed.payment.is_none());
    assert!(placed.order.address.contains("Mysuru"));

    assert_eq!(placed.items.len(), 2);
    let apple_line = placed
        .items
        .iter()
        .find(|line| line.product_id == apples.id)
        .expect("apple line");
    assert_eq!(apple_line.quantity, 10);
    assert_eq!(apple_line.price, dec!(100));
    assert_eq!(apple_line.subtotal, dec!(200));

    assert_eq!(stock_of(&state, apples.id).await?, 10);
    assert_eq!(stock_of(&state, beans.id).await?, 8);
    assert_eq!(cart_len(&state, &customer).await?, 0);

    let farmer_messages = unread_messages(&state, farmer.user_id).await?;
    assert_eq!(farmer_messages.len(), 1, "one notice per farmer, not per item");
    assert!(farmer_messages[0].contains(&placed.order.invoice_number));

    let customer_messages = unread_messages(&state, customer.user_id).await?;
    assert_eq!(customer_messages.len(), 1);
    assert!(customer_messages[0].contains("has been placed"));

    Ok(())
}

#[tokio::test]
async fn discounted_line_keeps_the_exact_unit_price_and_rounds_the_subtotal()
-> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let figs = create_product(&state, &farmer, dec!(9.99), 20, 1).await?;
    product_service::update_product(
        &state,
        &farmer,
        figs.id,
        UpdateProductRequest {
            discount_percent: Some(33),
            ..Default::default()
        },
    )
    .await?;
    add_bundles(&state, &customer, figs.id, 10).await?;

    let placed = order_service::place_order(&state, &customer, order_request(PaymentMethod::Cod))
        .await?
        .data
        .expect("placement data");

    // 10 x 6.6933 = 66.933, not 10 x 6.69.
    assert_eq!(placed.charges.subtotal, dec!(66.93));
    assert_eq!(placed.items[0].price, dec!(6.6933));
    assert_eq!(placed.items[0].subtotal, dec!(66.93));

    let detail = order_service::get_order(&state, &customer, placed.order.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(detail.items[0].price, dec!(6.6933));

    Ok(())
}

#[tokio::test]
async fn online_order_at_threshold_ships_free_and_stores_payment_reference() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let melons = create_product(&state, &farmer, dec!(150), 5, 1).await?;
    add_bundles(&state, &customer, melons.id, 2).await?;

    let placed = order_service::place_order(&state, &customer, order_request(PaymentMethod::Online))
        .await?
        .data
        .expect("placement data");

    assert_eq!(placed.charges.subtotal, dec!(300));
    assert_eq!(placed.charges.delivery_charge, Decimal::ZERO);
    assert_eq!(placed.charges.cod_charge, Decimal::ZERO);
    assert_eq!(placed.order.total_amount, dec!(300));
    assert_eq!(placed.next_step, NextStep::Payment);

    let intent = placed.payment.expect("payment intent");
    assert_eq!(intent.amount_minor, 30_000);
    assert_eq!(intent.currency, "INR");
    assert_eq!(placed.order.payment_reference.as_deref(), Some(intent.reference.as_str()));

    Ok(())
}

#[tokio::test]
async fn gateway_failure_keeps_the_order_pending_without_reference() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(Arc::new(FailingGateway)).await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let carrots = create_product(&state, &farmer, dec!(40), 50, 10).await?;
    add_bundles(&state, &customer, carrots.id, 1).await?;

    let resp =
        order_service::place_order(&state, &customer, order_request(PaymentMethod::Online)).await?;
    assert!(resp.warning.is_some());

    let placed = resp.data.expect("placement data");
    assert!(placed.payment.is_none());
    assert!(placed.order.payment_reference.is_none());
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(stock_of(&state, carrots.id).await?, 40);

    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_placed() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let customer = create_customer(&state).await?;
    let result =
        order_service::place_order(&state, &customer, order_request(PaymentMethod::Cod)).await;
    assert!(matches!(result, Err(AppError::EmptyCart)));

    Ok(())
}

#[tokio::test]
async fn cart_adds_whole_bundles_and_clamps_only_on_update() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let customer = create_customer(&state).await?;
    let sold_out = create_product(&state, &farmer, dec!(10), 0, 1).await?;
    let mangoes = create_product(&state, &farmer, dec!(100), 7, 5).await?;

    let result = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: sold_out.id,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::OutOfStock(_))));

    let first = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: mangoes.id,
        },
    )
    .await?;
    let cart = first.data.expect("cart");
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.total, dec!(100));

    // 5 + 5 exceeds the 7 in stock: unchanged, with a warning.
    let second = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: mangoes.id,
        },
    )
    .await?;
    assert_eq!(second.warning.as_deref(), Some("Only 7 items available."));
    let cart = second.data.expect("cart");
    assert_eq!(cart.items[0].quantity, 5);
    let item_id = cart.items[0].id;

    let clamped = cart_service::update_quantity(
        &state,
        &customer,
        item_id,
        UpdateCartItemRequest { quantity: 9 },
    )
    .await?;
    assert!(clamped.warning.is_some());
    assert_eq!(clamped.data.expect("cart").items[0].quantity, 7);

    let exact = cart_service::update_quantity(
        &state,
        &customer,
        item_id,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?;
    assert!(exact.warning.is_none());
    let cart = exact.data.expect("cart");
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total, dec!(60));

    let removed = cart_service::update_quantity(
        &state,
        &customer,
        item_id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    let cart = removed.data.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, Decimal::ZERO);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_orders_for_the_last_units_cannot_both_succeed() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let farmer = create_user(&state, Role::Farmer).await?;
    let first = create_customer(&state).await?;
    let second = create_customer(&state).await?;
    let honey = create_product(&state, &farmer, dec!(80), 3, 2).await?;

    add_bundles(&state, &first, honey.id, 1).await?;
    add_bundles(&state, &second, honey.id, 1).await?;

    let (a, b) = tokio::join!(
        order_service::place_order(&state, &first, order_request(PaymentMethod::Cod)),
        order_service::place_order(&state, &second, order_request(PaymentMethod::Cod)),
    );

    let outcomes = [&a, &b];
    let placed = outcomes.iter().filter(|r| r.is_ok()).count();
    let refused = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::OutOfStock(_))))
        .count();
    assert_eq!(placed, 1, "exactly one order may take the stock");
    assert_eq!(refused, 1);

    assert_eq!(stock_of(&state, honey.id).await?, 1);

    // The refused customer's cart is rolled back intact.
    let loser = if a.is_ok() { &second } else { &first };
    assert_eq!(cart_len(&state, loser).await?, 1);

    Ok(())
}
