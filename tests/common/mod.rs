#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use farm_market_api::{
    db::{create_pool, run_migrations},
    domain::{ChargePolicy, PaymentMethod, Role},
    dto::{
        addresses::CreateAddressRequest,
        cart::AddToCartRequest,
        orders::{PlaceOrderRequest, PlaceOrderResponse},
    },
    entity::{products, users},
    middleware::auth::AuthUser,
    payment::{PaymentError, PaymentGateway, PaymentIntent},
    services::{address_service, cart_service, order_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Gateway that hands out sequential references without any network call.
pub struct StubGateway {
    issued: AtomicU64,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            reference: format!("order_test_{n}"),
            amount_minor,
            currency: currency.to_string(),
        })
    }

    fn currency(&self) -> &str {
        "INR"
    }
}

/// Gateway that is always down.
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_payment_intent(
        &self,
        _amount_minor: i64,
        _currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::Rejected {
            status: 503,
            body: "gateway unavailable".into(),
        })
    }

    fn currency(&self) -> &str {
        "INR"
    }
}

/// Connect and migrate, or `None` when no database is configured so the
/// calling test can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    setup_state_with(Arc::new(StubGateway {
        issued: AtomicU64::new(1),
    }))
    .await
}

pub async fn setup_state_with(gateway: Arc<dyn PaymentGateway>) -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, ChargePolicy::default(), gateway)))
}

/// Insert a user with a unique email. Rows are never truncated, so tests
/// scope their assertions to the users and products they create.
pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    users::ActiveModel {
        id: Set(id),
        email: Set(format!("{}-{}@example.test", role, id.simple())),
        full_name: Set(format!("{role} {}", &id.simple().to_string()[..6])),
        phone: Set(Some("9000000000".into())),
        role: Set(role),
        default_address_id: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser { user_id: id, role })
}

/// A customer with a default delivery address.
pub async fn create_customer(state: &AppState) -> anyhow::Result<AuthUser> {
    let customer = create_user(state, Role::Customer).await?;
    address_service::create_address(
        state,
        &customer,
        CreateAddressRequest {
            address_line: "12 Market Road".into(),
            state: "Karnataka".into(),
            district: "Mysuru".into(),
            pincode: "570001".into(),
            make_default: true,
        },
    )
    .await?;
    Ok(customer)
}

pub async fn create_product(
    state: &AppState,
    farmer: &AuthUser,
    price: Decimal,
    stock: i32,
    bundle_size: i32,
) -> anyhow::Result<products::Model> {
    let id = Uuid::new_v4();
    let product = products::ActiveModel {
        id: Set(id),
        farmer_id: Set(farmer.user_id),
        name: Set(format!("produce-{}", id.simple())),
        category: Set("vegetables".into()),
        description: Set(None),
        price: Set(price),
        discount_percent: Set(None),
        stock: Set(stock),
        bundle_size: Set(bundle_size),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

/// Add `bundles` bundles of the product to the customer's cart.
pub async fn add_bundles(
    state: &AppState,
    customer: &AuthUser,
    product_id: Uuid,
    bundles: usize,
) -> anyhow::Result<()> {
    for _ in 0..bundles {
        cart_service::add_to_cart(state, customer, AddToCartRequest { product_id }).await?;
    }
    Ok(())
}

pub async fn unread_messages(state: &AppState, user_id: Uuid) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT message FROM notifications WHERE user_id = $1 AND NOT is_read ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(rows.into_iter().map(|(message,)| message).collect())
}

/// Check out the customer's cart as cash on delivery.
pub async fn place_cod_order(
    state: &AppState,
    customer: &AuthUser,
) -> anyhow::Result<PlaceOrderResponse> {
    let resp = order_service::place_order(
        state,
        customer,
        PlaceOrderRequest {
            full_name: None,
            phone: None,
            email: None,
            address: None,
            payment_method: PaymentMethod::Cod,
        },
    )
    .await?;
    resp.data
        .ok_or_else(|| anyhow::anyhow!("placement returned no data"))
}
