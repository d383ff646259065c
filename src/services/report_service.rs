use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, Statement,
};
use uuid::Uuid;

use crate::{
    domain::{
        OrderStatus, PaymentMethod, Role,
        revenue::{DASHBOARD_TOP_N, RevenueLedger, RevenueLine, top_n},
    },
    dto::reports::{AdminDashboard, FarmerDashboard, FarmerSalesReport, SalesReport, StatusCount},
    entity::{
        Orders, Products, Users,
        products::Column as ProdCol,
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_farmer},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct RevenueRow {
    order_id: Uuid,
    order_status: OrderStatus,
    admin_approved: bool,
    payment_method: PaymentMethod,
    delivery_charge: Decimal,
    cod_charge: Decimal,
    product_id: Uuid,
    product_name: String,
    farmer_id: Uuid,
    farmer_name: String,
    quantity: i32,
    bundle_size: i32,
    price: Decimal,
}

impl From<RevenueRow> for RevenueLine {
    fn from(row: RevenueRow) -> Self {
        Self {
            order_id: row.order_id,
            order_status: row.order_status,
            admin_approved: row.admin_approved,
            payment_method: row.payment_method,
            delivery_charge: row.delivery_charge,
            cod_charge: row.cod_charge,
            product_id: row.product_id,
            product_name: row.product_name,
            farmer_id: row.farmer_id,
            farmer_name: row.farmer_name,
            quantity: row.quantity,
            bundle_size: row.bundle_size,
            price: row.price,
        }
    }
}

/// Load the revenue-eligible items, optionally for one farmer's products.
pub async fn load_ledger(state: &AppState, farmer_id: Option<Uuid>) -> AppResult<RevenueLedger> {
    let statement = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT o.id AS order_id, o.status AS order_status, o.admin_approved,
               o.payment_method, o.delivery_charge, o.cod_charge,
               p.id AS product_id, p.name AS product_name,
               u.id AS farmer_id, u.full_name AS farmer_name,
               oi.quantity, p.bundle_size, oi.price
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN products p ON p.id = oi.product_id
        JOIN users u ON u.id = p.farmer_id
        WHERE o.status = 'delivered' AND o.admin_approved
          AND ($1::uuid IS NULL OR p.farmer_id = $1)
        ORDER BY o.created_at
        "#,
        [farmer_id.into()],
    );

    let rows = RevenueRow::find_by_statement(statement)
        .all(&state.orm)
        .await?;
    let ledger = RevenueLedger::new(rows.into_iter().map(RevenueLine::from));
    Ok(match farmer_id {
        Some(farmer_id) => ledger.for_farmer(farmer_id),
        None => ledger,
    })
}

/// Order count per status over all orders, every status listed.
async fn status_counts(state: &AppState) -> AppResult<Vec<StatusCount>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(&state.pool)
            .await?;

    Ok(OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: rows
                .iter()
                .find(|(name, _)| name == status.as_str())
                .map(|(_, count)| *count)
                .unwrap_or(0),
        })
        .collect())
}

pub async fn admin_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminDashboard>> {
    ensure_admin(user)?;

    let total_orders = Orders::find().count(&state.orm).await? as i64;
    let total_products = Products::find().count(&state.orm).await? as i64;
    let total_customers = Users::find()
        .filter(UserCol::Role.eq(Role::Customer))
        .count(&state.orm)
        .await? as i64;
    let total_farmers = Users::find()
        .filter(UserCol::Role.eq(Role::Farmer))
        .count(&state.orm)
        .await? as i64;

    let ledger = load_ledger(state, None).await?;

    let data = AdminDashboard {
        total_orders,
        total_products,
        total_customers,
        total_farmers,
        total_revenue: ledger.sales_revenue(),
        total_earnings: ledger.platform_revenue(),
        status_counts: status_counts(state).await?,
        top_products: top_n(ledger.by_product(), DASHBOARD_TOP_N),
        top_farmers: top_n(ledger.by_farmer(), DASHBOARD_TOP_N),
    };
    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}

pub async fn admin_sales(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SalesReport>> {
    ensure_admin(user)?;
    let ledger = load_ledger(state, None).await?;

    let data = SalesReport {
        total_orders: ledger.order_count() as i64,
        total_quantity: ledger.total_quantity(),
        total_earnings: ledger.platform_revenue(),
        status_counts: status_counts(state).await?,
        products: ledger.by_product(),
        farmers: ledger.by_farmer(),
    };
    Ok(ApiResponse::success("Sales report", data, Some(Meta::empty())))
}

/// Sales for the given farmer, as seen by an admin.
pub async fn farmer_sales_for_admin(
    state: &AppState,
    user: &AuthUser,
    farmer_id: Uuid,
) -> AppResult<ApiResponse<FarmerSalesReport>> {
    ensure_admin(user)?;
    let farmer = Users::find_by_id(farmer_id)
        .one(&state.orm)
        .await?
        .filter(|u| u.role == Role::Farmer)
        .ok_or(AppError::NotFound)?;
    let report = farmer_report(state, farmer.id).await?;
    Ok(ApiResponse::success("Farmer sales", report, Some(Meta::empty())))
}

pub async fn farmer_sales(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FarmerSalesReport>> {
    ensure_farmer(user)?;
    let report = farmer_report(state, user.user_id).await?;
    Ok(ApiResponse::success("Sales report", report, Some(Meta::empty())))
}

async fn farmer_report(state: &AppState, farmer_id: Uuid) -> AppResult<FarmerSalesReport> {
    let ledger = load_ledger(state, Some(farmer_id)).await?;
    Ok(FarmerSalesReport {
        farmer_id,
        total_orders: ledger.order_count() as i64,
        total_quantity: ledger.total_quantity(),
        // Farmers earn item revenue only; surcharges stay with the platform.
        total_earnings: ledger.sales_revenue(),
        products: ledger.by_product(),
    })
}

pub async fn farmer_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FarmerDashboard>> {
    ensure_farmer(user)?;
    let farmer_id = user.user_id;

    let product_count = Products::find()
        .filter(ProdCol::FarmerId.eq(farmer_id))
        .count(&state.orm)
        .await? as i64;

    let (order_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT oi.order_id)
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE p.farmer_id = $1
        "#,
    )
    .bind(farmer_id)
    .fetch_one(&state.pool)
    .await?;

    let (average_rating, review_count): (Option<Decimal>, i64) = sqlx::query_as(
        r#"
        SELECT ROUND(AVG(r.rating)::numeric, 2), COUNT(r.id)
        FROM reviews r
        JOIN products p ON p.id = r.product_id
        WHERE p.farmer_id = $1
        "#,
    )
    .bind(farmer_id)
    .fetch_one(&state.pool)
    .await?;

    let (unread_notifications,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
    )
    .bind(farmer_id)
    .fetch_one(&state.pool)
    .await?;

    let ledger = load_ledger(state, Some(farmer_id)).await?;

    let data = FarmerDashboard {
        product_count,
        order_count,
        total_sales: ledger.sales_revenue(),
        top_products: top_n(ledger.by_product(), DASHBOARD_TOP_N),
        average_rating,
        review_count,
        unread_notifications,
    };
    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}
