use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{FarmerOrderDetail, OrderList, UpdateOrderStatusRequest},
        reports::{FarmerDashboard, FarmerSalesReport},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{farmer_service, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_farmer_orders))
        .route("/orders/{id}", get(get_farmer_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/sales", get(farmer_sales))
        .route("/dashboard", get(farmer_dashboard))
}

#[utoipa::path(
    get,
    path = "/api/farmer/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders containing the farmer's products", body = ApiResponse<OrderList>),
        (status = 403, description = "Farmers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Farmer"
)]
pub async fn list_farmer_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = farmer_service::list_farmer_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/farmer/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "The farmer's slice of the order", body = ApiResponse<FarmerOrderDetail>),
        (status = 403, description = "No items of this farmer in the order"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Farmer"
)]
pub async fn get_farmer_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FarmerOrderDetail>>> {
    let resp = farmer_service::get_farmer_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/farmer/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Request recorded for admin review, or ignored with a warning", body = ApiResponse<FarmerOrderDetail>),
        (status = 403, description = "No items of this farmer in the order"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Farmer"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<FarmerOrderDetail>>> {
    let resp = farmer_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/farmer/sales",
    responses(
        (status = 200, description = "Own product sales from delivered, approved orders", body = ApiResponse<FarmerSalesReport>),
        (status = 403, description = "Farmers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Farmer"
)]
pub async fn farmer_sales(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FarmerSalesReport>>> {
    let resp = report_service::farmer_sales(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/farmer/dashboard",
    responses(
        (status = 200, description = "Farmer dashboard", body = ApiResponse<FarmerDashboard>),
        (status = 403, description = "Farmers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Farmer"
)]
pub async fn farmer_dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FarmerDashboard>>> {
    let resp = report_service::farmer_dashboard(&state, &user).await?;
    Ok(Json(resp))
}
