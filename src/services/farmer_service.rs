use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    domain::OrderStatus,
    dto::orders::{FarmerOrderDetail, OrderList, UpdateOrderStatusRequest},
    entity::{
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_farmer},
    models::Order,
    notify::{Notice, admin_ids, dispatch},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::order_line,
    state::AppState,
};

/// Orders that contain at least one of the farmer's products.
pub async fn list_farmer_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_farmer(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(ProdCol::FarmerId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(condition)
        .distinct();
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_farmer_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<FarmerOrderDetail>> {
    ensure_farmer(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let detail = farmer_slice(&state.orm, user.user_id, order).await?;
    Ok(ApiResponse::success("Order found", detail, Some(Meta::empty())))
}

/// A farmer's status request for their own items.
///
/// Own items move when the transition table allows it; other farmers' items
/// and the authoritative order status are never touched. Any applied request
/// records `farmer_status` and reopens the admin approval gate.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<FarmerOrderDetail>> {
    ensure_farmer(user)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let own_items = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(ProdCol::FarmerId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if own_items.is_empty() {
        return Err(AppError::Forbidden);
    }

    let Some(requested) = OrderStatus::parse_requested(&payload.status) else {
        txn.rollback().await?;
        tracing::warn!(order_id = %id, requested = %payload.status, "unknown status ignored");
        let detail = farmer_slice(&state.orm, user.user_id, order).await?;
        return Ok(ApiResponse::success("Order unchanged", detail, Some(Meta::empty()))
            .with_warning(format!("Unknown status '{}' ignored.", payload.status)));
    };

    let movable: Vec<Uuid> = own_items
        .iter()
        .filter(|item| item.status.can_transition_to(requested))
        .map(|item| item.id)
        .collect();
    if movable.is_empty() {
        txn.rollback().await?;
        tracing::warn!(order_id = %id, to = %requested, "farmer status request ignored");
        let detail = farmer_slice(&state.orm, user.user_id, order).await?;
        return Ok(ApiResponse::success("Order unchanged", detail, Some(Meta::empty()))
            .with_warning(format!("Your items cannot move to {requested}.")));
    }
    let skipped = own_items.len() - movable.len();

    OrderItems::update_many()
        .col_expr(OrderItemCol::Status, Expr::value(requested))
        .filter(OrderItemCol::Id.is_in(movable.clone()))
        .exec(&txn)
        .await?;

    let mut active: OrderActive = order.into();
    active.farmer_status = Set(requested);
    active.admin_approved = Set(false);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        farmer_id = %user.user_id,
        to = %requested,
        items = movable.len(),
        "farmer requested status"
    );

    match admin_ids(&state.pool).await {
        Ok(admins) => {
            let notices: Vec<Notice> = admins
                .into_iter()
                .map(|admin_id| {
                    Notice::new(
                        admin_id,
                        format!(
                            "A farmer requested status {} for order {}.",
                            requested.label(),
                            order.invoice_number
                        ),
                    )
                    .with_link(format!("/admin/orders/{}", order.id))
                })
                .collect();
            dispatch(&state.pool, &notices).await;
        }
        Err(err) => tracing::warn!(error = %err, "admin lookup for notification failed"),
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "farmer_status_request",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "status": requested,
            "items": movable,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = farmer_slice(&state.orm, user.user_id, order).await?;
    let response = ApiResponse::success("Status requested", detail, Some(Meta::empty()));
    Ok(if skipped > 0 {
        response.with_warning(format!(
            "{skipped} of your items could not move to {requested} and were left unchanged."
        ))
    } else {
        response
    })
}

/// The farmer's items in `order` with their subtotal. Delivery and COD
/// charges are copied for display only.
pub async fn farmer_slice<C>(
    conn: &C,
    farmer_id: Uuid,
    order: OrderModel,
) -> AppResult<FarmerOrderDetail>
where
    C: ConnectionTrait,
{
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .find_also_related(Products)
        .filter(ProdCol::FarmerId.eq(farmer_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;

    let items: Vec<_> = rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|product| order_line(item, &product)))
        .collect();
    if items.is_empty() {
        return Err(AppError::Forbidden);
    }

    let farmer_subtotal: Decimal = items.iter().map(|line| line.subtotal).sum();
    Ok(FarmerOrderDetail {
        farmer_total: farmer_subtotal + order.delivery_charge + order.cod_charge,
        delivery_charge: order.delivery_charge,
        cod_charge: order.cod_charge,
        farmer_subtotal,
        items,
        order: order.into(),
    })
}
