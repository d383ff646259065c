use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit::{count_activity, log_audit, recent_activity},
    domain::{OrderStatus, status::derive_aggregate_status},
    dto::{
        orders::{OrderList, OrderWithItems, UpdateItemStatusesRequest, UpdateOrderStatusRequest},
        reports::ActivityList,
    },
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    notify::{Notice, dispatch},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_service::load_order_lines,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);

    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = load_order_lines(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Order found",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Set the authoritative order status. Any accepted write, including
/// re-affirming the current status, approves the order.
pub async fn admin_update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = lock_order(&txn, id).await?;

    let Some(next) = OrderStatus::parse_requested(&payload.status) else {
        txn.rollback().await?;
        tracing::warn!(order_id = %id, requested = %payload.status, "unknown status ignored");
        return Ok(unchanged(existing, format!("Unknown status '{}' ignored.", payload.status)));
    };

    if !existing.status.can_transition_to(next) {
        txn.rollback().await?;
        tracing::warn!(
            order_id = %id,
            from = %existing.status,
            to = %next,
            "status transition ignored"
        );
        return Ok(unchanged(
            existing.clone(),
            format!("Cannot move order from {} to {}.", existing.status, next),
        ));
    }

    let previous = existing.status;
    let mut active: OrderActive = existing.into();
    active.status = Set(next);
    active.admin_approved = Set(true);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %next, "order status approved");

    dispatch(
        &state.pool,
        &[Notice::new(
            order.user_id,
            format!("Your order {} is now {}.", order.invoice_number, next.label()),
        )
        .with_link(format!("/orders/{}", order.id))],
    )
    .await;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "from": previous, "to": next })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Edit item statuses one by one and derive the order status from them.
///
/// Item writes follow the transition table; disallowed or unknown values are
/// skipped with a warning. The derived status is then written and approved.
pub async fn admin_update_item_statuses(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateItemStatusesRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;

    if order.status.is_terminal() {
        txn.rollback().await?;
        let items = load_order_lines(&state.orm, order.id).await?;
        let message = format!("Order is already {}; item changes ignored.", order.status);
        return Ok(ApiResponse::success(
            "Order unchanged",
            OrderWithItems {
                order: order.into(),
                items,
            },
            Some(Meta::empty()),
        )
        .with_warning(message));
    }

    let mut items: HashMap<Uuid, _> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let mut skipped = Vec::new();
    let mut changed = Vec::new();
    for update in &payload.items {
        let Some(item) = items.get_mut(&update.item_id) else {
            return Err(AppError::BadRequest(format!(
                "item {} is not part of this order",
                update.item_id
            )));
        };
        let Some(next) = OrderStatus::parse_requested(&update.status) else {
            skipped.push(format!("unknown status '{}'", update.status));
            continue;
        };
        if !item.status.can_transition_to(next) {
            skipped.push(format!("item {} cannot move from {} to {}", item.id, item.status, next));
            continue;
        }
        if item.status == next {
            continue;
        }

        let mut active: OrderItemActive = item.clone().into();
        active.status = Set(next);
        *item = active.update(&txn).await?;
        changed.push((item.id, next));
    }

    let derived = derive_aggregate_status(items.values().map(|item| item.status));
    let previous = order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(derived);
    active.admin_approved = Set(true);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        from = %previous,
        to = %derived,
        changed = changed.len(),
        "order status derived from items"
    );

    let lines = load_order_lines(&state.orm, order.id).await?;
    if !changed.is_empty() {
        let names: HashMap<Uuid, &str> = lines
            .iter()
            .map(|line| (line.id, line.product_name.as_str()))
            .collect();
        let mut notices: Vec<Notice> = changed
            .iter()
            .map(|(item_id, status)| {
                let name = names.get(item_id).copied().unwrap_or("An item");
                Notice::new(
                    order.user_id,
                    format!(
                        "{} in your order {} is now {}.",
                        name,
                        order.invoice_number,
                        status.label()
                    ),
                )
                .with_link(format!("/orders/{}", order.id))
            })
            .collect();
        let farmers: BTreeSet<Uuid> = lines.iter().map(|line| line.farmer_id).collect();
        notices.extend(farmers.into_iter().map(|farmer_id| {
            Notice::new(
                farmer_id,
                format!("Admin has finalized the status of order {}.", order.invoice_number),
            )
            .with_link(format!("/farmer/orders/{}", order.id))
        }));
        dispatch(&state.pool, &notices).await;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_items_update",
        Some("order_items"),
        Some(serde_json::json!({
            "order_id": order.id,
            "changed": changed
                .iter()
                .map(|(item_id, status)| serde_json::json!({ "item_id": item_id, "status": status }))
                .collect::<Vec<_>>(),
            "status": derived,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let response = ApiResponse::success(
        "Order items updated",
        OrderWithItems {
            order: order.into(),
            items: lines,
        },
        Some(Meta::empty()),
    );
    Ok(if skipped.is_empty() {
        response
    } else {
        response.with_warning(format!("Ignored: {}.", skipped.join("; ")))
    })
}

/// Cancel a whole order without touching its items.
pub async fn admin_cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = lock_order(&txn, id).await?;

    if !existing.status.can_transition_to(OrderStatus::Cancelled) {
        txn.rollback().await?;
        tracing::warn!(order_id = %id, status = %existing.status, "cancel ignored");
        let message = format!("A {} order cannot be cancelled.", existing.status);
        return Ok(unchanged(existing, message));
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(OrderStatus::Cancelled);
    active.admin_approved = Set(true);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order cancelled by admin");

    dispatch(
        &state.pool,
        &[Notice::new(
            order.user_id,
            format!("Your order {} has been cancelled.", order.invoice_number),
        )
        .with_link(format!("/orders/{}", order.id))],
    )
    .await;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_activity(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ActivityList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let items = recent_activity(&state.pool, limit, offset).await?;
    let total = count_activity(&state.pool).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Activity", ActivityList { items }, Some(meta)))
}

async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

fn unchanged(order: OrderModel, warning: String) -> ApiResponse<Order> {
    ApiResponse::success("Order unchanged", Order::from(order), Some(Meta::empty()))
        .with_warning(warning)
}
