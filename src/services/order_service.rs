use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    domain::{OrderCharges, OrderStatus, PaymentMethod, bundle_subtotal},
    dto::orders::{
        CustomerOrderDetail, NextStep, OrderLine, OrderList, PlaceOrderRequest,
        PlaceOrderResponse,
    },
    entity::{
        Addresses, Users,
        cart_items::{Column as CartCol, Entity as CartItems, Model as CartModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        reviews::{Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Order,
    notify::{Notice, dispatch},
    payment::{PaymentIntent, to_minor_units},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Contact details copied onto the order at placement.
struct Contact {
    full_name: String,
    phone: String,
    email: String,
    address: String,
}

struct PlacedOrder {
    order: OrderModel,
    lines: Vec<OrderLine>,
    charges: OrderCharges,
    farmers: BTreeSet<Uuid>,
}

/// Turn the caller's cart into an order.
///
/// Order, items, stock decrements and cart deletion commit together. Each
/// decrement is conditional on enough stock remaining, so two orders racing
/// for the last units cannot both succeed. Notifications, audit and the
/// payment gateway run after commit and never undo the order.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlaceOrderResponse>> {
    ensure_customer(user)?;
    let contact = resolve_contact(state, user.user_id, &payload).await?;

    let txn = state.orm.begin().await.map_err(placement_failed)?;
    let placed = match write_order(state, &txn, user.user_id, payload.payment_method, contact).await {
        Ok(placed) => placed,
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            return Err(match err {
                AppError::OrmError(db_err) => placement_failed(db_err),
                other => other,
            });
        }
    };
    txn.commit().await.map_err(placement_failed)?;

    let PlacedOrder {
        order,
        lines,
        charges,
        farmers,
    } = placed;

    tracing::info!(
        order_id = %order.id,
        invoice = %order.invoice_number,
        total = %order.total_amount,
        method = %order.payment_method.as_str(),
        "order placed"
    );

    let mut notices: Vec<Notice> = farmers
        .iter()
        .map(|farmer_id| {
            Notice::new(
                *farmer_id,
                format!("New order {} contains your products.", order.invoice_number),
            )
            .with_link(format!("/farmer/orders/{}", order.id))
        })
        .collect();
    notices.push(
        Notice::new(
            user.user_id,
            format!(
                "Your order {} has been placed. Total: {}.",
                order.invoice_number, order.total_amount
            ),
        )
        .with_link(format!("/orders/{}", order.id)),
    );
    dispatch(&state.pool, &notices).await;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_place",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "total_amount": order.total_amount,
            "payment_method": order.payment_method.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let (order, payment, warning) = match order.payment_method {
        PaymentMethod::Cod => (order, None, None),
        PaymentMethod::Online => start_payment(state, order).await,
    };

    let next_step = match order.payment_method {
        PaymentMethod::Cod => NextStep::Success,
        PaymentMethod::Online => NextStep::Payment,
    };

    let response = ApiResponse::success(
        "Order placed",
        PlaceOrderResponse {
            order: order.into(),
            items: lines,
            charges,
            payment,
            next_step,
        },
        Some(Meta::empty()),
    );
    Ok(match warning {
        Some(message) => response.with_warning(message),
        None => response,
    })
}

async fn write_order(
    state: &AppState,
    txn: &DatabaseTransaction,
    user_id: Uuid,
    payment_method: PaymentMethod,
    contact: Contact,
) -> AppResult<PlacedOrder> {
    let items = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(txn)
        .await?;
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    // Product rows are locked in id order so concurrent placements queue
    // behind each other instead of deadlocking.
    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let cart: Vec<(CartModel, &ProductModel)> = items
        .into_iter()
        .filter_map(|item| products.get(&item.product_id).map(|product| (item, product)))
        .collect();
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let subtotal = cart
        .iter()
        .map(|(item, product)| {
            bundle_subtotal(item.quantity, product.bundle_size, product.discounted_price())
        })
        .sum();
    let charges = state.charges.charges_for(subtotal, payment_method);

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        invoice_number: Set(build_invoice_number(order_id)),
        full_name: Set(contact.full_name),
        phone: Set(contact.phone),
        email: Set(contact.email),
        address: Set(contact.address),
        payment_method: Set(payment_method),
        delivery_charge: Set(charges.delivery_charge),
        cod_charge: Set(charges.cod_charge),
        total_amount: Set(charges.total_amount),
        status: Set(OrderStatus::Pending),
        farmer_status: Set(OrderStatus::Pending),
        admin_approved: Set(false),
        payment_reference: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let mut lines = Vec::with_capacity(cart.len());
    let mut farmers = BTreeSet::new();

    for (item, product) in &cart {
        let product = *product;
        let decremented = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(
                Condition::all()
                    .add(ProdCol::Id.eq(product.id))
                    .add(ProdCol::Stock.gte(item.quantity)),
            )
            .exec(txn)
            .await?;
        if decremented.rows_affected == 0 {
            tracing::warn!(
                product_id = %product.id,
                requested = item.quantity,
                "stock exhausted during placement"
            );
            return Err(AppError::OutOfStock(product.name.clone()));
        }

        let order_item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(item.quantity),
            price: Set(product.discounted_price()),
            status: Set(OrderStatus::Pending),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        farmers.insert(product.farmer_id);
        lines.push(order_line(order_item, product));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(txn)
        .await?;

    Ok(PlacedOrder {
        order,
        lines,
        charges,
        farmers,
    })
}

/// Ask the gateway for a payment intent and store its reference. A failure
/// leaves the order pending without a reference.
async fn start_payment(
    state: &AppState,
    order: OrderModel,
) -> (OrderModel, Option<PaymentIntent>, Option<String>) {
    let intent = match to_minor_units(order.total_amount) {
        Ok(amount) => {
            state
                .gateway
                .create_payment_intent(amount, state.gateway.currency())
                .await
        }
        Err(err) => Err(err),
    };

    let intent = match intent {
        Ok(intent) => intent,
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "payment not initiated");
            return (
                order,
                None,
                Some("Payment could not be initiated. Your order is saved as pending.".to_string()),
            );
        }
    };

    let mut active: OrderActive = order.clone().into();
    active.payment_reference = Set(Some(intent.reference.clone()));
    active.updated_at = Set(Utc::now().into());
    match active.update(&state.orm).await {
        Ok(updated) => (updated, Some(intent), None),
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "storing payment reference failed");
            (order, Some(intent), None)
        }
    }
}

async fn resolve_contact(
    state: &AppState,
    user_id: Uuid,
    payload: &PlaceOrderRequest,
) -> AppResult<Contact> {
    let profile = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let given = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let address = match given(&payload.address) {
        Some(address) => address,
        None => {
            let default = match profile.default_address_id {
                Some(id) => Addresses::find_by_id(id).one(&state.orm).await?,
                None => None,
            };
            default
                .map(|address| address.formatted())
                .ok_or_else(|| AppError::BadRequest("a delivery address is required".into()))?
        }
    };

    let phone = given(&payload.phone)
        .or(profile.phone)
        .ok_or_else(|| AppError::BadRequest("a phone number is required".into()))?;

    Ok(Contact {
        full_name: given(&payload.full_name).unwrap_or(profile.full_name),
        phone,
        email: given(&payload.email).unwrap_or(profile.email),
        address,
    })
}

fn placement_failed(err: DbErr) -> AppError {
    tracing::error!(error = %err, "order placement rolled back");
    AppError::OrderNotPlaced
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders: Vec<Order> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CustomerOrderDetail>> {
    ensure_customer(user)?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = load_order_lines(&state.orm, order.id).await?;

    let reviewed_products = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::OrderId.eq(order.id))
                .add(ReviewCol::CustomerId.eq(user.user_id)),
        )
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|review| review.product_id)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CustomerOrderDetail {
            order: order.into(),
            items,
            reviewed_products,
        },
        Some(Meta::empty()),
    ))
}

/// Every item of an order with its product, oldest first.
pub async fn load_order_lines<C>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderLine>>
where
    C: ConnectionTrait,
{
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .find_also_related(Products)
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|product| order_line(item, &product)))
        .collect())
}

pub fn order_line(item: OrderItemModel, product: &ProductModel) -> OrderLine {
    OrderLine {
        id: item.id,
        product_id: item.product_id,
        product_name: product.name.clone(),
        farmer_id: product.farmer_id,
        quantity: item.quantity,
        bundle_size: product.bundle_size,
        price: item.price,
        subtotal: bundle_subtotal(item.quantity, product.bundle_size, item.price),
        status: item.status,
    }
}

/// `INV-YYYYMMDD-<order id>`; the full id keeps the number unique.
fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    format!("INV-{}-{}", date, order_id.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_carries_date_and_full_id() {
        let id = Uuid::new_v4();
        let invoice = build_invoice_number(id);
        let parts: Vec<&str> = invoice.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], id.simple().to_string());
    }

    #[test]
    fn ids_sharing_a_prefix_get_distinct_invoice_numbers() {
        let a = Uuid::parse_str("1234abcd-0000-4000-8000-000000000001").expect("uuid");
        let b = Uuid::parse_str("1234abcd-0000-4000-8000-000000000002").expect("uuid");
        assert_ne!(build_invoice_number(a), build_invoice_number(b));
    }
}
