use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_farmer},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .filter(Column::IsActive.eq(true))
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", Product::from(product), None))
}

/// Field rules shared by create and update. A bundle must hold at least one
/// unit, otherwise every price computed from it collapses to zero.
fn validate_fields(
    name: &str,
    price: Decimal,
    discount_percent: Option<i32>,
    stock: i32,
    bundle_size: i32,
) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if price < Decimal::ZERO {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if let Some(percent) = discount_percent {
        if !(0..=100).contains(&percent) {
            return Err(AppError::BadRequest(
                "discount_percent must be between 0 and 100".into(),
            ));
        }
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    if bundle_size < 1 {
        return Err(AppError::BadRequest("bundle_size must be at least 1".into()));
    }
    Ok(())
}

async fn ensure_unique_name(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut condition = Condition::all().add(Column::Name.eq(name));
    if let Some(id) = except {
        condition = condition.add(Column::Id.ne(id));
    }
    let taken = Products::find().filter(condition).count(&state.orm).await?;
    if taken > 0 {
        return Err(AppError::BadRequest(format!("product '{name}' already exists")));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_farmer(user)?;
    let name = payload.name.trim().to_string();
    validate_fields(
        &name,
        payload.price,
        payload.discount_percent,
        payload.stock,
        payload.bundle_size,
    )?;
    ensure_unique_name(state, &name, None).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        farmer_id: Set(user.user_id),
        name: Set(name),
        category: Set(payload.category),
        description: Set(payload.description),
        price: Set(payload.price),
        discount_percent: Set(payload.discount_percent),
        stock: Set(payload.stock),
        bundle_size: Set(payload.bundle_size),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_farmer(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.farmer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or_else(|| existing.name.clone());
    let price = payload.price.unwrap_or(existing.price);
    let discount_percent = payload.discount_percent.or(existing.discount_percent);
    let stock = payload.stock.unwrap_or(existing.stock);
    let bundle_size = payload.bundle_size.unwrap_or(existing.bundle_size);
    validate_fields(&name, price, discount_percent, stock, bundle_size)?;
    if name != existing.name {
        ensure_unique_name(state, &name, Some(existing.id)).await?;
    }

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.price = Set(price);
    active.discount_percent = Set(discount_percent);
    active.stock = Set(stock);
    active.bundle_size = Set(bundle_size);
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "at": Utc::now() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}
