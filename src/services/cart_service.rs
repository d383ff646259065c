use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    domain::bundle_subtotal,
    dto::cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Subtotal of one cart line at the product's current discounted price.
pub fn line_subtotal(item: &CartModel, product: &ProductModel) -> Decimal {
    bundle_subtotal(item.quantity, product.bundle_size, product.discounted_price())
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let cart = load_cart(state, user.user_id).await?;
    let meta = Meta::new(1, cart.items.len() as i64, cart.items.len() as i64);
    Ok(ApiResponse::success("OK", cart, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;

    let product = Products::find_by_id(payload.product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if product.stock <= 0 {
        return Err(AppError::OutOfStock(product.name));
    }

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(product.id)),
        )
        .one(&state.orm)
        .await?;

    let mut warning = None;
    match existing {
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(product.id),
                quantity: Set(product.bundle_size),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?;
        }
        Some(item) => {
            let wanted = item.quantity + product.bundle_size;
            if wanted <= product.stock {
                let mut active: CartActive = item.into();
                active.quantity = Set(wanted);
                active.update(&state.orm).await?;
            } else {
                warning = Some(format!("Only {} items available.", product.stock));
            }
        }
    }

    let cart = load_cart(state, user.user_id).await?;
    let response = ApiResponse::success("Added to cart", cart, Some(Meta::empty()));
    Ok(match warning {
        Some(message) => response.with_warning(message),
        None => response,
    })
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;

    let (item, product) = CartItems::find_by_id(item_id)
        .filter(CartCol::UserId.eq(user.user_id))
        .find_also_related(Products)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let product = product.ok_or(AppError::NotFound)?;

    let mut warning = None;
    let quantity = if payload.quantity > product.stock {
        warning = Some(format!("Only {} items available.", product.stock.max(0)));
        product.stock
    } else {
        payload.quantity
    };

    if quantity <= 0 {
        CartItems::delete_by_id(item.id).exec(&state.orm).await?;
    } else {
        let mut active: CartActive = item.into();
        active.quantity = Set(quantity);
        active.update(&state.orm).await?;
    }

    let cart = load_cart(state, user.user_id).await?;
    let response = ApiResponse::success("Cart updated", cart, Some(Meta::empty()));
    Ok(match warning {
        Some(message) => response.with_warning(message),
        None => response,
    })
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    ensure_customer(user)?;
    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::Id.eq(item_id))
                .add(CartCol::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let cart = load_cart(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", cart, Some(Meta::empty())))
}

async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .find_also_related(Products)
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items: Vec<CartLine> = rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|product| (item, product)))
        .map(|(item, product)| CartLine {
            id: item.id,
            quantity: item.quantity,
            subtotal: line_subtotal(&item, &product),
            product: product.into(),
        })
        .collect();
    let total = items.iter().map(|line| line.subtotal).sum();

    Ok(CartView { items, total })
}
