use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::addresses::{AddressList, CreateAddressRequest},
    entity::{
        Users,
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses},
        users::ActiveModel as UserActive,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let profile = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items: Vec<Address> = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_asc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|address| Address::from_entity(address, profile.default_address_id))
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Add an address. The first address, or one flagged `make_default`,
/// becomes the default.
pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let fields = [
        ("address_line", &payload.address_line),
        ("state", &payload.state),
        ("district", &payload.district),
        ("pincode", &payload.pincode),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::BadRequest(format!("{name} is required")));
    }

    let txn = state.orm.begin().await?;
    let profile = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .count(&txn)
        .await?;

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address_line: Set(payload.address_line.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        district: Set(payload.district.trim().to_string()),
        pincode: Set(payload.pincode.trim().to_string()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let default_id = if existing == 0 || payload.make_default {
        let mut active: UserActive = profile.into();
        active.default_address_id = Set(Some(address.id));
        active.update(&txn).await?.default_address_id
    } else {
        profile.default_address_id
    };
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address saved",
        Address::from_entity(address, default_id),
        Some(Meta::empty()),
    ))
}

pub async fn set_default_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let address = Addresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let profile = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut active: UserActive = profile.into();
    active.default_address_id = Set(Some(address.id));
    let profile = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Default address updated",
        Address::from_entity(address, profile.default_address_id),
        Some(Meta::empty()),
    ))
}
