use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::Expr;

use crate::{
    dto::notifications::NotificationList,
    entity::notifications::{Column as NotificationCol, Entity as Notifications},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Notifications::find()
        .filter(NotificationCol::UserId.eq(user.user_id))
        .order_by_desc(NotificationCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let unread = Notifications::find()
        .filter(
            Condition::all()
                .add(NotificationCol::UserId.eq(user.user_id))
                .add(NotificationCol::IsRead.eq(false)),
        )
        .count(&state.orm)
        .await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items, unread },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn mark_all_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Notifications::update_many()
        .col_expr(NotificationCol::IsRead, Expr::value(true))
        .filter(
            Condition::all()
                .add(NotificationCol::UserId.eq(user.user_id))
                .add(NotificationCol::IsRead.eq(false)),
        )
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Notifications marked as read",
        serde_json::json!({ "updated": result.rows_affected }),
        Some(Meta::empty()),
    ))
}
