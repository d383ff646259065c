use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, Set};
use sea_orm::sea_query::OnConflict;
use uuid::Uuid;

use crate::{
    domain::review::{ReviewIneligible, ReviewedOrder, can_review},
    dto::reviews::SubmitReviewRequest,
    entity::{
        Orders,
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        reviews::{self, ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// File a review for a product bought in `order_id`.
///
/// Submitting again for the same product and order is a no-op that returns
/// the stored review with a warning.
pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    product_id: Uuid,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_customer(user)?;

    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    let comment = payload.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let in_order = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::ProductId.eq(product_id)),
        )
        .count(&state.orm)
        .await?;
    if in_order == 0 {
        return Err(AppError::NotFound);
    }

    let existing = find_review(state, product_id, user.user_id, order.id).await?;
    let reviewed = ReviewedOrder {
        customer_id: order.user_id,
        status: order.status,
    };

    match can_review(reviewed, user.user_id, existing.is_some()) {
        Ok(()) => {}
        Err(ReviewIneligible::NotOwner) => return Err(AppError::NotFound),
        Err(ReviewIneligible::NotDelivered) => return Err(AppError::NotDelivered),
        Err(err @ ReviewIneligible::AlreadyReviewed) => {
            let review = existing.ok_or(AppError::NotFound)?;
            return Ok(already_reviewed(review, err));
        }
    }

    let inserted = Reviews::insert(ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        customer_id: Set(user.user_id),
        order_id: Set(order.id),
        rating: Set(payload.rating),
        comment: Set(comment.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([ReviewCol::ProductId, ReviewCol::CustomerId, ReviewCol::OrderId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    let review = find_review(state, product_id, user.user_id, order.id)
        .await?
        .ok_or(AppError::NotFound)?;

    if inserted == 0 {
        // A concurrent submission won the unique constraint.
        return Ok(already_reviewed(review, ReviewIneligible::AlreadyReviewed));
    }

    tracing::info!(order_id = %order.id, product_id = %product_id, rating = review.rating, "review filed");
    Ok(ApiResponse::success(
        "Review submitted",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

async fn find_review(
    state: &AppState,
    product_id: Uuid,
    customer_id: Uuid,
    order_id: Uuid,
) -> AppResult<Option<reviews::Model>> {
    let review = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::ProductId.eq(product_id))
                .add(ReviewCol::CustomerId.eq(customer_id))
                .add(ReviewCol::OrderId.eq(order_id)),
        )
        .one(&state.orm)
        .await?;
    Ok(review)
}

fn already_reviewed(review: reviews::Model, reason: ReviewIneligible) -> ApiResponse<Review> {
    ApiResponse::success("Review unchanged", Review::from(review), Some(Meta::empty()))
        .with_warning(reason.to_string())
}
