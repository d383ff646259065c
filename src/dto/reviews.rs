use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    /// 1 to 5.
    pub rating: i32,
    pub comment: String,
}
