//! Review endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::review::{CreateReview, Review, ReviewQuery, UpdateReview},
    AppState,
};

use super::{parse_id, AuthenticatedUser, MessageResponse, ValidatedJson};

/// List reviews
#[utoipa::path(
    get,
    path = "/reviews",
    tag = "reviews",
    params(ReviewQuery),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<Review>)
    )
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.services.reviews.list(&query).await?;
    Ok(Json(reviews))
}

/// Get one review
#[utoipa::path(
    get,
    path = "/reviews/{id}",
    tag = "reviews",
    params(("id" = String, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "Review not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_review(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Review>> {
    let id = parse_id(&id, "Review")?;
    let review = state.services.reviews.get(id).await?;
    Ok(Json(review))
}

/// Post a review as the caller
#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Referenced book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_review(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    ValidatedJson(review): ValidatedJson<CreateReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let created = state.services.reviews.create(&identity, review).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update one of the caller's reviews
#[utoipa::path(
    put,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Review ID")),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not the review's author"),
        (status = 404, description = "Review not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_review(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateReview>,
) -> AppResult<Json<Review>> {
    let id = parse_id(&id, "Review")?;
    let review = state.services.reviews.update(&identity, id, changes).await?;
    Ok(Json(review))
}

/// Delete one of the caller's reviews
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted", body = MessageResponse),
        (status = 403, description = "Not the review's author"),
        (status = 404, description = "Review not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id, "Review")?;
    state.services.reviews.delete(&identity, id).await?;
    Ok(Json(MessageResponse::new("Review deleted successfully")))
}
