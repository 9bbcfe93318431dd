//! Banner endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::banner::{Banner, CreateBanner, UpdateBanner},
    AppState,
};

use super::{parse_id, AuthenticatedUser, MessageResponse, ValidatedJson};

#[utoipa::path(
    get,
    path = "/banners",
    tag = "banners",
    responses(
        (status = 200, description = "Banners, newest first", body = Vec<Banner>)
    )
)]
pub async fn list_banners(State(state): State<AppState>) -> AppResult<Json<Vec<Banner>>> {
    let banners = state.services.banners.list().await?;
    Ok(Json(banners))
}

/// The banner currently shown
#[utoipa::path(
    get,
    path = "/banners/active",
    tag = "banners",
    responses(
        (status = 200, description = "Active banner", body = Banner),
        (status = 404, description = "No active banner", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_active_banner(State(state): State<AppState>) -> AppResult<Json<Banner>> {
    state
        .services
        .banners
        .active()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No active banner".to_string()))
}

#[utoipa::path(
    get,
    path = "/banners/{id}",
    tag = "banners",
    params(("id" = String, Path, description = "Banner ID")),
    responses(
        (status = 200, description = "Banner", body = Banner),
        (status = 404, description = "Banner not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_banner(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Banner>> {
    let id = parse_id(&id, "Banner")?;
    let banner = state.services.banners.get(id).await?;
    Ok(Json(banner))
}

#[utoipa::path(
    post,
    path = "/banners",
    tag = "banners",
    security(("bearer_auth" = [])),
    request_body = CreateBanner,
    responses(
        (status = 201, description = "Banner created", body = Banner),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_banner(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    ValidatedJson(banner): ValidatedJson<CreateBanner>,
) -> AppResult<(StatusCode, Json<Banner>)> {
    let created = state.services.banners.create(banner).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/banners/{id}",
    tag = "banners",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Banner ID")),
    request_body = UpdateBanner,
    responses(
        (status = 200, description = "Banner updated", body = Banner),
        (status = 404, description = "Banner not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_banner(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateBanner>,
) -> AppResult<Json<Banner>> {
    let id = parse_id(&id, "Banner")?;
    let banner = state.services.banners.update(id, changes).await?;
    Ok(Json(banner))
}

/// Make a banner the only active one
#[utoipa::path(
    put,
    path = "/banners/{id}/active",
    tag = "banners",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Banner ID")),
    responses(
        (status = 200, description = "Banner activated", body = Banner),
        (status = 404, description = "Banner not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate_banner(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Banner>> {
    let id = parse_id(&id, "Banner")?;
    let banner = state.services.banners.activate(id).await?;
    Ok(Json(banner))
}

#[utoipa::path(
    delete,
    path = "/banners/{id}",
    tag = "banners",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Banner ID")),
    responses(
        (status = 200, description = "Banner deleted", body = MessageResponse),
        (status = 404, description = "Banner not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_banner(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id, "Banner")?;
    state.services.banners.delete(id).await?;
    Ok(Json(MessageResponse::new("Banner deleted successfully")))
}
