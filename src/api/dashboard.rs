//! Dashboard endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppResult, models::book::Book, AppState};

/// Library-wide counts
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_books: i64,
    /// Distinct users with at least one outstanding loan
    pub total_borrowers: i64,
    pub active_loans: i64,
    /// Distinct non-empty book categories
    pub total_categories: i64,
    pub total_banners: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentBooksQuery {
    /// Number of books (default 5, clamped to 1..=50)
    pub limit: Option<i64>,
}

/// Get dashboard statistics
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Library statistics", body = DashboardStats)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.dashboard.stats().await?;
    Ok(Json(stats))
}

/// Most recently added books
#[utoipa::path(
    get,
    path = "/dashboard/recent-books",
    tag = "dashboard",
    params(RecentBooksQuery),
    responses(
        (status = 200, description = "Recently added books", body = Vec<Book>)
    )
)]
pub async fn recent_books(
    State(state): State<AppState>,
    Query(query): Query<RecentBooksQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.dashboard.recent_books(query.limit).await?;
    Ok(Json(books))
}
