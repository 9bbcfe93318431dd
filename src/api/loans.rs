//! Borrow and return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, RestoreQuantityRequest},
        loan::{BorrowRecord, BorrowRequest, BorrowedBook, BorrowedQuery},
    },
    AppState,
};

use super::{parse_id, AuthenticatedUser, ValidatedJson};

/// Return response with the stamped record
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub message: String,
    /// The record as it was when returned, `returnDate` set
    pub record: BorrowRecord,
}

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowRecord),
        (status = 400, description = "Already borrowed, out of stock or invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Borrowing for another user"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRecord>)> {
    let user_email = request.user_email.trim();
    if user_email.is_empty() {
        return Err(AppError::Validation("userEmail is required".to_string()));
    }
    if !identity.can_act_for(user_email) {
        return Err(AppError::Authorization("You can only borrow books for yourself".to_string()));
    }
    let book_id = parse_id(&request.book_id, "Book")?;

    let record = state.services.loans.borrow(user_email, book_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List a user's borrowed books
#[utoipa::path(
    get,
    path = "/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(BorrowedQuery),
    responses(
        (status = 200, description = "Outstanding loans with their books", body = Vec<BorrowedBook>),
        (status = 403, description = "Listing another user's loans")
    )
)]
pub async fn list_borrowed(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(query): Query<BorrowedQuery>,
) -> AppResult<Json<Vec<BorrowedBook>>> {
    let email = match query.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => email.to_string(),
        None => identity.require_email()?.to_string(),
    };
    if !identity.can_act_for(&email) {
        return Err(AppError::Authorization("You can only list your own loans".to_string()));
    }

    let borrowed = state.services.loans.borrowed_books(&email).await?;
    Ok(Json(borrowed))
}

/// Return a borrowed book
#[utoipa::path(
    delete,
    path = "/borrowed/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Borrow record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ReturnResponse>> {
    let id = parse_id(&id, "Borrow record")?;
    let record = state.services.loans.return_loan(id).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        record,
    }))
}

/// Put one copy of a book back on the shelf
#[utoipa::path(
    put,
    path = "/book/return",
    tag = "loans",
    request_body = RestoreQuantityRequest,
    responses(
        (status = 200, description = "Quantity restored", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn restore_quantity(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RestoreQuantityRequest>,
) -> AppResult<Json<Book>> {
    let book_id = parse_id(&request.book_id, "Book")?;
    let book = state.services.loans.restore_quantity(book_id).await?;
    Ok(Json(book))
}
