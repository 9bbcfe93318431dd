//! Borrow record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::book::Book;

/// Borrow record from the loan ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_email: String,
    pub book_id: Uuid,
    pub borrowed_date: DateTime<Utc>,
    /// `None` while the loan is outstanding
    pub return_date: Option<DateTime<Utc>>,
}

impl BorrowRecord {
    pub fn is_outstanding(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "userEmail is required"))]
    pub user_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
}

/// Borrow record expanded with its book
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedBook {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_email: String,
    pub book_id: Uuid,
    pub borrowed_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    /// `None` when the book has been removed from the catalog
    pub book: Option<Book>,
}

impl BorrowedBook {
    pub fn new(record: BorrowRecord, book: Option<Book>) -> Self {
        Self {
            id: record.id,
            user_email: record.user_email,
            book_id: record.book_id,
            borrowed_date: record.borrowed_date,
            return_date: record.return_date,
            book,
        }
    }
}

/// Borrowed books query
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BorrowedQuery {
    /// Defaults to the caller's email
    pub email: Option<String>,
}
