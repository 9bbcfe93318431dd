//! Loan workflow: borrowing and returning copies

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{BorrowRecord, BorrowedBook},
    },
    repository::Repository,
};

/// Emails identify borrowers; compare them trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow one copy of a book.
    ///
    /// The copy decrement and the record insert are one atomic step in the
    /// store, so concurrent borrows never drive the quantity below zero.
    pub async fn borrow(&self, user_email: &str, book_id: Uuid) -> AppResult<BorrowRecord> {
        let user_email = normalize_email(user_email);
        if user_email.is_empty() {
            return Err(AppError::Validation("userEmail is required".to_string()));
        }

        if self
            .repository
            .loans
            .find_outstanding(&user_email, book_id)
            .await?
            .is_some()
        {
            tracing::warn!("Borrow refused: {} already holds book {}", user_email, book_id);
            return Err(AppError::AlreadyBorrowed);
        }

        let record = self
            .repository
            .loans
            .checkout(&user_email, book_id, Utc::now())
            .await
            .map_err(|e| {
                if matches!(e, AppError::OutOfStock | AppError::AlreadyBorrowed) {
                    tracing::warn!("Borrow refused for {} on book {}: {}", user_email, book_id, e);
                }
                e
            })?;

        tracing::info!("Book {} borrowed by {} (record {})", book_id, user_email, record.id);
        Ok(record)
    }

    /// Return a borrowed copy. The record is stamped with its return date,
    /// the copy goes back on the shelf, and the record leaves the ledger.
    pub async fn return_loan(&self, record_id: Uuid) -> AppResult<BorrowRecord> {
        let record = self
            .repository
            .loans
            .checkin(record_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Borrow record not found".to_string()))?;

        tracing::info!("Book {} returned by {} (record {})", record.book_id, record.user_email, record.id);
        Ok(record)
    }

    /// Put one copy back on the shelf without touching the ledger
    pub async fn restore_quantity(&self, book_id: Uuid) -> AppResult<Book> {
        let book = self
            .repository
            .books
            .increment_quantity(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        tracing::info!("Book {} quantity restored to {}", book.id, book.quantity);
        Ok(book)
    }

    /// Outstanding loans of a user, each expanded with its book
    pub async fn borrowed_books(&self, user_email: &str) -> AppResult<Vec<BorrowedBook>> {
        let records = self
            .repository
            .loans
            .list_for_user(&normalize_email(user_email))
            .await?;

        let mut borrowed = Vec::with_capacity(records.len());
        for record in records {
            let book = self.repository.books.get(record.book_id).await?;
            borrowed.push(BorrowedBook::new(record, book));
        }
        Ok(borrowed)
    }
}
