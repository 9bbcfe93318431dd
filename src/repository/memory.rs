//! In-memory implementation of every store trait.
//!
//! All collections live behind one mutex, so each trait method is atomic with
//! respect to every other. Used by the test suite and by `memory://` runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        banner::{Banner, CreateBanner, UpdateBanner},
        book::{Book, BookQuery, NewBook, UpdateBook},
        category::{Category, CreateCategory, UpdateCategory},
        loan::BorrowRecord,
        review::{NewReview, RatingSummary, Review, ReviewQuery, UpdateReview},
    },
};

use super::{BannerStore, BookStore, CategoryStore, LoanStore, ReviewStore};

/// Put one copy back on the shelf
fn restock(book: &mut Book, at: DateTime<Utc>) -> AppResult<()> {
    book.quantity = book
        .quantity
        .checked_add(1)
        .ok_or_else(|| AppError::Conflict(format!("Book {} cannot hold more copies", book.id)))?;
    book.available = true;
    book.updated_at = at;
    Ok(())
}

#[derive(Default)]
struct MemoryState {
    books: IndexMap<Uuid, Book>,
    loans: IndexMap<Uuid, BorrowRecord>,
    reviews: IndexMap<Uuid, Review>,
    banners: IndexMap<Uuid, Banner>,
    categories: IndexMap<Uuid, Category>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
    }
}

/// Newest first; among equal timestamps the later insertion wins
fn newest_first<'a, T: 'a + Clone>(
    values: impl DoubleEndedIterator<Item = &'a T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut items: Vec<T> = values.rev().cloned().collect();
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let now = Utc::now();
        let created = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            category: book.category.clone(),
            quantity: book.quantity,
            available: book.available,
            image: book.image.clone(),
            rating: book.rating,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.lock()?.books.get(&id).cloned())
    }

    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let state = self.lock()?;
        let books = newest_first(state.books.values(), |b: &Book| b.created_at);
        Ok(books.into_iter().filter(|b| query.matches(b)).collect())
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Option<Book>> {
        let mut state = self.lock()?;
        Ok(state.books.get_mut(&id).map(|book| {
            changes.apply(book);
            book.updated_at = Utc::now();
            book.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.lock()?;
        state.reviews.retain(|_, r| r.book_id != Some(id));
        state.loans.retain(|_, l| l.book_id != id);
        Ok(state.books.shift_remove(&id).is_some())
    }

    async fn increment_quantity(&self, id: Uuid) -> AppResult<Option<Book>> {
        let mut state = self.lock()?;
        match state.books.get_mut(&id) {
            Some(book) => {
                restock(book, Utc::now())?;
                Ok(Some(book.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set_rating_summary(&self, id: Uuid, summary: &RatingSummary) -> AppResult<bool> {
        let mut state = self.lock()?;
        match state.books.get_mut(&id) {
            Some(book) => {
                book.average_rating = summary.average_rating;
                book.review_count = summary.review_count;
                book.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<Book>> {
        let state = self.lock()?;
        let mut books = newest_first(state.books.values(), |b: &Book| b.created_at);
        books.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(books)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.books.len() as i64)
    }

    async fn count_categories(&self) -> AppResult<i64> {
        let state = self.lock()?;
        let mut categories: Vec<&str> = state
            .books
            .values()
            .map(|b| b.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        Ok(categories.len() as i64)
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn find_outstanding(&self, user_email: &str, book_id: Uuid) -> AppResult<Option<BorrowRecord>> {
        let state = self.lock()?;
        Ok(state
            .loans
            .values()
            .find(|r| r.user_email == user_email && r.book_id == book_id && r.is_outstanding())
            .cloned())
    }

    async fn checkout(&self, user_email: &str, book_id: Uuid, borrowed_at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let mut state = self.lock()?;

        let already = state
            .loans
            .values()
            .any(|r| r.user_email == user_email && r.book_id == book_id && r.is_outstanding());
        if already {
            return Err(AppError::AlreadyBorrowed);
        }

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if book.quantity <= 0 {
            return Err(AppError::OutOfStock);
        }
        book.quantity -= 1;
        book.available = book.quantity > 0;
        book.updated_at = borrowed_at;

        let record = BorrowRecord {
            id: Uuid::new_v4(),
            user_email: user_email.to_string(),
            book_id,
            borrowed_date: borrowed_at,
            return_date: None,
        };
        state.loans.insert(record.id, record.clone());

        Ok(record)
    }

    async fn checkin(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<Option<BorrowRecord>> {
        let mut state = self.lock()?;

        let book_id = match state.loans.get(&id) {
            Some(record) => record.book_id,
            None => return Ok(None),
        };

        match state.books.get_mut(&book_id) {
            Some(book) => restock(book, returned_at)?,
            None => tracing::warn!("Returned loan {} references missing book {}", id, book_id),
        }

        let mut record = match state.loans.shift_remove(&id) {
            Some(record) => record,
            None => return Ok(None),
        };
        record.return_date = Some(returned_at);

        Ok(Some(record))
    }

    async fn list_for_user(&self, user_email: &str) -> AppResult<Vec<BorrowRecord>> {
        let state = self.lock()?;
        let mut records: Vec<BorrowRecord> = state
            .loans
            .values()
            .filter(|r| r.user_email == user_email && r.is_outstanding())
            .cloned()
            .collect();
        records.sort_by_key(|r| r.borrowed_date);
        Ok(records)
    }

    async fn count_outstanding(&self) -> AppResult<i64> {
        let state = self.lock()?;
        Ok(state.loans.values().filter(|r| r.is_outstanding()).count() as i64)
    }

    async fn count_borrowers(&self) -> AppResult<i64> {
        let state = self.lock()?;
        let mut emails: Vec<&str> = state
            .loans
            .values()
            .filter(|r| r.is_outstanding())
            .map(|r| r.user_email.as_str())
            .collect();
        emails.sort_unstable();
        emails.dedup();
        Ok(emails.len() as i64)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create(&self, review: &NewReview) -> AppResult<Review> {
        let now = Utc::now();
        let created = Review {
            id: Uuid::new_v4(),
            title: review.title.clone(),
            content: review.content.clone(),
            author: review.author.clone(),
            rating: review.rating,
            category: review.category,
            book_id: review.book_id,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.reviews.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(self.lock()?.reviews.get(&id).cloned())
    }

    async fn list(&self, query: &ReviewQuery) -> AppResult<Vec<Review>> {
        let state = self.lock()?;
        let reviews = newest_first(state.reviews.values(), |r: &Review| r.created_at);
        Ok(reviews.into_iter().filter(|r| query.matches(r)).collect())
    }

    async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<i32>> {
        let state = self.lock()?;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.book_id == Some(book_id))
            .map(|r| r.rating)
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &UpdateReview) -> AppResult<Option<Review>> {
        let mut state = self.lock()?;
        Ok(state.reviews.get_mut(&id).map(|review| {
            changes.apply(review);
            review.updated_at = Utc::now();
            review.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(self.lock()?.reviews.shift_remove(&id))
    }
}

fn switch_active(banners: &mut IndexMap<Uuid, Banner>, id: Uuid, now: DateTime<Utc>) -> bool {
    if !banners.contains_key(&id) {
        return false;
    }
    for banner in banners.values_mut() {
        let on = banner.id == id;
        if banner.active != on {
            banner.active = on;
            banner.updated_at = now;
        }
    }
    true
}

#[async_trait]
impl BannerStore for MemoryStore {
    async fn create(&self, banner: &CreateBanner) -> AppResult<Banner> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut state = self.lock()?;
        state.banners.insert(
            id,
            Banner {
                id,
                title: banner.title.clone(),
                subtitle: banner.subtitle.clone(),
                image_url: banner.image_url.clone(),
                active: false,
                created_at: now,
                updated_at: now,
            },
        );
        if banner.active.unwrap_or(false) {
            switch_active(&mut state.banners, id, now);
        }
        state
            .banners
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Internal("Created banner vanished".to_string()))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Banner>> {
        Ok(self.lock()?.banners.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Banner>> {
        let state = self.lock()?;
        Ok(newest_first(state.banners.values(), |b: &Banner| b.created_at))
    }

    async fn active(&self) -> AppResult<Option<Banner>> {
        let state = self.lock()?;
        Ok(state.banners.values().find(|b| b.active).cloned())
    }

    async fn update(&self, id: Uuid, changes: &UpdateBanner) -> AppResult<Option<Banner>> {
        let now = Utc::now();
        let mut state = self.lock()?;
        let Some(banner) = state.banners.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(banner);
        banner.updated_at = now;
        if changes.active == Some(true) {
            switch_active(&mut state.banners, id, now);
        }
        Ok(state.banners.get(&id).cloned())
    }

    async fn activate(&self, id: Uuid) -> AppResult<Option<Banner>> {
        let mut state = self.lock()?;
        if !switch_active(&mut state.banners, id, Utc::now()) {
            return Ok(None);
        }
        Ok(state.banners.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.banners.shift_remove(&id).is_some())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.lock()?.banners.len() as i64)
    }
}

fn name_taken(categories: &IndexMap<Uuid, Category>, name: &str, except: Option<Uuid>) -> bool {
    let name = name.to_lowercase();
    categories
        .values()
        .any(|c| Some(c.id) != except && c.name.to_lowercase() == name)
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create(&self, category: &CreateCategory) -> AppResult<Category> {
        let mut state = self.lock()?;
        if name_taken(&state.categories, &category.name, None) {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }
        let now = Utc::now();
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name.clone(),
            description: category.description.clone(),
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let state = self.lock()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let name = name.to_lowercase();
        let state = self.lock()?;
        Ok(state
            .categories
            .values()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: &UpdateCategory) -> AppResult<Option<Category>> {
        let mut state = self.lock()?;
        if let Some(ref name) = changes.name {
            if name_taken(&state.categories, name, Some(id)) {
                return Err(AppError::Conflict("Category already exists".to_string()));
            }
        }
        Ok(state.categories.get_mut(&id).map(|category| {
            if let Some(ref name) = changes.name {
                category.name = name.clone();
            }
            if let Some(ref description) = changes.description {
                category.description = Some(description.clone());
            }
            category.updated_at = Utc::now();
            category.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.categories.shift_remove(&id).is_some())
    }
}
