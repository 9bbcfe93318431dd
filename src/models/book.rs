//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Title stored when a book is created or renamed with a blank title
pub const UNTITLED: &str = "Untitled";
/// Author stored when a book is created or updated with a blank author
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_RATING: i32 = 5;

/// Book record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub category: String,
    /// Copies currently on the shelf
    pub quantity: i32,
    /// Informational; lending decisions use `quantity`
    pub available: bool,
    /// Cover image reference
    pub image: Option<String>,
    /// Seed rating (1-5)
    pub rating: i32,
    /// Mean review rating, one decimal
    pub average_rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub available: Option<bool>,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

/// Normalized book ready to be persisted
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub category: String,
    pub quantity: i32,
    pub available: bool,
    pub image: Option<String>,
    pub rating: i32,
}

impl From<CreateBook> for NewBook {
    fn from(book: CreateBook) -> Self {
        let quantity = book.quantity.unwrap_or(0);
        NewBook {
            title: non_blank_or(Some(book.title), UNTITLED),
            author: non_blank_or(Some(book.author), UNKNOWN_AUTHOR),
            description: book.description,
            category: non_blank_or(book.category, DEFAULT_CATEGORY),
            quantity,
            available: book.available.unwrap_or(quantity > 0),
            image: book.image,
            rating: book.rating.unwrap_or(DEFAULT_RATING),
        }
    }
}

/// Partial book update; only provided fields change
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub available: Option<bool>,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

impl UpdateBook {
    /// Apply the same fallbacks as creation to the provided fields
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| non_blank_or(Some(t), UNTITLED));
        self.author = self.author.map(|a| non_blank_or(Some(a), UNKNOWN_AUTHOR));
        self.category = self.category.map(|c| non_blank_or(Some(c), DEFAULT_CATEGORY));
        if self.available.is_none() {
            self.available = self.quantity.map(|q| q > 0);
        }
        self
    }

    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref description) = self.description {
            book.description = Some(description.clone());
        }
        if let Some(ref category) = self.category {
            book.category = category.clone();
        }
        if let Some(quantity) = self.quantity {
            book.quantity = quantity;
        }
        if let Some(available) = self.available {
            book.available = available;
        }
        if let Some(ref image) = self.image {
            book.image = Some(image.clone());
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
    }
}

/// Book list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Exact category match
    pub category: Option<String>,
    /// `true` keeps books with copies on the shelf, `false` keeps exhausted ones
    pub available: Option<bool>,
    /// Case-insensitive substring over title, description and category
    pub search: Option<String>,
}

impl BookQuery {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref category) = self.category {
            if &book.category != category {
                return false;
            }
        }
        if let Some(available) = self.available {
            if (book.quantity > 0) != available {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let hit = book.title.to_lowercase().contains(&term)
                || book.category.to_lowercase().contains(&term)
                || book
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&term))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }
        true
    }

    /// Lowercased search term, `None` when absent or blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Directly restore one copy of a book to the shelf
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreQuantityRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
}

pub(crate) fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, category: &str, description: Option<&str>, quantity: i32) -> Book {
        let now = Utc::now();
        Book {
            id: Uuid::new_v4(),
            title: title.to_string(),
            author: "Anyone".to_string(),
            description: description.map(str::to_string),
            category: category.to_string(),
            quantity,
            available: quantity > 0,
            image: None,
            rating: DEFAULT_RATING,
            average_rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_blank_fields_fall_back_to_sentinels() {
        let new_book = NewBook::from(CreateBook {
            title: "   ".to_string(),
            ..Default::default()
        });
        assert_eq!(new_book.title, UNTITLED);
        assert_eq!(new_book.author, UNKNOWN_AUTHOR);
        assert_eq!(new_book.category, DEFAULT_CATEGORY);
        assert_eq!(new_book.quantity, 0);
        assert!(!new_book.available);
        assert_eq!(new_book.rating, 5);
    }

    #[test]
    fn test_update_derives_availability_from_quantity() {
        let update = UpdateBook {
            quantity: Some(0),
            title: Some(String::new()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(update.available, Some(false));
        assert_eq!(update.title.as_deref(), Some(UNTITLED));
        assert!(update.author.is_none());
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let request = CreateBook {
            title: "Dune".to_string(),
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_query_matching() {
        let dune = book("Dune", "Science Fiction", Some("Desert planet epic"), 2);
        let emma = book("Emma", "Classics", None, 0);

        let search = BookQuery {
            search: Some("DESERT".to_string()),
            ..Default::default()
        };
        assert!(search.matches(&dune));
        assert!(!search.matches(&emma));

        let on_shelf = BookQuery {
            available: Some(true),
            ..Default::default()
        };
        assert!(on_shelf.matches(&dune));
        assert!(!on_shelf.matches(&emma));

        let category = BookQuery {
            category: Some("classics".to_string()),
            ..Default::default()
        };
        assert!(!category.matches(&emma), "category filter is an exact match");
    }
}
