//! Review model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_REVIEW_RATING: i32 = 5;

/// Kind of review post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReviewCategory {
    #[default]
    Review,
    Blog,
    Recommendation,
}

impl ReviewCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewCategory::Review => "Review",
            ReviewCategory::Blog => "Blog",
            ReviewCategory::Recommendation => "Recommendation",
        }
    }
}

impl std::fmt::Display for ReviewCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReviewCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Review" => Ok(ReviewCategory::Review),
            "Blog" => Ok(ReviewCategory::Blog),
            "Recommendation" => Ok(ReviewCategory::Recommendation),
            _ => Err(format!("Invalid review category: {}", s)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for ReviewCategory {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ReviewCategory {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ReviewCategory {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Review author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReviewAuthor {
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
}

/// Review record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: ReviewAuthor,
    pub rating: i32,
    pub category: ReviewCategory,
    pub book_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Internal row structure; the author is stored flattened
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    id: Uuid,
    title: String,
    content: String,
    author_name: String,
    author_email: String,
    author_photo_url: String,
    rating: i32,
    category: ReviewCategory,
    book_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            title: row.title,
            content: row.content,
            author: ReviewAuthor {
                name: row.author_name,
                email: row.author_email,
                photo_url: row.author_photo_url,
            },
            rating: row.rating,
            category: row.category,
            book_id: row.book_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Author block of a create request; the email defaults to the caller's
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReviewAuthor {
    #[validate(length(min = 1, message = "Author name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Create review request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(nested)]
    pub author: CreateReviewAuthor,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub category: Option<ReviewCategory>,
    pub book_id: Option<Uuid>,
}

/// Normalized review ready to be persisted
#[derive(Debug, Clone)]
pub struct NewReview {
    pub title: String,
    pub content: String,
    pub author: ReviewAuthor,
    pub rating: i32,
    pub category: ReviewCategory,
    pub book_id: Option<Uuid>,
}

/// Partial review update
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReview {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    pub category: Option<ReviewCategory>,
    pub book_id: Option<Uuid>,
}

impl UpdateReview {
    pub fn apply(&self, review: &mut Review) {
        if let Some(ref title) = self.title {
            review.title = title.trim().to_string();
        }
        if let Some(ref content) = self.content {
            review.content = content.clone();
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(category) = self.category {
            review.category = category;
        }
        if let Some(book_id) = self.book_id {
            review.book_id = Some(book_id);
        }
    }
}

/// Review list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub book_id: Option<Uuid>,
    pub category: Option<ReviewCategory>,
}

impl ReviewQuery {
    pub fn matches(&self, review: &Review) -> bool {
        self.book_id.map_or(true, |id| review.book_id == Some(id))
            && self.category.map_or(true, |c| review.category == c)
    }
}

/// Derived rating fields of a book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i32,
}
