//! Promotional banner model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Banner record. At most one banner is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create banner request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBanner {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Image URL is required"))]
    pub image_url: String,
    /// Activating on creation deactivates every other banner
    pub active: Option<bool>,
}

/// Partial banner update
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBanner {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[validate(length(min = 1, message = "Image URL cannot be empty"))]
    pub image_url: Option<String>,
    pub active: Option<bool>,
}

impl UpdateBanner {
    pub fn apply(&self, banner: &mut Banner) {
        if let Some(ref title) = self.title {
            banner.title = title.clone();
        }
        if let Some(ref subtitle) = self.subtitle {
            banner.subtitle = Some(subtitle.clone());
        }
        if let Some(ref image_url) = self.image_url {
            banner.image_url = image_url.clone();
        }
        if let Some(active) = self.active {
            banner.active = active;
        }
    }
}
