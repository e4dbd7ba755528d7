//! Book (catalog entry) model and related types

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record with its copy counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Catalog identifier (`BK` + year + 4 digits)
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub publication_year: Option<i32>,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    /// Total owned copies
    pub quantity: i32,
    /// Copies currently loanable
    pub available_quantity: i32,
    pub date_added: NaiveDate,
}

impl Book {
    /// Number of copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.quantity - self.available_quantity
    }

    pub fn has_valid_counters(&self) -> bool {
        self.quantity >= 0 && self.available_quantity >= 0 && self.available_quantity <= self.quantity
    }
}

/// Build a catalog identifier for a book added at `now`
pub fn generate_book_id(now: DateTime<Utc>, suffix: u16) -> String {
    format!("BK{:02}{:04}", now.year() % 100, suffix % 10_000)
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    pub publication_year: Option<i32>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

/// Partial book update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    pub publication_year: Option<i32>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    /// New total of owned copies; availability shifts by the same delta
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
}

/// Book list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Substring match on title or author (case-insensitive)
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    /// Returns (limit, offset) with page defaulting to 1 and per_page to 50
    pub fn limits(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(50).clamp(1, 500);
        (per_page, (page - 1) * per_page)
    }
}

/// Bulk delete body
#[derive(Debug, Deserialize, ToSchema)]
pub struct BookIds {
    pub book_ids: Vec<String>,
}
