//! Borrowing record (granted loan) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::NotificationCategory;

/// Record of a granted loan with due/return tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: String,
    /// Accepted request this loan was granted from
    pub request_id: Option<i32>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl BorrowingRecord {
    pub fn is_active(&self) -> bool {
        !self.is_returned
    }
}

/// Row to insert for a new loan
#[derive(Debug, Clone)]
pub struct NewBorrowingRecord {
    pub user_id: i32,
    pub book_id: String,
    pub request_id: Option<i32>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// How a return compares to the due date, in whole calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnTiming {
    Overdue(i64),
    Early(i64),
    OnTime,
}

impl ReturnTiming {
    pub fn between(due_date: DateTime<Utc>, return_date: DateTime<Utc>) -> Self {
        let delta = (return_date.date_naive() - due_date.date_naive()).num_days();
        match delta {
            d if d > 0 => ReturnTiming::Overdue(d),
            d if d < 0 => ReturnTiming::Early(-d),
            _ => ReturnTiming::OnTime,
        }
    }

    pub fn category(&self) -> NotificationCategory {
        match self {
            ReturnTiming::Overdue(_) => NotificationCategory::Overdue,
            ReturnTiming::Early(_) => NotificationCategory::Early,
            ReturnTiming::OnTime => NotificationCategory::OnTime,
        }
    }

    /// Notification text for the borrower
    pub fn describe(&self, title: &str) -> String {
        match self {
            ReturnTiming::Overdue(days) => {
                format!("You returned '{}' {} overdue.", title, plural_days(*days))
            }
            ReturnTiming::Early(days) => {
                format!("You returned '{}' {} in advance.", title, plural_days(*days))
            }
            ReturnTiming::OnTime => format!("You returned '{}' on the due date.", title),
        }
    }
}

fn plural_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

/// Records list response
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordsList {
    pub total: i64,
    pub records: Vec<BorrowingRecord>,
}
