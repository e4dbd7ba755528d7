//! Data models for Booklend

pub mod book;
pub mod enums;
pub mod notification;
pub mod record;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use enums::{NotificationCategory, RequestStatus};
pub use notification::Notification;
pub use record::{BorrowingRecord, ReturnTiming};
pub use request::BorrowRequest;
pub use user::{User, UserClaims};
