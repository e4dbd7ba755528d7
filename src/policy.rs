//! Authorization policy table
//!
//! Every operation exposed over HTTP is listed here exactly once together with
//! the access level it requires. Handlers ask the table instead of carrying
//! their own permission checks.

use serde::Serialize;

use crate::error::AppError;

/// Required access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    /// Anyone, authenticated or not
    Public,
    /// Any authenticated principal
    Authenticated,
    /// Authenticated principal with the admin flag
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    ListBooks,
    ViewBook,
    CreateBook,
    UpdateBook,
    DeleteBook,
    DeleteBooks,
    CreateRequest,
    ListOwnRequests,
    ViewRequest,
    ListAllRequests,
    AcceptRequest,
    RejectRequest,
    DeleteAllRequests,
    ListOwnRecords,
    ViewRecord,
    ListAllRecords,
    ReturnBook,
    ListNotifications,
    ReadNotification,
    DeleteNotification,
}

impl Operation {
    pub const fn access(self) -> Access {
        use Operation::*;
        match self {
            ListBooks | ViewBook => Access::Public,
            CreateBook | UpdateBook | DeleteBook | DeleteBooks => Access::Admin,
            CreateRequest | ListOwnRequests | ViewRequest => Access::Authenticated,
            ListAllRequests | AcceptRequest | RejectRequest | DeleteAllRequests => Access::Admin,
            ListOwnRecords | ViewRecord | ReturnBook => Access::Authenticated,
            ListAllRecords => Access::Admin,
            ListNotifications | ReadNotification | DeleteNotification => Access::Authenticated,
        }
    }

    /// Check a caller that presented no token
    pub fn authorize_anonymous(self) -> Result<(), AppError> {
        match self.access() {
            Access::Public => Ok(()),
            Access::Authenticated | Access::Admin => Err(AppError::Authentication(format!(
                "Authentication required for {:?}",
                self
            ))),
        }
    }

    /// Check an authenticated principal against the table
    pub fn authorize(self, is_admin: bool) -> Result<(), AppError> {
        match self.access() {
            Access::Public | Access::Authenticated => Ok(()),
            Access::Admin if is_admin => Ok(()),
            Access::Admin => Err(AppError::Authorization(format!(
                "Administrator privileges required for {:?}",
                self
            ))),
        }
    }
}
