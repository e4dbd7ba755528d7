//! User model and bearer-token claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{error::AppError, policy::Operation};

/// User as mirrored from the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub is_admin: bool,
    /// Advisory counter: pending requests plus unreturned loans
    pub request_count: i32,
}

/// JWT claims supplied by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user_id: i32, username: &str, is_admin: bool, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: user_id.to_string(),
            user_id,
            username: username.to_string(),
            email: None,
            profile_picture: None,
            is_admin,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Check this principal against the central policy table
    pub fn require(&self, operation: Operation) -> Result<(), AppError> {
        operation.authorize(self.is_admin)
    }

    /// Snapshot of the principal as a user row, keeping the given counter
    pub fn to_user(&self, request_count: i32) -> User {
        User {
            id: self.user_id,
            username: self.username.clone(),
            email: self.email.clone(),
            profile_picture: self.profile_picture.clone(),
            is_admin: self.is_admin,
            request_count,
        }
    }
}
