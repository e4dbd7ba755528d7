//! Booklend library lending server
//!
//! REST JSON API over a book catalog with a borrow-request workflow:
//! members ask for a book, administrators accept or reject, accepted requests
//! become loans, and returns put the copy back on the shelf. Every workflow
//! step updates inventory, loans and notifications in one unit of work.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services over a repository
    pub fn new(config: AppConfig, repository: Arc<dyn repository::Repository>) -> Self {
        let services = services::Services::new(repository, &config.library);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
