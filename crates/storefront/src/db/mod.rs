//! Database operations for the storefront `PostgreSQL` instance.
//!
//! # Tables
//!
//! - `users` - Site accounts (email/password)
//! - `tower_sessions.session` - Session storage
//! - `email_tokens` - Email verification tokens
//! - `products`, `product_variants`, `variant_images`, `variant_tags` - Catalog
//! - `reviews` - Product reviews
//! - `orders`, `order_products` - Placed orders
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sprig-cli -- migrate
//! ```
//! They are never run on server startup.

pub mod orders;
pub mod products;
pub mod reviews;
pub mod tokens;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or referential constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value failed to parse into its domain type.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
