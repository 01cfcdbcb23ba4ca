//! Email verification tokens.
//!
//! One active token per email address: generating a new token replaces any
//! existing one. Tokens expire after one hour and are single-use.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use sprig_core::Email;

use super::RepositoryError;

/// Token lifetime.
const TOKEN_TTL_HOURS: i64 = 1;

/// A pending email verification token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailToken {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Repository for email verification tokens.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Generate a fresh verification token for an email address.
    ///
    /// Any existing token for the address is discarded first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn generate(&self, email: &Email) -> Result<EmailToken, RepositoryError> {
        let token = Uuid::new_v4().to_string();
        let expires = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM email_tokens WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        let stored = sqlx::query_as::<_, EmailToken>(
            r"
            INSERT INTO email_tokens (email, token, expires)
            VALUES ($1, $2, $3)
            RETURNING token, expires
            ",
        )
        .bind(email)
        .bind(&token)
        .bind(expires)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }

    /// Consume a token, returning the email it verifies.
    ///
    /// Deletes the token; returns `None` when the token is unknown or
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, token: &str) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            r"
            DELETE FROM email_tokens
            WHERE token = $1
            RETURNING email, expires
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.and_then(|(email, expires)| (expires > Utc::now()).then_some(email)))
    }
}
