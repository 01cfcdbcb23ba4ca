//! User repository.

use sqlx::PgPool;

use sprig_core::Email;

use super::RepositoryError;
use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, email_verified, role";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user and their password hash for login verification.
    ///
    /// Returns `None` when the email is unknown or the account has no
    /// password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHash>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.and_then(|row| {
            let hash = row.password_hash?;
            Some((
                User {
                    id: row.id,
                    email: row.email,
                    email_verified: row.email_verified,
                    role: row.role,
                },
                hash,
            ))
        }))
    }

    /// Create a new user with email and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(user)
    }

    /// Mark an email address as verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_email_verified(&self, email: &Email) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

/// Row shape for login queries; the hash never leaves this module.
#[derive(sqlx::FromRow)]
struct UserWithHash {
    id: sprig_core::UserId,
    email: Email,
    email_verified: bool,
    role: sprig_core::UserRole,
    password_hash: Option<String>,
}
