//! Product review models.

use sqlx::FromRow;

/// A review joined with its author's email for display.
#[derive(Debug, Clone, FromRow)]
pub struct ReviewWithAuthor {
    pub rating: i16,
    pub comment: String,
    pub author_email: String,
}
