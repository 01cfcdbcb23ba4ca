//! User account model.

use sqlx::FromRow;

use sprig_core::{Email, UserId, UserRole};

/// A registered storefront user.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub email_verified: bool,
    pub role: UserRole,
}
