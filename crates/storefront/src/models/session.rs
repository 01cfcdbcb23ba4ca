//! Session-related types.
//!
//! Types stored in the session: the logged-in user identity and the cart.

use serde::{Deserialize, Serialize};

use sprig_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the session cart (items + checkout phase).
    pub const CART: &str = "cart";
}
