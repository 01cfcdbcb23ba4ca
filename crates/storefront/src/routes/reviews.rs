//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use sprig_core::ProductId;

use crate::db::products::ProductRepository;
use crate::db::reviews::ReviewRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: i16,
    pub comment: String,
}

/// Create a review for a product. Requires a signed-in user.
#[instrument(skip(state, user, form), fields(product = id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, AppError> {
    if !(1..=5).contains(&form.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let comment = form.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("comment cannot be empty".to_string()));
    }

    let product_id = ProductId::new(id);

    // 404 rather than a constraint error for unknown products
    ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    ReviewRepository::new(state.pool())
        .create(user.id, product_id, form.rating, comment)
        .await?;

    Ok(Redirect::to(&format!("/products/{id}")))
}
