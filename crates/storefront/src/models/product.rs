//! Catalog models.
//!
//! Row shapes for the columns the storefront actually renders; the tables
//! carry more (upload size, timestamps) for the admin tooling to come.

use rust_decimal::Decimal;
use sqlx::FromRow;

use sprig_core::{ProductId, VariantId};

/// A catalog product.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    /// Unit price in major currency units.
    pub price: Decimal,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, FromRow)]
pub struct ProductVariant {
    pub id: VariantId,
    pub color: String,
    pub product_type: String,
}

/// An image attached to a variant.
#[derive(Debug, Clone, FromRow)]
pub struct VariantImage {
    pub variant_id: VariantId,
    pub url: String,
}

/// A search/filter tag attached to a variant.
#[derive(Debug, Clone, FromRow)]
pub struct VariantTag {
    pub variant_id: VariantId,
    pub tag: String,
}
