//! Catalog repository.
//!
//! Read-only access to products, variants, images, and tags. Queries use the
//! runtime `query_as` API with bound parameters.

use sqlx::PgPool;

use sprig_core::{ProductId, VariantId};

use super::RepositoryError;
use crate::models::product::{Product, ProductVariant, VariantImage, VariantTag};

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, description, price
            FROM products
            ORDER BY created DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// List the `limit` newest products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_newest(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, description, price
            FROM products
            ORDER BY created DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, description, price
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// List a product's variants, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r"
            SELECT id, color, product_type
            FROM product_variants
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(variants)
    }

    /// List the images for a set of variants, in gallery order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<Vec<VariantImage>, RepositoryError> {
        let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();

        let images = sqlx::query_as::<_, VariantImage>(
            r"
            SELECT variant_id, url
            FROM variant_images
            WHERE variant_id = ANY($1)
            ORDER BY variant_id, position
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(images)
    }

    /// List the tags for a set of variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags_for(
        &self,
        variant_ids: &[VariantId],
    ) -> Result<Vec<VariantTag>, RepositoryError> {
        let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();

        let tags = sqlx::query_as::<_, VariantTag>(
            r"
            SELECT variant_id, tag
            FROM variant_tags
            WHERE variant_id = ANY($1)
            ORDER BY variant_id, id
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// First gallery image per product, for listing pages.
    ///
    /// Returns `(product_id, url)` pairs; products with no images are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_images(&self) -> Result<Vec<(ProductId, String)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (ProductId, String)>(
            r"
            SELECT DISTINCT ON (pv.product_id) pv.product_id, vi.url
            FROM variant_images vi
            JOIN product_variants pv ON pv.id = vi.variant_id
            ORDER BY pv.product_id, vi.position, vi.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
