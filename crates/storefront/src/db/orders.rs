//! Order repository.
//!
//! Persists the order written by the checkout flow: one `orders` row plus its
//! `order_products` lines, in a single transaction. This is the flow's order
//! recorder: it does not retry on failure and it never touches the payment.

use sqlx::PgPool;
use tracing::instrument;

use sprig_core::OrderId;

use super::RepositoryError;
use crate::checkout::{NewOrder, OrderRecorder, RecordError};

/// Repository for order writes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one order with its product lines.
    ///
    /// Referential integrity (product and variant existence) is enforced by
    /// the database, not checked here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction rolls back and no partial order remains.
    #[instrument(skip_all, fields(intent = %order.payment_intent_id, lines = order.lines.len()))]
    pub async fn insert(&self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (order_id,): (OrderId,) = sqlx::query_as(
            r"
            INSERT INTO orders (user_id, status, total, payment_intent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.total)
        .bind(&order.payment_intent_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r"
                INSERT INTO order_products (order_id, product_id, variant_id, quantity)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.variant_id)
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order_id)
    }
}

impl OrderRecorder for OrderRepository<'_> {
    async fn record(&self, order: &NewOrder) -> Result<OrderId, RecordError> {
        self.insert(order)
            .await
            .map_err(|e| RecordError(e.to_string()))
    }
}
