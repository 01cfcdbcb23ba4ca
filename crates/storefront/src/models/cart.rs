//! Session-scoped shopping cart.
//!
//! The cart lives in the shopper's session for the lifetime of the browser
//! session and is destroyed on explicit clear or successful order completion.
//! Each request deserializes its own copy and writes it back whole, so no
//! two writers ever interleave within a single cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sprig_core::{ProductId, VariantId};

/// Which step of checkout the shopper is on.
///
/// Advanced only by the checkout flow; never rolled back automatically on a
/// failed attempt. A user-driven cart edit returns the shopper to `Cart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CheckoutPhase {
    #[default]
    #[serde(rename = "cart")]
    Cart,
    #[serde(rename = "payment")]
    Payment,
    #[serde(rename = "confirmation-page")]
    ConfirmationPage,
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Product title at the time the item was added.
    pub name: String,
    /// Unit price in major currency units at the time the item was added.
    pub price: Decimal,
    /// Image URL shown in the cart.
    pub image: String,
    /// Always >= 1; a line at quantity 0 is removed instead.
    pub quantity: u32,
}

impl CartItem {
    /// Line total (unit price x quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The session cart: ordered items plus the checkout phase marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    phase: CheckoutPhase,
}

impl Cart {
    /// Create an empty cart in the `Cart` phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            phase: CheckoutPhase::Cart,
        }
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Current checkout phase.
    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of line totals in major currency units.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add an item, merging quantities when the variant is already present.
    ///
    /// Any user-driven cart edit returns the shopper to the `Cart` phase.
    pub fn add(&mut self, item: CartItem) {
        self.phase = CheckoutPhase::Cart;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.variant_id == item.variant_id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Set the quantity for a variant's line. Quantity 0 removes the line.
    pub fn set_quantity(&mut self, variant_id: VariantId, quantity: u32) {
        self.phase = CheckoutPhase::Cart;

        if quantity == 0 {
            self.items.retain(|line| line.variant_id != variant_id);
            return;
        }

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.variant_id == variant_id)
        {
            line.quantity = quantity;
        }
    }

    /// Remove a variant's line entirely.
    pub fn remove(&mut self, variant_id: VariantId) {
        self.phase = CheckoutPhase::Cart;
        self.items.retain(|line| line.variant_id != variant_id);
    }

    /// Discard all items and return to the `Cart` phase.
    pub fn clear(&mut self) {
        self.items.clear();
        self.phase = CheckoutPhase::Cart;
    }

    /// Enter the payment step.
    pub fn begin_payment(&mut self) {
        self.phase = CheckoutPhase::Payment;
    }

    /// Complete checkout: discard all items and land on the confirmation page.
    ///
    /// Called by the checkout flow if and only if order recording succeeded.
    pub fn complete(&mut self) {
        self.items.clear();
        self.phase = CheckoutPhase::ConfirmationPage;
    }

    /// Take a read-only snapshot of the cart for a checkout attempt.
    ///
    /// The snapshot is what the payment intent and order record are built
    /// from; it does not change if the live cart is edited mid-flow.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            total: self.subtotal(),
        }
    }
}

/// An immutable projection of the cart taken at intent-creation time.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    items: Vec<CartItem>,
    total: Decimal,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Derived total: sum of unit price x quantity over all lines.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(variant: i32, price: Decimal, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(1),
            variant_id: VariantId::new(variant),
            name: format!("Item {variant}"),
            price,
            image: "/static/images/placeholder.png".to_string(),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_variant() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 2));
        cart.add(item(10, Decimal::new(2500, 2), 1));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn test_add_keeps_distinct_variants_ordered() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 1));
        cart.add(item(11, Decimal::new(1000, 2), 1));

        let variants: Vec<i32> = cart
            .items()
            .iter()
            .map(|line| line.variant_id.as_i32())
            .collect();
        assert_eq!(variants, vec![10, 11]);
    }

    #[test]
    fn test_subtotal_is_price_times_quantity() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 2));
        cart.add(item(11, Decimal::new(999, 2), 3));

        // 50.00 + 29.97
        assert_eq!(cart.subtotal(), Decimal::new(7997, 2));
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 2));
        cart.set_quantity(VariantId::new(10), 0);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_edit_returns_to_cart_phase() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 1));
        cart.begin_payment();
        assert_eq!(cart.phase(), CheckoutPhase::Payment);

        cart.add(item(11, Decimal::new(1000, 2), 1));
        assert_eq!(cart.phase(), CheckoutPhase::Cart);
    }

    #[test]
    fn test_complete_clears_and_lands_on_confirmation() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 2));
        cart.begin_payment();
        cart.complete();

        assert!(cart.is_empty());
        assert_eq!(cart.phase(), CheckoutPhase::ConfirmationPage);
    }

    #[test]
    fn test_snapshot_does_not_track_later_edits() {
        let mut cart = Cart::new();
        cart.add(item(10, Decimal::new(2500, 2), 2));

        let snapshot = cart.snapshot();
        cart.add(item(11, Decimal::new(1000, 2), 5));

        assert_eq!(snapshot.items().len(), 1);
        assert_eq!(snapshot.total(), Decimal::new(5000, 2));
    }

    #[test]
    fn test_phase_serde_values() {
        let json = serde_json::to_string(&CheckoutPhase::ConfirmationPage).unwrap();
        assert_eq!(json, "\"confirmation-page\"");
        let json = serde_json::to_string(&CheckoutPhase::Cart).unwrap();
        assert_eq!(json, "\"cart\"");
    }
}
