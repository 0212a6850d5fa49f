//! Cart aggregation model - pure state, no I/O
//!
//! The cart is owned exclusively by the POS session and mutated only
//! through these operations, so keyboard and pointer affordances can never
//! diverge. It is deliberately not persisted: an abandoned cart is simply
//! lost, only the payment side needs crash recovery.

use tillpoint_domain::{CartLine, ProductRef, VariantRef};
use uuid::Uuid;

/// Ordered collection of cart lines with derived totals
#[derive(Debug, Default)]
pub struct CartModel {
    lines: Vec<CartLine>,
    last_touched: Option<String>,
}

impl CartModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a variant.
    ///
    /// Idempotent-additive: if the variant is already in the cart its
    /// quantity is incremented instead of creating a duplicate line.
    /// Returns the id of the touched line.
    pub fn add(&mut self, product: &ProductRef, variant: &VariantRef) -> String {
        if let Some(line) = self.lines.iter_mut().find(|l| l.variant.id == variant.id) {
            line.quantity += 1;
            let line_id = line.line_id.clone();
            self.last_touched = Some(line_id.clone());
            return line_id;
        }

        let line_id = format!("{}-{}", variant.id, Uuid::new_v4());
        self.lines.push(CartLine {
            line_id: line_id.clone(),
            product: product.clone(),
            variant: variant.clone(),
            unit_price_cents: variant.unit_price_cents,
            quantity: 1,
        });
        self.last_touched = Some(line_id.clone());
        line_id
    }

    /// Adjust a line's quantity by `delta`, removing the line if the
    /// result drops to zero or below. A line is never kept with
    /// quantity < 1.
    pub fn set_quantity_delta(&mut self, line_id: &str, delta: i64) {
        let Some(index) = self.lines.iter().position(|l| l.line_id == line_id) else {
            return;
        };

        let line = &mut self.lines[index];
        line.quantity += delta;
        if line.quantity <= 0 {
            self.lines.remove(index);
            if self.last_touched.as_deref() == Some(line_id) {
                self.last_touched = None;
            }
        } else {
            self.last_touched = Some(line_id.to_string());
        }
    }

    /// Remove a line outright
    pub fn remove(&mut self, line_id: &str) {
        self.lines.retain(|l| l.line_id != line_id);
        if self.last_touched.as_deref() == Some(line_id) {
            self.last_touched = None;
        }
    }

    /// Empty the cart. Called on successful settlement or explicit
    /// operator action.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.last_touched = None;
    }

    /// Cart total in cents, recomputed fresh from the lines
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(CartLine::subtotal_cents).sum()
    }

    /// Total unit count across all lines
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// The most recently touched line, used as the quick-action cursor
    /// default
    pub fn last_touched_line(&self) -> Option<&str> {
        self.last_touched.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ProductRef {
        ProductRef { id: 1, name: "Hoodie".into() }
    }

    fn variant(id: i64, price: i64) -> VariantRef {
        VariantRef { id, name: format!("variant-{id}"), unit_price_cents: price }
    }

    #[test]
    fn repeated_adds_increment_a_single_line() {
        let mut cart = CartModel::new();
        let v = variant(10, 2500);

        for _ in 0..4 {
            cart.add(&product(), &v);
        }

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 4);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn distinct_variants_get_distinct_lines() {
        let mut cart = CartModel::new();
        cart.add(&product(), &variant(10, 2500));
        cart.add(&product(), &variant(11, 1500));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_cents(), 4000);
    }

    #[test]
    fn quantity_never_drops_below_one() {
        let mut cart = CartModel::new();
        let line_id = cart.add(&product(), &variant(10, 2500));
        cart.set_quantity_delta(&line_id, 1); // quantity 2

        cart.set_quantity_delta(&line_id, -1);
        assert_eq!(cart.line(&line_id).unwrap().quantity, 1);

        // Dropping to zero removes the line entirely
        cart.set_quantity_delta(&line_id, -1);
        assert!(cart.line(&line_id).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn large_negative_delta_removes_line() {
        let mut cart = CartModel::new();
        let line_id = cart.add(&product(), &variant(10, 2500));
        cart.set_quantity_delta(&line_id, -100);
        assert!(cart.is_empty());
    }

    #[test]
    fn total_matches_sum_of_lines() {
        let mut cart = CartModel::new();
        let a = cart.add(&product(), &variant(10, 2500));
        cart.add(&product(), &variant(11, 300));
        cart.set_quantity_delta(&a, 2); // 3 x 2500

        assert_eq!(cart.total_cents(), 3 * 2500 + 300);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn same_variant_after_clear_gets_a_fresh_line_id() {
        let mut cart = CartModel::new();
        let v = variant(10, 2500);
        let first = cart.add(&product(), &v);
        cart.clear();
        let second = cart.add(&product(), &v);
        assert_ne!(first, second);
    }

    #[test]
    fn last_touched_tracks_mutations() {
        let mut cart = CartModel::new();
        let a = cart.add(&product(), &variant(10, 2500));
        let b = cart.add(&product(), &variant(11, 1500));
        assert_eq!(cart.last_touched_line(), Some(b.as_str()));

        cart.set_quantity_delta(&a, 1);
        assert_eq!(cart.last_touched_line(), Some(a.as_str()));

        cart.remove(&a);
        assert_eq!(cart.last_touched_line(), None);
    }
}
