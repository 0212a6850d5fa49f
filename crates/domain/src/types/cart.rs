//! Cart line types
//!
//! The cart itself lives in `tillpoint-core`; these are the pure data
//! carriers it aggregates.

use serde::{Deserialize, Serialize};

/// Reference to a catalog product, as the selling UI sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: i64,
    pub name: String,
}

/// Reference to a sellable variant of a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRef {
    pub id: i64,
    pub name: String,
    pub unit_price_cents: i64,
}

/// A single line in the cart.
///
/// `line_id` is derived from the variant id plus a uniqueness token so the
/// same variant added again after a prior instance settled never collides
/// with a stale id held elsewhere (e.g. the keyboard cursor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: String,
    pub product: ProductRef,
    pub variant: VariantRef,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartLine {
    /// Line subtotal in cents
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}
