//! Order and menu types exchanged with the backend
//!
//! The backend owns the full order lifecycle; this subsystem only needs the
//! creation request, the client secret for card payments, and the
//! settlement confirmation payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the operator is taking payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    TerminalCard,
    ManualCard,
}

/// Fulfilment type for the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Pickup,
    Shipping,
}

impl OrderType {
    /// The other fulfilment type, used by the toggle shortcut
    pub fn toggled(self) -> Self {
        match self {
            Self::Pickup => Self::Shipping,
            Self::Shipping => Self::Pickup,
        }
    }
}

/// One item of an order-creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_variant_id: i64,
    pub quantity: i64,
}

/// Request body for `POST /admin/pos/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub location_id: i64,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_received_cents: Option<i64>,
}

/// Response from order creation. `client_secret` is only present for card
/// payment methods; its absence there is a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: i64,
    pub order_number: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Settlement confirmation payload returned by the confirm endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub total_formatted: String,
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub card_last4: Option<String>,
}

/// Durable single-slot marker for an in-flight terminal payment.
///
/// Written the instant an order is created and a client secret is about to
/// be handed to the reader; cleared only on confirmed settlement or an
/// explicit operator action. Its whole purpose is to make an interrupted
/// transaction visible after a crash instead of silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTerminalTransaction {
    pub order_id: i64,
    pub order_number: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Menu payload for the selling UI (`GET /admin/pos/menu`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub categories: Vec<MenuCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuCategory {
    pub id: i64,
    pub name: String,
    pub products: Vec<MenuProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuProduct {
    pub id: i64,
    pub name: String,
    pub variants: Vec<MenuVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuVariant {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
}
