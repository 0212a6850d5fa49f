//! Domain types and models

pub mod cart;
pub mod order;
pub mod terminal;

pub use cart::{CartLine, ProductRef, VariantRef};
pub use order::{
    CreateOrderRequest, CreatedOrder, Menu, MenuCategory, MenuProduct, MenuVariant,
    OrderConfirmation, OrderItem, OrderType, PaymentMethod, PendingTerminalTransaction,
};
pub use terminal::{ConnectedReader, DiscoveredReader, PaymentOutcome, TerminalStatus};
