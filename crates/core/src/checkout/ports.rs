//! Port interfaces for order submission
//!
//! These traits define the boundaries between the submission coordinator
//! and the backend / persistence adapters in `tillpoint-infra`.

use async_trait::async_trait;
use tillpoint_domain::{
    CreateOrderRequest, CreatedOrder, OrderConfirmation, PendingTerminalTransaction, Result,
};

/// Backend order operations consumed by this subsystem. The full order
/// lifecycle is the backend's concern.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Create a pending order; returns ids and, for card payments, the
    /// client secret authorizing the charge.
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder>;

    /// Record settlement of a reader-collected charge against the order.
    async fn confirm_terminal_payment(&self, order_id: i64) -> Result<OrderConfirmation>;

    /// Record settlement of a manually-entered card charge.
    async fn confirm_manual_payment(&self, order_id: i64) -> Result<OrderConfirmation>;

    /// Compensating cancel for an order whose payment was abandoned.
    async fn cancel_order(&self, order_id: i64) -> Result<()>;
}

/// Single-slot durable record of an in-flight terminal transaction.
///
/// Write-then-act: the record must be durable before the reader collection
/// begins. Act-then-clear: it is removed only after backend confirmation.
/// The store itself never auto-clears.
#[async_trait]
pub trait PendingTransactionStore: Send + Sync {
    /// Create-or-replace the slot.
    async fn write(&self, record: &PendingTerminalTransaction) -> Result<()>;

    /// Read the slot, if occupied.
    async fn read(&self) -> Result<Option<PendingTerminalTransaction>>;

    /// Empty the slot.
    async fn clear(&self) -> Result<()>;
}
