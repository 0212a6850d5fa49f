//! Port interfaces for the card-reader capability
//!
//! These traits define the boundary between the session state machine and
//! the vendor SDK adapter. The SDK's internal Bluetooth/network protocol
//! with the physical reader is opaque to this crate.

use async_trait::async_trait;
use tillpoint_domain::{DiscoveredReader, PaymentOutcome, Result};
use tokio::sync::mpsc;

/// Emitted by the transport when the SDK drops the reader connection
/// outside of any operation this crate initiated.
#[derive(Debug, Clone)]
pub struct UnexpectedDisconnect {
    pub reason: String,
}

/// How a collect prompt ended: the card was presented, or the prompt was
/// cancelled before presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Collected,
    Cancelled,
}

/// Fetches connection tokens that authorize the SDK against the backend.
///
/// Consumed by the vendor-SDK [`ReaderTransport`] adapter, which hands
/// each token to the SDK's token-refresh callback. Injected into that
/// adapter by the host application; the session manager never hardcodes
/// token retrieval.
#[async_trait]
pub trait ConnectionTokenProvider: Send + Sync {
    async fn connection_token(&self) -> Result<String>;
}

/// The card-reader capability: discover, connect, collect, process,
/// cancel, disconnect, clear credentials.
///
/// An authorization payment is driven in two suspension steps so the
/// session manager can surface `collecting_payment` and
/// `processing_payment` as distinct statuses.
#[async_trait]
pub trait ReaderTransport: Send + Sync {
    /// Load the SDK and register its callbacks. Returns the stream of
    /// unexpected-disconnect events; the channel closing means the
    /// transport was torn down.
    async fn initialize(&self) -> Result<mpsc::UnboundedReceiver<UnexpectedDisconnect>>;

    /// Discover nearby readers. An empty list is a valid result, not an
    /// error.
    async fn discover(&self) -> Result<Vec<DiscoveredReader>>;

    /// Pair with a reader found during discovery.
    async fn connect(&self, reader: &DiscoveredReader) -> Result<()>;

    /// Present the payment prompt for the given client secret and wait for
    /// card presentation or cancellation.
    async fn collect(&self, client_secret: &str) -> Result<CollectOutcome>;

    /// Process the collected payment through to an outcome.
    async fn process(&self) -> Result<PaymentOutcome>;

    /// Cancel an in-progress collect prompt.
    async fn cancel_collect(&self) -> Result<()>;

    /// Disconnect from the current reader.
    async fn disconnect(&self) -> Result<()>;

    /// Drop cached connection credentials. Used to recover from
    /// token-already-redeemed and reader hot-swap conditions.
    async fn clear_cached_credentials(&self) -> Result<()>;
}
