//! Card-terminal session types

use serde::{Deserialize, Serialize};

/// Terminal session status.
///
/// Exactly one status value is live at a time; the session manager's
/// transition function is the only way to change it. `Connected` is the
/// steady state between transactions, not a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    NotInitialized,
    Initializing,
    Initialized,
    Discovering,
    Connecting,
    Connected,
    CollectingPayment,
    ProcessingPayment,
    Disconnected,
    Error,
}

/// A reader found during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredReader {
    pub id: String,
    pub label: String,
    pub serial_number: String,
    pub device_type: String,
}

/// The reader the session manager is currently paired with.
///
/// Held exclusively by the session manager; other components query the
/// manager instead of caching this, because the SDK can drop the
/// connection asynchronously at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedReader {
    pub id: String,
    pub label: String,
    pub serial_number: String,
    pub device_type: String,
}

impl From<DiscoveredReader> for ConnectedReader {
    fn from(reader: DiscoveredReader) -> Self {
        Self {
            id: reader.id,
            label: reader.label,
            serial_number: reader.serial_number,
            device_type: reader.device_type,
        }
    }
}

/// Outcome of driving a payment through the reader.
///
/// `Declined` and `Cancelled` are operator-facing conditions, not errors:
/// the session returns to `Connected` so the prompt can be retried without
/// re-pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved {
        #[serde(default)]
        card_brand: Option<String>,
        #[serde(default)]
        card_last4: Option<String>,
    },
    Declined {
        message: String,
    },
    Cancelled,
}
