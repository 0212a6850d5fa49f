//! # Tillpoint Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The cart aggregation model
//! - The terminal session state machine
//! - The order submission coordinator
//! - The keyboard quick-action dispatcher
//! - Port/adapter interfaces (traits) for the backend and the reader SDK
//!
//! ## Architecture Principles
//! - Only depends on `tillpoint-domain`
//! - No database, HTTP, or vendor SDK code
//! - All external collaborators behind traits
//! - Pure, testable business logic

pub mod cart;
pub mod checkout;
pub mod keymap;
pub mod terminal;

// Re-export specific items to avoid ambiguity
pub use cart::CartModel;
pub use checkout::ports::{OrderGateway, PendingTransactionStore};
pub use checkout::{
    CheckoutContext, ConfirmationPolicy, ManualCardIntent, OrderSubmissionCoordinator,
    RecoveryResolution, SubmissionOutcome,
};
pub use keymap::{DispatchGuards, FocusContext, Key, KeyEvent, QuickAction, QuickActionDispatcher};
pub use terminal::ports::{ConnectionTokenProvider, ReaderTransport};
pub use terminal::TerminalSessionManager;
