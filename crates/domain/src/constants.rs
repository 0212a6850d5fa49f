//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Post-charge confirmation policy. The fixed 1-second delay is deliberate:
// the card has already been charged, so the priority is fast operator
// feedback, not exponential backoff. Changing either value changes the
// user-visible failure threshold.
pub const CONFIRMATION_MAX_ATTEMPTS: usize = 3;
pub const CONFIRMATION_RETRY_DELAY_MS: u64 = 1000;

// Single-slot storage key for the in-flight terminal transaction marker
pub const PENDING_TRANSACTION_SLOT: &str = "terminal.pending_transaction";

// Quantity nudge applied by the bulk-add keyboard shortcut
pub const BULK_QUANTITY_STEP: i64 = 5;
