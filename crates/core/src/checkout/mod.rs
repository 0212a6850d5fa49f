//! Order submission coordinator
//!
//! Orchestrates a checkout end to end: create a pending order on the
//! backend, drive the terminal (or manual) payment, confirm settlement
//! with bounded retry, and keep the crash-recovery slot consistent with
//! the write-then-act / act-then-clear ordering.

pub mod ports;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tillpoint_domain::constants::{CONFIRMATION_MAX_ATTEMPTS, CONFIRMATION_RETRY_DELAY_MS};
use tillpoint_domain::{
    CreateOrderRequest, OrderConfirmation, OrderItem, OrderType, PaymentMethod, PaymentOutcome,
    PendingTerminalTransaction, PosError, Result,
};
use tracing::{error, info, instrument, warn};

use self::ports::{OrderGateway, PendingTransactionStore};
use crate::cart::CartModel;
use crate::terminal::TerminalSessionManager;

/// Customer/location context for the order being built
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    pub customer_name: String,
    pub order_type: OrderType,
    pub location_id: i64,
}

/// Post-charge confirmation retry policy.
///
/// Fixed delay on purpose: the charge already happened, so the priority is
/// fast operator feedback. Tests shrink the delay; production keeps the
/// 3 x 1 s bound.
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: CONFIRMATION_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(CONFIRMATION_RETRY_DELAY_MS),
        }
    }
}

/// How a submission ended, beyond hard errors
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Payment captured and recorded; cart and pending slot are cleared.
    Settled(OrderConfirmation),
    /// The reader definitively declined; nothing was charged.
    Declined { message: String },
    /// The prompt was cancelled; the pending slot is kept because the
    /// reader may already have captured the card.
    Cancelled,
    /// The card was charged but every confirmation attempt failed.
    /// Reconcile manually against this order; the charge is never retried.
    RequiresReconciliation { order_id: i64, order_number: String },
}

/// An order awaiting manually-entered card details
#[derive(Debug, Clone)]
pub struct ManualCardIntent {
    pub order_id: i64,
    pub order_number: String,
    pub client_secret: String,
}

/// Operator's choice when an interrupted terminal session is detected at
/// start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryResolution {
    /// Cancel the reader's pending prompt and clear the slot.
    CancelReaderPrompt,
    /// Keep the slot; the notice can be raised again.
    Dismiss,
}

/// Coordinates cart, backend, terminal, and the crash-recovery slot.
///
/// Only one submission may be in flight at a time, across every payment
/// method and input affordance.
pub struct OrderSubmissionCoordinator {
    orders: Arc<dyn OrderGateway>,
    pending: Arc<dyn PendingTransactionStore>,
    terminal: Arc<TerminalSessionManager>,
    cart: Arc<Mutex<CartModel>>,
    policy: ConfirmationPolicy,
    in_flight: AtomicBool,
    manual: Mutex<Option<ManualCardIntent>>,
}

impl OrderSubmissionCoordinator {
    pub fn new(
        orders: Arc<dyn OrderGateway>,
        pending: Arc<dyn PendingTransactionStore>,
        terminal: Arc<TerminalSessionManager>,
        cart: Arc<Mutex<CartModel>>,
    ) -> Self {
        Self {
            orders,
            pending,
            terminal,
            cart,
            policy: ConfirmationPolicy::default(),
            in_flight: AtomicBool::new(false),
            manual: Mutex::new(None),
        }
    }

    /// Override the confirmation retry policy (tests shrink the delay)
    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Guard shared by the payment buttons and their keyboard shortcuts
    pub fn is_submission_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Cash checkout: validates the received amount, creates the order,
    /// and settles immediately.
    #[instrument(skip(self, context))]
    pub async fn submit_cash(
        &self,
        context: &CheckoutContext,
        cash_received_cents: i64,
    ) -> Result<SubmissionOutcome> {
        let _guard = self.begin_submission()?;
        let (items, total_cents) = self.snapshot_cart()?;

        if cash_received_cents < total_cents {
            return Err(PosError::InvalidInput(format!(
                "cash received ({cash_received_cents}) is less than the total ({total_cents})"
            )));
        }

        let request = build_request(context, PaymentMethod::Cash, items, Some(cash_received_cents));
        let order = self.orders.create_order(&request).await?;

        info!(
            order_number = %order.order_number,
            change_due = change_due_cents(total_cents, cash_received_cents),
            "cash order settled"
        );
        self.clear_cart();
        Ok(SubmissionOutcome::Settled(OrderConfirmation {
            order_number: order.order_number,
            total_formatted: format_cents(total_cents),
            card_brand: None,
            card_last4: None,
        }))
    }

    /// Card-present checkout through the terminal.
    #[instrument(skip(self, context))]
    pub async fn submit_terminal_card(
        &self,
        context: &CheckoutContext,
    ) -> Result<SubmissionOutcome> {
        let _guard = self.begin_submission()?;
        let (items, total_cents) = self.snapshot_cart()?;

        if self.pending.read().await?.is_some() {
            return Err(PosError::Busy(
                "a terminal transaction is already pending; resolve it first".into(),
            ));
        }

        let request = build_request(context, PaymentMethod::TerminalCard, items, None);
        let order = self.orders.create_order(&request).await?;

        let client_secret = order.client_secret.clone().ok_or_else(|| {
            PosError::Config(format!(
                "order {} response is missing the payment client secret",
                order.order_number
            ))
        })?;

        // Write-then-act: the slot must be durable before the reader sees
        // the secret, so a crash in between is detectable at restart.
        self.pending
            .write(&PendingTerminalTransaction {
                order_id: order.id,
                order_number: order.order_number.clone(),
                amount_cents: total_cents,
                created_at: Utc::now(),
            })
            .await?;

        let outcome = match self.terminal.collect(&client_secret).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Ambiguous failure: keep the slot so the interruption
                // stays visible.
                warn!(order_number = %order.order_number, error = %err, "terminal collection failed");
                return Err(err);
            }
        };

        match outcome {
            PaymentOutcome::Approved { card_brand, card_last4 } => {
                info!(
                    order_number = %order.order_number,
                    brand = card_brand.as_deref().unwrap_or("unknown"),
                    last4 = card_last4.as_deref().unwrap_or(""),
                    "terminal payment approved"
                );
                match self.confirm_with_retry(order.id, PaymentMethod::TerminalCard).await {
                    Some(confirmation) => {
                        // Act-then-clear: the slot outlives the charge
                        // until the backend has acknowledged it.
                        self.clear_cart();
                        self.pending.clear().await?;
                        Ok(SubmissionOutcome::Settled(confirmation))
                    }
                    None => {
                        error!(
                            order_id = order.id,
                            order_number = %order.order_number,
                            "charged but unconfirmed after {} attempts; reconcile manually",
                            self.policy.max_attempts
                        );
                        Ok(SubmissionOutcome::RequiresReconciliation {
                            order_id: order.id,
                            order_number: order.order_number,
                        })
                    }
                }
            }
            PaymentOutcome::Declined { message } => {
                // The slot is otherwise cleared only on confirmed settlement
                // or an explicit operator resolution. A decline is the one
                // exception: the reader asserts no charge exists, and a slot
                // left behind would block the retry.
                info!(order_number = %order.order_number, %message, "terminal payment declined");
                self.pending.clear().await?;
                Ok(SubmissionOutcome::Declined { message })
            }
            PaymentOutcome::Cancelled => {
                // An operator cancel can race a reader that already
                // captured the card; the slot stays to flag the ambiguity.
                info!(order_number = %order.order_number, "terminal payment cancelled");
                Ok(SubmissionOutcome::Cancelled)
            }
        }
    }

    /// Start a manually-keyed card payment: creates the order and returns
    /// the client secret for the card-entry dialog. The submission stays
    /// in flight until completed or aborted.
    #[instrument(skip(self, context))]
    pub async fn begin_manual_card(&self, context: &CheckoutContext) -> Result<ManualCardIntent> {
        let guard = self.begin_submission()?;
        let (items, _total_cents) = self.snapshot_cart()?;

        let request = build_request(context, PaymentMethod::ManualCard, items, None);
        let order = self.orders.create_order(&request).await?;

        let client_secret = order.client_secret.ok_or_else(|| {
            PosError::Config(format!(
                "order {} response is missing the payment client secret",
                order.order_number
            ))
        })?;

        let intent = ManualCardIntent {
            order_id: order.id,
            order_number: order.order_number,
            client_secret,
        };
        *self.locked_manual() = Some(intent.clone());
        guard.persist();
        Ok(intent)
    }

    /// Confirm a completed manual card entry against the backend.
    #[instrument(skip(self))]
    pub async fn complete_manual_card(&self) -> Result<SubmissionOutcome> {
        let intent = self
            .locked_manual()
            .take()
            .ok_or_else(|| PosError::InvalidInput("no manual card payment in progress".into()))?;

        let outcome = match self.confirm_with_retry(intent.order_id, PaymentMethod::ManualCard).await
        {
            Some(confirmation) => {
                self.clear_cart();
                Ok(SubmissionOutcome::Settled(confirmation))
            }
            None => {
                error!(
                    order_id = intent.order_id,
                    order_number = %intent.order_number,
                    "charged but unconfirmed after {} attempts; reconcile manually",
                    self.policy.max_attempts
                );
                Ok(SubmissionOutcome::RequiresReconciliation {
                    order_id: intent.order_id,
                    order_number: intent.order_number,
                })
            }
        };

        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    /// Abort the card-entry dialog after the order was created but before
    /// payment completed. Issues the compensating order cancel so no
    /// orphaned pending order is left behind.
    #[instrument(skip(self))]
    pub async fn abort_manual_card(&self) -> Result<()> {
        let intent = self
            .locked_manual()
            .take()
            .ok_or_else(|| PosError::InvalidInput("no manual card payment in progress".into()))?;

        let result = self.orders.cancel_order(intent.order_id).await;
        self.in_flight.store(false, Ordering::SeqCst);
        info!(order_number = %intent.order_number, "manual card entry aborted");
        result
    }

    /// Read the crash-recovery slot at start-up. A populated slot means a
    /// previous terminal session may still be active on the reader.
    pub async fn interrupted_session(&self) -> Result<Option<PendingTerminalTransaction>> {
        self.pending.read().await
    }

    /// Apply the operator's decision about an interrupted session.
    #[instrument(skip(self))]
    pub async fn resolve_interrupted_session(
        &self,
        resolution: RecoveryResolution,
    ) -> Result<()> {
        match resolution {
            RecoveryResolution::CancelReaderPrompt => {
                if let Err(err) = self.terminal.cancel_collect().await {
                    // Nothing to cancel is fine; the reader may have
                    // timed its prompt out already.
                    warn!(error = %err, "cancelling the leftover reader prompt failed");
                }
                self.pending.clear().await
            }
            RecoveryResolution::Dismiss => Ok(()),
        }
    }

    /// Bounded confirmation retry. Returns `None` when all attempts are
    /// exhausted; the charge itself is never re-attempted.
    async fn confirm_with_retry(
        &self,
        order_id: i64,
        method: PaymentMethod,
    ) -> Option<OrderConfirmation> {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let result = match method {
                PaymentMethod::ManualCard => self.orders.confirm_manual_payment(order_id).await,
                _ => self.orders.confirm_terminal_payment(order_id).await,
            };

            match result {
                Ok(confirmation) => return Some(confirmation),
                Err(err) => {
                    warn!(order_id, attempt, error = %err, "settlement confirmation failed");
                    if err.is_configuration() || matches!(err, PosError::InvalidInput(_)) {
                        // Retrying a non-transient failure cannot succeed.
                        return None;
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }
        None
    }

    fn begin_submission(&self) -> Result<SubmissionGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PosError::Busy("a submission is already in flight".into()));
        }
        Ok(SubmissionGuard { flag: &self.in_flight, released: false })
    }

    fn snapshot_cart(&self) -> Result<(Vec<OrderItem>, i64)> {
        let cart = lock_ignoring_poison(&self.cart);
        if cart.is_empty() {
            return Err(PosError::InvalidInput("the cart is empty".into()));
        }
        let items = cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                product_variant_id: line.variant.id,
                quantity: line.quantity,
            })
            .collect();
        Ok((items, cart.total_cents()))
    }

    fn clear_cart(&self) {
        lock_ignoring_poison(&self.cart).clear();
    }

    fn locked_manual(&self) -> std::sync::MutexGuard<'_, Option<ManualCardIntent>> {
        match self.manual.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Change owed to the customer on a cash payment
pub fn change_due_cents(total_cents: i64, cash_received_cents: i64) -> i64 {
    (cash_received_cents - total_cents).max(0)
}

/// Render cents as a dollar string for operator-facing confirmations
fn format_cents(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

fn build_request(
    context: &CheckoutContext,
    payment_method: PaymentMethod,
    items: Vec<OrderItem>,
    cash_received_cents: Option<i64>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: context.customer_name.clone(),
        order_type: context.order_type,
        payment_method,
        location_id: context.location_id,
        items,
        cash_received_cents,
    }
}

fn lock_ignoring_poison(cart: &Mutex<CartModel>) -> std::sync::MutexGuard<'_, CartModel> {
    match cart.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Releases the in-flight flag on drop unless persisted (manual card keeps
/// the submission open across calls).
struct SubmissionGuard<'a> {
    flag: &'a AtomicBool,
    released: bool,
}

impl SubmissionGuard<'_> {
    fn persist(mut self) {
        self.released = true;
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}
