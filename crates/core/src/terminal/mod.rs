//! Terminal session state machine
//!
//! Wraps the card-reader capability behind a single owning object. The
//! manager holds the one `ConnectedReader` handle in the process; every
//! other component queries it here, because the SDK can drop the
//! connection asynchronously and a cached copy would go stale.

pub mod ports;

use std::sync::{Arc, Mutex};

use tillpoint_domain::{
    ConnectedReader, DiscoveredReader, PaymentOutcome, PosError, Result, TerminalStatus,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use self::ports::{CollectOutcome, ReaderTransport};

struct SessionState {
    status: TerminalStatus,
    reader: Option<ConnectedReader>,
}

/// Owner of the terminal session.
///
/// At most one transport operation (discover/connect/collect) may be
/// outstanding at a time; a second call is rejected rather than racing two
/// SDK calls against the same reader handle.
pub struct TerminalSessionManager {
    transport: Arc<dyn ReaderTransport>,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<TerminalStatus>,
    op_lock: tokio::sync::Mutex<()>,
}

impl TerminalSessionManager {
    pub fn new(transport: Arc<dyn ReaderTransport>) -> Arc<Self> {
        let (status_tx, _) = watch::channel(TerminalStatus::NotInitialized);
        Arc::new(Self {
            transport,
            state: Mutex::new(SessionState {
                status: TerminalStatus::NotInitialized,
                reader: None,
            }),
            status_tx,
            op_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Current session status
    pub fn status(&self) -> TerminalStatus {
        self.locked_state().status
    }

    /// Subscribe to status transitions
    pub fn subscribe(&self) -> watch::Receiver<TerminalStatus> {
        self.status_tx.subscribe()
    }

    /// The reader currently paired, if any. This accessor is the only
    /// sanctioned way to observe the reader.
    pub fn connected_reader(&self) -> Option<ConnectedReader> {
        self.locked_state().reader.clone()
    }

    /// Load the SDK and start listening for unexpected disconnects.
    #[instrument(skip(self))]
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        let _op = self.acquire_op()?;
        self.expect_status(TerminalStatus::NotInitialized, "initialize")?;
        self.set_status(TerminalStatus::Initializing);

        match self.transport.initialize().await {
            Ok(mut disconnects) => {
                self.set_status(TerminalStatus::Initialized);
                let manager = Arc::downgrade(self);
                tokio::spawn(async move {
                    while let Some(event) = disconnects.recv().await {
                        match manager.upgrade() {
                            Some(manager) => manager.on_unexpected_disconnect(&event.reason),
                            None => break,
                        }
                    }
                });
                info!("terminal session initialized");
                Ok(())
            }
            Err(err) => {
                self.set_status(TerminalStatus::Error);
                Err(err)
            }
        }
    }

    /// Discover nearby readers. An empty list is a user-facing condition,
    /// not a hard error.
    #[instrument(skip(self))]
    pub async fn discover(&self) -> Result<Vec<DiscoveredReader>> {
        let _op = self.acquire_op()?;
        self.expect_status(TerminalStatus::Initialized, "discover")?;
        self.set_status(TerminalStatus::Discovering);

        match self.transport.discover().await {
            Ok(readers) => {
                debug!(count = readers.len(), "reader discovery finished");
                self.set_status(TerminalStatus::Initialized);
                Ok(readers)
            }
            Err(err) => {
                self.set_status(TerminalStatus::Error);
                Err(err)
            }
        }
    }

    /// Pair with a discovered reader.
    ///
    /// Credential-class failures (token already redeemed, authentication
    /// error, reader hot-swap) get exactly one silent retry after clearing
    /// cached credentials; everything else surfaces immediately.
    #[instrument(skip(self, reader), fields(reader = %reader.label))]
    pub async fn connect(&self, reader: &DiscoveredReader) -> Result<()> {
        let _op = self.acquire_op()?;
        self.expect_status(TerminalStatus::Initialized, "connect")?;
        self.set_status(TerminalStatus::Connecting);

        let result = match self.transport.connect(reader).await {
            Ok(()) => Ok(()),
            Err(err) if is_credential_error(&err) => {
                warn!(error = %err, "credential-class connect failure, clearing and retrying once");
                if let Err(clear_err) = self.transport.clear_cached_credentials().await {
                    warn!(error = %clear_err, "failed to clear cached reader credentials");
                }
                self.transport.connect(reader).await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.locked_state().reader = Some(reader.clone().into());
                self.set_status(TerminalStatus::Connected);
                info!("reader connected");
                Ok(())
            }
            Err(err) => {
                self.set_status(TerminalStatus::Error);
                Err(err)
            }
        }
    }

    /// Drive a payment through collect and process.
    ///
    /// Declines and cancellations return the session to `Connected` so the
    /// operator can retry without re-pairing; so do transport errors, which
    /// are propagated to the caller.
    #[instrument(skip(self, client_secret))]
    pub async fn collect(&self, client_secret: &str) -> Result<PaymentOutcome> {
        let _op = self.acquire_op()?;
        self.expect_status(TerminalStatus::Connected, "collect")?;
        self.set_status(TerminalStatus::CollectingPayment);

        let collected = match self.transport.collect(client_secret).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.set_status(TerminalStatus::Connected);
                return Err(err);
            }
        };

        if collected == CollectOutcome::Cancelled {
            info!("payment prompt cancelled");
            self.set_status(TerminalStatus::Connected);
            return Ok(PaymentOutcome::Cancelled);
        }

        self.set_status(TerminalStatus::ProcessingPayment);
        match self.transport.process().await {
            Ok(outcome) => {
                self.set_status(TerminalStatus::Connected);
                Ok(outcome)
            }
            Err(err) => {
                self.set_status(TerminalStatus::Connected);
                Err(err)
            }
        }
    }

    /// Cancel an active collect/process prompt.
    ///
    /// Deliberately bypasses the operation mutex: it exists to unstick the
    /// outstanding collect call, which then resolves as cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_collect(&self) -> Result<()> {
        let status = self.status();
        if !matches!(
            status,
            TerminalStatus::CollectingPayment | TerminalStatus::ProcessingPayment
        ) {
            return Err(PosError::InvalidInput(format!(
                "no payment prompt to cancel (status {status:?})"
            )));
        }
        self.transport.cancel_collect().await
    }

    /// Explicit operator disconnect, back to `Initialized`.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        let _op = self.acquire_op()?;
        self.expect_status(TerminalStatus::Connected, "disconnect")?;

        self.transport.disconnect().await?;
        self.locked_state().reader = None;
        self.set_status(TerminalStatus::Initialized);
        Ok(())
    }

    /// Best-effort recovery from any stuck state: cancel an outstanding
    /// prompt, disconnect, and clear cached credentials, swallowing
    /// individual failures, then land on `Initialized`.
    #[instrument(skip(self))]
    pub async fn reset_session(&self) {
        if let Err(err) = self.transport.cancel_collect().await {
            debug!(error = %err, "cancel_collect during reset failed");
        }

        // The cancel above unsticks any outstanding collect, so this lock
        // resolves promptly.
        let _op = self.op_lock.lock().await;

        if let Err(err) = self.transport.disconnect().await {
            debug!(error = %err, "disconnect during reset failed");
        }
        if let Err(err) = self.transport.clear_cached_credentials().await {
            debug!(error = %err, "credential clear during reset failed");
        }

        self.locked_state().reader = None;
        self.set_status(TerminalStatus::Initialized);
        info!("terminal session reset");
    }

    fn on_unexpected_disconnect(&self, reason: &str) {
        warn!(reason, "reader disconnected unexpectedly");
        self.locked_state().reader = None;
        self.set_status(TerminalStatus::Disconnected);
    }

    fn acquire_op(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.op_lock.try_lock().map_err(|_| {
            PosError::Busy("another terminal operation is already in progress".into())
        })
    }

    fn expect_status(&self, expected: TerminalStatus, operation: &str) -> Result<()> {
        let actual = self.status();
        if actual == expected {
            Ok(())
        } else {
            Err(PosError::InvalidInput(format!(
                "cannot {operation} while terminal status is {actual:?}"
            )))
        }
    }

    fn set_status(&self, status: TerminalStatus) {
        self.locked_state().status = status;
        let _ = self.status_tx.send(status);
    }

    fn locked_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // Held only for field reads/writes, never across an await point.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Credential-class errors are recoverable by clearing cached credentials
/// and retrying the same operation once; everything else propagates.
fn is_credential_error(err: &PosError) -> bool {
    if matches!(err, PosError::Auth(_)) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    message.contains("token already redeemed")
        || message.contains("authentication error")
        || message.contains("hot-swap")
}
