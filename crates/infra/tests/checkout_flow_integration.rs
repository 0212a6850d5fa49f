//! End-to-end checkout flow against a mocked backend and a real SQLite
//! pending-transaction store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tillpoint_core::checkout::ports::PendingTransactionStore;
use tillpoint_core::terminal::ports::{CollectOutcome, ReaderTransport, UnexpectedDisconnect};
use tillpoint_core::{
    CartModel, CheckoutContext, ConfirmationPolicy, OrderSubmissionCoordinator,
    RecoveryResolution, SubmissionOutcome, TerminalSessionManager,
};
use tillpoint_domain::{
    DiscoveredReader, OrderType, PaymentOutcome, PendingTerminalTransaction, ProductRef, Result,
    VariantRef,
};
use tillpoint_infra::{PendingTransactionRepository, PosApiClient, PosApiConfig, StaticTokenProvider};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Reader double that always approves the card
struct ApprovingTransport;

#[async_trait]
impl ReaderTransport for ApprovingTransport {
    async fn initialize(&self) -> Result<mpsc::UnboundedReceiver<UnexpectedDisconnect>> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    async fn discover(&self) -> Result<Vec<DiscoveredReader>> {
        Ok(vec![reader()])
    }

    async fn connect(&self, _reader: &DiscoveredReader) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, _client_secret: &str) -> Result<CollectOutcome> {
        Ok(CollectOutcome::Collected)
    }

    async fn process(&self) -> Result<PaymentOutcome> {
        Ok(PaymentOutcome::Approved {
            card_brand: Some("visa".into()),
            card_last4: Some("4242".into()),
        })
    }

    async fn cancel_collect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn clear_cached_credentials(&self) -> Result<()> {
        Ok(())
    }
}

fn reader() -> DiscoveredReader {
    DiscoveredReader {
        id: "rdr_1".into(),
        label: "Counter reader".into(),
        serial_number: "SN-001".into(),
        device_type: "bbpos_wisepos_e".into(),
    }
}

fn context() -> CheckoutContext {
    CheckoutContext { customer_name: "Walk-in".into(), order_type: OrderType::Pickup, location_id: 3 }
}

fn cart_with_hoodie() -> Arc<Mutex<CartModel>> {
    let mut cart = CartModel::new();
    cart.add(
        &ProductRef { id: 1, name: "Hoodie".into() },
        &VariantRef { id: 10, name: "M".into(), unit_price_cents: 1250 },
    );
    Arc::new(Mutex::new(cart))
}

async fn mount_create_order(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/admin/pos/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 42,
            "order_number": "POS-0042",
            "client_secret": "pi_123_secret_456"
        })))
        .mount(server)
        .await;
}

async fn build_coordinator(
    server: &MockServer,
    store: Arc<PendingTransactionRepository>,
    cart: Arc<Mutex<CartModel>>,
) -> OrderSubmissionCoordinator {
    let gateway = Arc::new(
        PosApiClient::new(
            PosApiConfig { base_url: server.uri(), timeout: Duration::from_secs(5) },
            Arc::new(StaticTokenProvider::new("tp_test_token")),
        )
        .expect("api client"),
    );

    let terminal = TerminalSessionManager::new(Arc::new(ApprovingTransport));
    terminal.initialize().await.expect("transport initialized");
    terminal.connect(&reader()).await.expect("reader connected");

    OrderSubmissionCoordinator::new(gateway, store, terminal, cart).with_confirmation_policy(
        ConfirmationPolicy { max_attempts: 3, retry_delay: Duration::from_millis(1) },
    )
}

fn open_store(dir: &TempDir) -> Arc<PendingTransactionRepository> {
    Arc::new(PendingTransactionRepository::open(dir.path().join("register.db")).expect("store"))
}

#[tokio::test]
async fn terminal_checkout_settles_end_to_end() {
    let server = MockServer::start().await;
    mount_create_order(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/pos/orders/42/confirm_terminal_payment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "order_number": "POS-0042",
            "total_formatted": "$12.50",
            "card_brand": "visa",
            "card_last4": "4242"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let cart = cart_with_hoodie();
    let coordinator = build_coordinator(&server, store.clone(), cart.clone()).await;

    let outcome = coordinator.submit_terminal_card(&context()).await.expect("submission");
    match outcome {
        SubmissionOutcome::Settled(confirmation) => {
            assert_eq!(confirmation.order_number, "POS-0042");
            assert_eq!(confirmation.card_last4.as_deref(), Some("4242"));
        }
        other => panic!("expected settled, got {other:?}"),
    }

    assert!(cart.lock().unwrap().is_empty());
    assert!(store.read().await.unwrap().is_none());
}

#[tokio::test]
async fn transient_confirmation_failures_are_retried_to_success() {
    let server = MockServer::start().await;
    mount_create_order(&server).await;

    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    Mock::given(method("POST"))
        .and(path("/admin/pos/orders/42/confirm_terminal_payment"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "order_number": "POS-0042",
                    "total_formatted": "$12.50",
                    "card_brand": "visa",
                    "card_last4": "4242"
                }))
            }
        })
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let cart = cart_with_hoodie();
    let coordinator = build_coordinator(&server, store.clone(), cart.clone()).await;

    let outcome = coordinator.submit_terminal_card(&context()).await.expect("submission");
    assert!(matches!(outcome, SubmissionOutcome::Settled(_)));
    assert!(store.read().await.unwrap().is_none());
}

#[tokio::test]
async fn exhausted_confirmation_keeps_the_durable_slot_for_reconciliation() {
    let server = MockServer::start().await;
    mount_create_order(&server).await;
    Mock::given(method("POST"))
        .and(path("/admin/pos/orders/42/confirm_terminal_payment"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let cart = cart_with_hoodie();
    let coordinator = build_coordinator(&server, store.clone(), cart.clone()).await;

    let outcome = coordinator.submit_terminal_card(&context()).await.expect("submission");
    match outcome {
        SubmissionOutcome::RequiresReconciliation { order_id, order_number } => {
            assert_eq!(order_id, 42);
            assert_eq!(order_number, "POS-0042");
        }
        other => panic!("expected reconciliation, got {other:?}"),
    }

    // One order creation; the charge is never re-driven
    let requests = server.received_requests().await.unwrap();
    let creates = requests.iter().filter(|r| r.url.path() == "/admin/pos/orders").count();
    assert_eq!(creates, 1);

    // Slot and cart survive for manual follow-up, even across a restart
    assert!(!cart.lock().unwrap().is_empty());
    drop(coordinator);
    drop(store);
    let reopened = open_store(&dir);
    let slot = reopened.read().await.unwrap().expect("slot persisted");
    assert_eq!(slot.order_number, "POS-0042");
    assert_eq!(slot.amount_cents, 1250);
}

#[tokio::test]
async fn interrupted_session_is_offered_and_never_auto_resubmitted() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would fail the test via the 404 path

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store
        .write(&PendingTerminalTransaction {
            order_id: 7,
            order_number: "POS-0007".into(),
            amount_cents: 500,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let cart = Arc::new(Mutex::new(CartModel::new()));
    let coordinator = build_coordinator(&server, store.clone(), cart).await;

    let notice = coordinator.interrupted_session().await.unwrap().expect("interrupted session");
    assert_eq!(notice.order_number, "POS-0007");

    coordinator.resolve_interrupted_session(RecoveryResolution::Dismiss).await.unwrap();
    assert!(store.read().await.unwrap().is_some());

    coordinator.resolve_interrupted_session(RecoveryResolution::CancelReaderPrompt).await.unwrap();
    assert!(store.read().await.unwrap().is_none());

    // Recovery touched the reader, not the backend
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}
