#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use honeypalace_api::{
    config::AppConfig,
    db,
    handlers::AppServices,
    notifications::{Mailer, NotificationError, OutboundEmail},
    payments::{signature, CreatePaymentOrder, PaymentError, PaymentGateway, PaymentOrder},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";

/// Gateway double: hands out sequential remote order ids and checks
/// signatures with the real HMAC under [`KEY_SECRET`].
#[derive(Default)]
pub struct FakeGateway {
    created: AtomicUsize,
    fail: AtomicBool,
}

impl FakeGateway {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn fail_next_orders(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn key_id(&self) -> String {
        KEY_ID.to_string()
    }

    async fn create_order(&self, request: CreatePaymentOrder) -> Result<PaymentOrder, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected {
                status: 401,
                message: "Authentication failed".into(),
            });
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentOrder {
            id: format!("order_test{n}"),
            entity: "order".into(),
            amount: request.amount,
            amount_paid: 0,
            amount_due: request.amount,
            currency: request.currency,
            receipt: Some(request.receipt),
            status: "created".into(),
            attempts: 0,
            created_at: 1_700_000_000,
        })
    }

    fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, PaymentError> {
        signature::verify(KEY_SECRET, order_id, payment_id, signature)
    }
}

/// Mailer double that records every message
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Application over a fresh in-memory SQLite database with fake collaborators.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        // One connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.razorpay.key_id = KEY_ID.to_string();
        cfg.razorpay.key_secret = KEY_SECRET.to_string();
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());
        let services = AppServices::new(db_arc.clone(), &cfg, gateway.clone(), mailer.clone());

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            services,
        };
        let router = honeypalace_api::app_router(state.clone());

        Self {
            router,
            state,
            gateway,
            mailer,
        }
    }

    /// Sends a request and returns the status with the JSON body
    /// (`Value::Null` for an empty body).
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };
        (status, value)
    }

    /// Places an order and returns the response body
    pub async fn place_order(&self, payment_method: &str) -> Value {
        let (status, body) = self
            .request(Method::POST, "/api/orders", Some(order_payload(payment_method)))
            .await;
        assert_eq!(status, StatusCode::OK, "order placement failed: {body}");
        body
    }
}

pub fn order_payload(payment_method: &str) -> Value {
    json!({
        "formData": {
            "firstName": "Asha",
            "lastName": "Rao",
            "email": "asha@example.com",
            "alternateEmail": "",
            "phone": "9876543210",
            "address": "12 Hive Lane",
            "city": "Pune",
            "state": "MH",
            "pincode": "411001"
        },
        "paymentMethod": payment_method,
        "cartItems": [
            { "id": 1, "name": "500ml Raw Honey", "price": 350, "quantity": 2 }
        ],
        "total": 750,
        "isBuyNow": false
    })
}

pub fn sign(order_id: &str, payment_id: &str) -> String {
    signature::sign(KEY_SECRET, order_id, payment_id).expect("hmac accepts any key")
}
