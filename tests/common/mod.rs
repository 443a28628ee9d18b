use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use memoria_api::{
    config::AppConfig,
    db,
    events::EventSender,
    handlers::AppServices,
    notifications::AcceptAllMailer,
    AppState,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an
/// in-memory SQLite database.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps the in-memory database alive for the
        // lifetime of the pool.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.public_base_url = "http://localhost:18080".to_string();
        cfg.acquiring_webhook_secret = Some("test-webhook-secret".to_string());

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(memoria_api::events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            Arc::new(AcceptAllMailer),
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(memoria_api::handlers::health::health_routes())
            .nest("/api/v1", memoria_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Send a JSON request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    /// Send a JSON request with extra headers.
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a raw body with extra headers, for signed-webhook tests.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Decode a JSON response body.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A well-formed intake payload totalling 200000 minor units
/// (150000.00 + 2 x 25000.00).
#[allow(dead_code)]
pub fn sample_order_payload(email: &str) -> Value {
    serde_json::json!({
        "customer": {
            "email": email,
            "name": "Anna Petrova",
            "phone": "+7 900 000-00-00"
        },
        "deceased": {
            "full_name": "Ivan Petrov",
            "date_of_death": "2026-08-20"
        },
        "ceremony": {
            "type": "cremation",
            "date": "2026-09-05",
            "location": "Central Crematorium"
        },
        "services": [
            { "name": "Cremation package", "price": "1500.00", "quantity": 1 },
            { "name": "Urn", "price": "250.00", "quantity": 2 }
        ],
        "notes": "Family requests white flowers"
    })
}

/// Create an order and return the intake response body.
#[allow(dead_code)]
pub async fn create_order(app: &TestApp, email: &str) -> Value {
    let response = app
        .request(Method::POST, "/api/v1/orders", Some(sample_order_payload(email)))
        .await;
    assert_eq!(response.status(), 201, "order creation should succeed");
    response_json(response).await
}

/// Create an order plus a payment intent; returns (intake json, payment json).
#[allow(dead_code)]
pub async fn create_order_with_payment(
    app: &TestApp,
    email: &str,
    pay_plan: &str,
) -> (Value, Value) {
    let order = create_order(app, email).await;
    let order_number = order["order_number"].as_str().expect("order_number");
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(serde_json::json!({
                "order_number": order_number,
                "pay_plan": pay_plan
            })),
        )
        .await;
    assert_eq!(response.status(), 200, "payment creation should succeed");
    let payment = response_json(response).await;
    (order, payment)
}
