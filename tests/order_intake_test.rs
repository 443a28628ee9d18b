//! Integration tests for order intake: validation, totals, persistence,
//! and the intake response contract.

mod common;

use axum::http::Method;
use common::{create_order, response_json, sample_order_payload, TestApp};
use memoria_api::entities::{Customer, Order};
use sea_orm::EntityTrait;
use serde_json::json;

#[tokio::test]
async fn intake_creates_pending_order_with_minor_unit_total() {
    let app = TestApp::new().await;

    let body = create_order(&app, "anna@example.com").await;

    assert_eq!(body["success"], true);
    // 1500.00 * 1 + 250.00 * 2 = 2000.00 major units
    assert_eq!(body["total_amount"], 200_000);
    assert_eq!(body["currency"], "RUB");
    // AcceptAllMailer reports delivery success
    assert_eq!(body["email_sent"], true);

    let order_number = body["order_number"].as_str().expect("order_number");
    assert!(order_number.starts_with("MEM-"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_number),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let fetched = response_json(response).await;
    assert_eq!(fetched["data"]["status"], "PENDING");
    assert_eq!(fetched["data"]["service_type"], "CREMATION");
    assert_eq!(fetched["data"]["total_amount"], 200_000);
}

#[tokio::test]
async fn intake_without_email_is_rejected_and_persists_nothing() {
    let app = TestApp::new().await;

    let mut payload = sample_order_payload("anna@example.com");
    payload["customer"]["email"] = json!("");

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 400);

    let orders = Order::find().all(&*app.state.db).await.expect("query orders");
    assert!(orders.is_empty(), "no order row should survive a rejected intake");
    let customers = Customer::find()
        .all(&*app.state.db)
        .await
        .expect("query customers");
    assert!(customers.is_empty(), "no customer row should survive a rejected intake");
}

#[tokio::test]
async fn intake_rejects_negative_price() {
    let app = TestApp::new().await;

    let mut payload = sample_order_payload("anna@example.com");
    payload["services"][0]["price"] = json!("-10.00");

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn repeated_intake_reuses_customer_by_email() {
    let app = TestApp::new().await;

    let first = create_order(&app, "repeat@example.com").await;
    let second = create_order(&app, "repeat@example.com").await;
    assert_ne!(first["order_number"], second["order_number"]);

    let customers = Customer::find()
        .all(&*app.state.db)
        .await
        .expect("query customers");
    assert_eq!(customers.len(), 1, "same email should upsert a single customer");

    let orders = Order::find().all(&*app.state.db).await.expect("query orders");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].customer_id, orders[1].customer_id);
}

#[tokio::test]
async fn missing_ceremony_type_defaults_to_burial() {
    let app = TestApp::new().await;

    let payload = json!({
        "customer": { "email": "burial@example.com" },
        "services": [
            { "name": "Burial package", "price": "1000.00" }
        ]
    });

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    // default quantity is 1
    assert_eq!(body["total_amount"], 100_000);

    let order_number = body["order_number"].as_str().expect("order_number");
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_number),
            None,
        )
        .await;
    let fetched = response_json(response).await;
    assert_eq!(fetched["data"]["service_type"], "BURIAL");
}

#[tokio::test]
async fn unknown_order_lookup_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders/MEM-19990101-ZZZZZZ", None)
        .await;
    assert_eq!(response.status(), 404);
}
