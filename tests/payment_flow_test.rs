//! Integration tests for payment intents: pay-plans, amounts due now,
//! checkout lookup, and the mock confirmation endpoint.

mod common;

use axum::http::Method;
use chrono::Utc;
use common::{create_order, create_order_with_payment, response_json, TestApp};
use memoria_api::entities::payment::{self, PaymentStatus};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn full_plan_charges_the_whole_total() {
    let app = TestApp::new().await;

    let (order, payment) = create_order_with_payment(&app, "full@example.com", "full").await;

    assert_eq!(payment["ok"], true);
    assert_eq!(payment["provider"], "mock");
    assert_eq!(payment["status"], "pending");
    assert_eq!(payment["pay_plan"], "full");
    assert_eq!(payment["amount"], 200_000);
    assert_eq!(payment["order_number"], order["order_number"]);

    let pay_url = payment["pay_url"].as_str().expect("pay_url");
    assert!(pay_url.starts_with("http://localhost:18080/checkout/mock?payment_id=mock_pay_"));
}

#[tokio::test]
async fn deposit_plan_charges_five_percent() {
    let app = TestApp::new().await;

    let (_, payment) = create_order_with_payment(&app, "deposit@example.com", "deposit").await;

    assert_eq!(payment["pay_plan"], "deposit");
    // 5% of 200000
    assert_eq!(payment["amount"], 10_000);
}

#[tokio::test]
async fn split_plan_charges_the_first_quarter() {
    let app = TestApp::new().await;

    let (_, payment) = create_order_with_payment(&app, "split@example.com", "split").await;

    assert_eq!(payment["pay_plan"], "split");
    assert_eq!(payment["amount"], 50_000);
}

#[tokio::test]
async fn zero_total_order_cannot_create_a_zero_amount_intent() {
    let app = TestApp::new().await;

    // An empty service list is a valid intake and totals zero
    let payload = json!({
        "customer": { "email": "zero@example.com" },
        "services": []
    });
    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 201);
    let order = response_json(response).await;
    assert_eq!(order["total_amount"], 0);
    let order_number = order["order_number"].as_str().expect("order_number");

    for plan in ["full", "split"] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/payments",
                Some(json!({ "order_number": order_number, "pay_plan": plan })),
            )
            .await;
        assert_eq!(response.status(), 400, "plan {} should be rejected", plan);
    }

    // No payment row was persisted by the rejected attempts
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/order/{}", order_number),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    // The deposit floor still yields a chargeable amount
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "order_number": order_number, "pay_plan": "deposit" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["amount"], 1);
}

#[tokio::test]
async fn payment_for_unknown_order_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "order_number": "MEM-19990101-ZZZZZZ" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn unknown_pay_plan_is_rejected() {
    let app = TestApp::new().await;

    let order = create_order(&app, "plans@example.com").await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "order_number": order["order_number"],
                "pay_plan": "weekly"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn checkout_lookup_by_provider_id_and_by_order() {
    let app = TestApp::new().await;

    let (order, payment) = create_order_with_payment(&app, "lookup@example.com", "full").await;
    let provider_payment_id = payment["provider_payment_id"].as_str().expect("ppid");
    let order_number = order["order_number"].as_str().expect("order_number");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/{}", provider_payment_id),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["provider_payment_id"], provider_payment_id);
    assert_eq!(data["amount"], 200_000);
    // previews shown on the mock checkout page
    assert_eq!(data["deposit_preview"], 10_000);
    assert_eq!(data["split_preview"], 50_000);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/order/{}", order_number),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["provider_payment_id"], provider_payment_id);
}

#[tokio::test]
async fn latest_payment_wins_the_order_lookup() {
    let app = TestApp::new().await;

    let (order, _) = create_order_with_payment(&app, "latest@example.com", "full").await;
    let order_number = order["order_number"].as_str().expect("order_number");

    // A second intent for the same order supersedes the first in lookups
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "order_number": order_number, "pay_plan": "deposit" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let second = response_json(response).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/order/{}", order_number),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(
        body["data"]["provider_payment_id"],
        second["provider_payment_id"]
    );
    assert_eq!(body["data"]["pay_plan"], "deposit");
}

#[tokio::test]
async fn order_lookup_breaks_created_at_ties_by_id() {
    let app = TestApp::new().await;

    let order = create_order(&app, "ties@example.com").await;
    let order_id = Uuid::parse_str(order["order_id"].as_str().expect("order_id")).expect("uuid");
    let order_number = order["order_number"].as_str().expect("order_number").to_string();

    // Two intents sharing the exact same created_at
    let now = Utc::now();
    let ids = [Uuid::new_v4(), Uuid::new_v4()];
    for (i, id) in ids.iter().enumerate() {
        payment::ActiveModel {
            id: Set(*id),
            order_id: Set(order_id),
            order_number: Set(order_number.clone()),
            provider: Set("mock".to_string()),
            provider_payment_id: Set(format!("mock_pay_samestamp{:015}", i)),
            amount: Set(200_000),
            currency: Set("RUB".to_string()),
            status: Set(PaymentStatus::Pending),
            method: Set("card".to_string()),
            pay_plan: Set("full".to_string()),
            pay_url: Set(String::new()),
            request_payload: Set(json!({})),
            webhook_payload: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*app.state.db)
        .await
        .expect("insert payment");
    }

    let expected = if ids[0] > ids[1] {
        "mock_pay_samestamp000000000000000"
    } else {
        "mock_pay_samestamp000000000000001"
    };

    // The tie-break on id keeps repeated lookups stable
    for _ in 0..3 {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/payments/order/{}", order_number),
                None,
            )
            .await;
        assert_eq!(response.status(), 200);
        let body = response_json(response).await;
        assert_eq!(body["data"]["provider_payment_id"], expected);
    }
}

#[tokio::test]
async fn mock_confirm_defaults_to_succeeded() {
    let app = TestApp::new().await;

    let (_, payment) = create_order_with_payment(&app, "confirm@example.com", "full").await;
    let provider_payment_id = payment["provider_payment_id"].as_str().expect("ppid");

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/mock/confirm",
            Some(json!({ "provider_payment_id": provider_payment_id })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["payment"]["status"], "succeeded");
}

#[tokio::test]
async fn mock_confirm_unknown_payment_returns_404() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/mock/confirm",
            Some(json!({ "provider_payment_id": "mock_pay_doesnotexist000000000" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}
