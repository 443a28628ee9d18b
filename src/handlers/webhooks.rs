use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::WebhookInput;
use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use base64::Engine;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Deserialize, ToSchema)]
pub struct MockWebhookRequest {
    /// Event name, informational (e.g. "payment.succeeded")
    pub event: Option<String>,
    pub provider_payment_id: String,
    /// Internal order identifier
    pub order_id: Uuid,
    pub status: String,
}

/// Mock provider webhook: updates the payment and cascades to the order
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/mock",
    request_body = MockWebhookRequest,
    responses(
        (status = 200, description = "Webhook applied"),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown payment or order", body = crate::errors::ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn mock_webhook(
    State(state): State<AppState>,
    Json(request): Json<MockWebhookRequest>,
) -> Result<Json<Value>, ServiceError> {
    let outcome = state
        .services
        .payments
        .apply_webhook(WebhookInput {
            event: request.event,
            provider_payment_id: request.provider_payment_id,
            order_id: request.order_id,
            status: request.status,
        })
        .await?;

    Ok(Json(json!({
        "ok": true,
        "payment": outcome.payment,
        "order_status": outcome.order_status,
    })))
}

/// Signed acquiring webhook: base64 HMAC-SHA256 over the raw body.
/// The payload is verified and parsed but not yet persisted.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/acquiring",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 503, description = "Webhook secret not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn acquiring_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let secret = state
        .config
        .acquiring_webhook_secret
        .as_deref()
        .ok_or_else(|| {
            ServiceError::ServiceUnavailable("acquiring webhook secret not configured".to_string())
        })?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing webhook signature".to_string()))?;

    if !verify_signature(&body, secret, signature) {
        warn!("Acquiring webhook signature verification failed");
        return Err(ServiceError::Unauthorized(
            "invalid webhook signature".to_string(),
        ));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let event = payload.get("event").and_then(|v| v.as_str()).unwrap_or("");
    // TODO: route acquiring events into PaymentService::apply_webhook once
    // the provider contract is final; for now the payload is only logged.
    info!(event, "Acquiring webhook accepted (not persisted)");

    Ok(Json(json!({ "ok": true })))
}

fn verify_signature(payload: &Bytes, secret: &str, signature: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, signature)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/mock", post(mock_webhook))
        .route("/acquiring", post(acquiring_webhook))
}
