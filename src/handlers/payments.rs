use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::{
    parse_payment_status, CreatePaymentInput, PaymentIntent, PaymentProjection,
};
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "order_number": "MEM-20250101-X7K4QZ",
    "method": "card",
    "pay_plan": "split"
}))]
pub struct CreatePaymentRequest {
    /// Public identifier of the order to pay for
    #[validate(length(min = 1, message = "order_number is required"))]
    pub order_number: String,
    /// Payment method tag: "card" (default) or "sbp"
    pub method: Option<String>,
    /// Pay-plan: "full" (default), "deposit" (5%), or "split" (4 parts)
    pub pay_plan: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePaymentResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub intent: PaymentIntent,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct MockConfirmRequest {
    #[validate(length(min = 1, message = "provider_payment_id is required"))]
    pub provider_payment_id: String,
    /// Desired status; defaults to "succeeded"
    pub status: Option<String>,
}

/// Create a mock payment intent for an order
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = CreatePaymentResponse),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, ServiceError> {
    request.validate()?;

    let intent = state
        .services
        .payments
        .create_payment(CreatePaymentInput {
            order_number: request.order_number,
            method: request.method,
            pay_plan: request.pay_plan,
        })
        .await?;

    Ok(Json(CreatePaymentResponse { ok: true, intent }))
}

/// Get a payment by its provider identifier (mock checkout data)
#[utoipa::path(
    get,
    path = "/api/v1/payments/{provider_payment_id}",
    params(("provider_payment_id" = String, Path, description = "Provider payment identifier")),
    responses(
        (status = 200, description = "Payment projection", body = ApiResponse<PaymentProjection>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(provider_payment_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentProjection>>, ServiceError> {
    let projection = state
        .services
        .payments
        .get_by_provider_id(&provider_payment_id)
        .await?;
    Ok(Json(ApiResponse::success(projection)))
}

/// Fallback lookup: the most recent payment for an order
#[utoipa::path(
    get,
    path = "/api/v1/payments/order/{order_number}",
    params(("order_number" = String, Path, description = "Public order identifier")),
    responses(
        (status = 200, description = "Payment projection", body = ApiResponse<PaymentProjection>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_order_payment(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<PaymentProjection>>, ServiceError> {
    let projection = state.services.payments.latest_for_order(&order_number).await?;
    Ok(Json(ApiResponse::success(projection)))
}

/// Simulate a provider confirmation for a mock payment
#[utoipa::path(
    post,
    path = "/api/v1/payments/mock/confirm",
    request_body = MockConfirmRequest,
    responses(
        (status = 200, description = "Payment updated"),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn mock_confirm(
    State(state): State<AppState>,
    Json(request): Json<MockConfirmRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    request.validate()?;

    let status = parse_payment_status(request.status.as_deref().unwrap_or("succeeded"))?;
    let raw = json!({
        "provider_payment_id": request.provider_payment_id,
        "status": request.status,
        "source": "mock_confirm",
    });

    let payment = state
        .services
        .payments
        .confirm(&request.provider_payment_id, status, raw)
        .await?;

    Ok(Json(json!({ "ok": true, "payment": payment })))
}

/// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/:provider_payment_id", get(get_payment))
        .route("/order/:order_number", get(get_order_payment))
        .route("/mock/confirm", post(mock_confirm))
}
