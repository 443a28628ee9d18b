use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::orders::CreateOrderInput;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response to a successful order submission. Email delivery is reported as
/// a flag: its failure never fails the order.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
    pub order_number: String,
    /// Order total in minor currency units
    pub total_amount: i64,
    pub currency: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderProjection {
    pub order_number: String,
    pub status: String,
    pub service_type: String,
    pub total_amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Submit an order from the planning wizard
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ServiceError> {
    let outcome = state.services.orders.submit_order(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            order_id: outcome.order_id,
            order_number: outcome.order_number,
            total_amount: outcome.total_amount,
            currency: outcome.currency,
            email_sent: outcome.email.sent,
            email_error: outcome.email.error,
        }),
    ))
}

/// Order listing is intentionally not implemented
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses((status = 200, description = "Static message")),
    tag = "Orders"
)]
pub async fn list_orders() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(
        "Order listing is not implemented; look up orders by order number",
    ))
}

/// Get an order by its public identifier
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_number}",
    params(("order_number" = String, Path, description = "Public order identifier")),
    responses(
        (status = 200, description = "Order details", body = ApiResponse<OrderProjection>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<OrderProjection>>, ServiceError> {
    let order = state.services.orders.get_order(&order_number).await?;

    Ok(Json(ApiResponse::success(OrderProjection {
        order_number: order.order_number,
        status: order.status.to_value(),
        service_type: order.service_type.to_value(),
        total_amount: order.total_amount,
        currency: order.currency,
        created_at: order.created_at,
    })))
}

/// Order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:order_number", get(get_order))
}
