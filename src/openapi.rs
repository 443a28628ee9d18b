use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Memoria API",
        version = "0.1.0",
        description = r#"
Backend for planning and purchasing memorial services.

- **Orders**: intake from the planning wizard, totals in minor currency units
- **Payments**: mock payment intents with full / deposit / split pay-plans
- **Webhooks**: mock confirmation with order status cascade, plus a signed acquiring endpoint
"#
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::get_order_payment,
        crate::handlers::payments::mock_confirm,
        crate::handlers::webhooks::mock_webhook,
        crate::handlers::webhooks::acquiring_webhook,
    ),
    components(schemas(
        crate::services::orders::CreateOrderInput,
        crate::services::orders::CustomerInput,
        crate::services::orders::CeremonyInput,
        crate::services::orders::ServiceLineInput,
        crate::handlers::orders::CreateOrderResponse,
        crate::handlers::orders::OrderProjection,
        crate::handlers::payments::CreatePaymentRequest,
        crate::handlers::payments::CreatePaymentResponse,
        crate::handlers::payments::MockConfirmRequest,
        crate::handlers::webhooks::MockWebhookRequest,
        crate::services::payments::PaymentIntent,
        crate::services::payments::PaymentProjection,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "Orders", description = "Order intake and lookup"),
        (name = "Payments", description = "Mock payment intents and confirmation"),
        (name = "Webhooks", description = "Provider status callbacks")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
