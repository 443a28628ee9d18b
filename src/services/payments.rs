use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::payment::{self, Entity as PaymentEntity, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::payplan::{self, PayPlan},
};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// The only provider wired up today
const PROVIDER: &str = "mock";

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentInput {
    pub order_number: String,
    pub method: Option<String>,
    pub pay_plan: Option<String>,
}

/// Freshly created payment intent, as returned to the client
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntent {
    pub provider: String,
    pub provider_payment_id: String,
    pub status: String,
    pub pay_url: String,
    pub amount: i64,
    pub currency: String,
    pub order_number: String,
    pub pay_plan: String,
}

/// Stored payment projection served to the mock checkout page
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentProjection {
    pub provider_payment_id: String,
    pub order_number: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: String,
    pub pay_plan: String,
    pub pay_url: String,
    /// 5% of this payment's amount, shown as the deposit option preview
    pub deposit_preview: i64,
    /// First quarter of this payment's amount, shown as the split preview
    pub split_preview: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInput {
    pub event: Option<String>,
    pub provider_payment_id: String,
    pub order_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookOutcome {
    pub payment: payment::Model,
    pub order_status: String,
}

pub fn parse_payment_status(value: &str) -> Result<PaymentStatus, ServiceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(PaymentStatus::Pending),
        "succeeded" => Ok(PaymentStatus::Succeeded),
        "failed" => Ok(PaymentStatus::Failed),
        "canceled" | "cancelled" => Ok(PaymentStatus::Canceled),
        other => Err(ServiceError::ValidationError(format!(
            "invalid payment status: {}",
            other
        ))),
    }
}

fn parse_method(value: Option<&str>) -> Result<String, ServiceError> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok("card".to_string()),
        Some(ref m) if m.is_empty() || m == "card" => Ok("card".to_string()),
        Some(ref m) if m == "sbp" => Ok("sbp".to_string()),
        Some(other) => Err(ServiceError::ValidationError(format!(
            "invalid payment method: {}",
            other
        ))),
    }
}

fn generate_provider_payment_id() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("mock_pay_{}", token)
}

/// Service for mock payment intents and their confirmation lifecycle
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    public_base_url: String,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>, public_base_url: String) -> Self {
        Self {
            db,
            event_sender,
            public_base_url,
        }
    }

    /// Creates a pending mock payment for an order: amount due now is
    /// derived from the chosen pay-plan, the split schedule is recorded in
    /// the audit blob, and a checkout URL is handed back.
    #[instrument(skip(self, input), fields(order_number = %input.order_number))]
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<PaymentIntent, ServiceError> {
        let plan = PayPlan::parse(input.pay_plan.as_deref().unwrap_or("full"))?;
        let method = parse_method(input.method.as_deref())?;

        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(&input.order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(order_number = %input.order_number, "Order not found for payment");
                ServiceError::NotFound(format!("Order {} not found", input.order_number))
            })?;

        let total = order.total_amount;
        let amount = payplan::amount_due_now(plan, total);
        // Payment amounts are strictly positive
        if amount < 1 {
            return Err(ServiceError::ValidationError(format!(
                "order {} has nothing to charge under the {} plan",
                order.order_number,
                plan.as_str()
            )));
        }
        let now = Utc::now();
        let schedule = match plan {
            PayPlan::Split => Some(payplan::installment_schedule(total, now)),
            _ => None,
        };

        let payment_id = Uuid::new_v4();
        let provider_payment_id = generate_provider_payment_id();
        let pay_url = format!(
            "{}/checkout/mock?payment_id={}&order={}&method={}&plan={}",
            self.public_base_url,
            provider_payment_id,
            order.order_number,
            method,
            plan.as_str(),
        );

        // Full computation inputs, kept for audit
        let request_payload = json!({
            "order_number": order.order_number,
            "order_total": total,
            "pay_plan": plan.as_str(),
            "method": method,
            "amount_due_now": amount,
            "schedule": schedule,
            "requested_at": now,
        });

        let record = payment::ActiveModel {
            id: Set(payment_id),
            order_id: Set(order.id),
            order_number: Set(order.order_number.clone()),
            provider: Set(PROVIDER.to_string()),
            provider_payment_id: Set(provider_payment_id.clone()),
            amount: Set(amount),
            currency: Set(order.currency.clone()),
            status: Set(PaymentStatus::Pending),
            method: Set(method),
            pay_plan: Set(plan.as_str().to_string()),
            pay_url: Set(pay_url.clone()),
            request_payload: Set(request_payload),
            webhook_payload: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let model = record.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, payment_id = %payment_id, "Failed to create payment");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            payment_id = %payment_id,
            provider_payment_id = %model.provider_payment_id,
            amount,
            pay_plan = plan.as_str(),
            "Payment intent created"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentCreated {
                payment_id,
                order_id: order.id,
            })
            .await
        {
            warn!(error = %e, payment_id = %payment_id, "Failed to send payment created event");
        }

        Ok(PaymentIntent {
            provider: PROVIDER.to_string(),
            provider_payment_id: model.provider_payment_id,
            status: model.status.to_value(),
            pay_url,
            amount,
            currency: model.currency,
            order_number: model.order_number,
            pay_plan: model.pay_plan,
        })
    }

    /// Fetches a payment by its provider identifier.
    #[instrument(skip(self))]
    pub async fn get_by_provider_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<PaymentProjection, ServiceError> {
        let model = self.find_by_provider_id(provider_payment_id).await?;
        Ok(Self::projection(model))
    }

    /// Fallback lookup: the most recent payment for an order.
    #[instrument(skip(self))]
    pub async fn latest_for_order(
        &self,
        order_number: &str,
    ) -> Result<PaymentProjection, ServiceError> {
        let model = PaymentEntity::find()
            .filter(payment::Column::OrderNumber.eq(order_number))
            .order_by_desc(payment::Column::CreatedAt)
            // id breaks created_at ties so the lookup stays deterministic
            .order_by_desc(payment::Column::Id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No payment for order {}", order_number))
            })?;
        Ok(Self::projection(model))
    }

    /// Applies a status update to a payment and stores the raw blob,
    /// timestamped, for audit. No transition-legality check is made:
    /// repeated or backward updates are written verbatim.
    #[instrument(skip(self, raw), fields(provider_payment_id = %provider_payment_id))]
    pub async fn confirm(
        &self,
        provider_payment_id: &str,
        status: PaymentStatus,
        raw: serde_json::Value,
    ) -> Result<payment::Model, ServiceError> {
        let model = self.find_by_provider_id(provider_payment_id).await?;
        self.apply_status(model, status, raw).await
    }

    /// Webhook path: the payment update of [`confirm`], then a cascade to
    /// the referenced order. `succeeded` confirms the order, `canceled`
    /// cancels it, `failed` leaves it untouched.
    #[instrument(skip(self, input), fields(provider_payment_id = %input.provider_payment_id, order_id = %input.order_id))]
    pub async fn apply_webhook(&self, input: WebhookInput) -> Result<WebhookOutcome, ServiceError> {
        let status = parse_payment_status(&input.status)?;

        let payment_model = self.find_by_provider_id(&input.provider_payment_id).await?;
        let order_model = OrderEntity::find_by_id(input.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", input.order_id)))?;

        let raw = json!({
            "event": input.event,
            "provider_payment_id": input.provider_payment_id,
            "order_id": input.order_id,
            "status": input.status,
        });
        let payment_model = self.apply_status(payment_model, status, raw).await?;

        let cascade = match status {
            PaymentStatus::Succeeded => Some(OrderStatus::Confirmed),
            PaymentStatus::Canceled => Some(OrderStatus::Cancelled),
            // Explicit policy: a failed payment leaves the order open
            PaymentStatus::Failed | PaymentStatus::Pending => None,
        };

        let order_status = match cascade {
            Some(new_status) => {
                let order_id = order_model.id;
                let old_status = order_model.status.to_value();
                let mut active: order::ActiveModel = order_model.into();
                active.status = Set(new_status);
                active.updated_at = Set(Some(Utc::now()));
                let updated = active.update(&*self.db).await.map_err(|e| {
                    error!(error = %e, order_id = %order_id, "Failed to cascade order status");
                    ServiceError::DatabaseError(e)
                })?;

                info!(order_id = %order_id, status = %updated.status.to_value(), "Order status cascaded");
                if let Err(e) = self
                    .event_sender
                    .send(Event::OrderStatusChanged {
                        order_id,
                        old_status,
                        new_status: updated.status.to_value(),
                    })
                    .await
                {
                    warn!(error = %e, order_id = %order_id, "Failed to send order status event");
                }
                updated.status.to_value()
            }
            None => order_model.status.to_value(),
        };

        Ok(WebhookOutcome {
            payment: payment_model,
            order_status,
        })
    }

    async fn find_by_provider_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<payment::Model, ServiceError> {
        PaymentEntity::find()
            .filter(payment::Column::ProviderPaymentId.eq(provider_payment_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment {} not found", provider_payment_id))
            })
    }

    async fn apply_status(
        &self,
        model: payment::Model,
        status: PaymentStatus,
        raw: serde_json::Value,
    ) -> Result<payment::Model, ServiceError> {
        let payment_id = model.id;
        let old_status = model.status.to_value();

        let mut active: payment::ActiveModel = model.into();
        active.status = Set(status);
        active.webhook_payload = Set(Some(json!({
            "received_at": Utc::now(),
            "payload": raw,
        })));
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, payment_id = %payment_id, "Failed to update payment status");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            payment_id = %payment_id,
            old_status = %old_status,
            new_status = %updated.status.to_value(),
            "Payment status updated"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::PaymentStatusChanged {
                payment_id,
                old_status,
                new_status: updated.status.to_value(),
            })
            .await
        {
            warn!(error = %e, payment_id = %payment_id, "Failed to send payment status event");
        }

        Ok(updated)
    }

    fn projection(model: payment::Model) -> PaymentProjection {
        PaymentProjection {
            deposit_preview: payplan::deposit_minor(model.amount),
            split_preview: payplan::split_parts(model.amount)[0],
            provider_payment_id: model.provider_payment_id,
            order_number: model.order_number,
            amount: model.amount,
            currency: model.currency,
            status: model.status.to_value(),
            method: model.method,
            pay_plan: model.pay_plan,
            pay_url: model.pay_url,
        }
    }
}
