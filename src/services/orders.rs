use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    entities::order::{self, Entity as OrderEntity, OrderStatus, ServiceType},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{MailOutcome, Mailer},
};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Intake payload as submitted by the planning wizard. The whole struct is
/// persisted verbatim on the order for audit/replay.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderInput {
    #[validate]
    pub customer: CustomerInput,
    #[serde(default)]
    pub deceased: Option<serde_json::Value>,
    #[serde(default)]
    pub ceremony: Option<CeremonyInput>,
    #[serde(default)]
    #[validate]
    pub services: Vec<ServiceLineInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(email(message = "A valid customer email is required"))]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CeremonyInput {
    #[serde(rename = "type", default)]
    pub ceremony_type: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One selected service: unit price in major currency units
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ServiceLineInput {
    #[validate(length(min = 1, message = "Service name is required"))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Result of a successful intake
#[derive(Debug, Serialize)]
pub struct OrderIntakeOutcome {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_amount: i64,
    pub currency: String,
    pub email: MailOutcome,
}

/// Sum of price x quantity over all line items, converted to minor units
/// (x100, rounded to the nearest integer, midpoints away from zero).
/// Empty list yields zero.
pub fn total_minor_units(services: &[ServiceLineInput]) -> Result<i64, ServiceError> {
    let mut total = Decimal::ZERO;
    for line in services {
        if line.price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "service '{}' has a negative price",
                line.name
            )));
        }
        let quantity = line.quantity.unwrap_or(1).max(1);
        total += line.price * Decimal::from(quantity);
    }
    (total * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("order total out of range".to_string()))
}

fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("MEM-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Service handling order intake from the planning wizard
#[derive(Clone)]
pub struct OrderIntakeService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
    currency: String,
    operator_email: Option<String>,
}

impl OrderIntakeService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        currency: String,
        operator_email: Option<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
            currency,
            operator_email,
        }
    }

    /// Persists an order from an intake payload: customer upsert by email,
    /// order insert with computed total and derived service type, then a
    /// best-effort confirmation email that never fails the request.
    #[instrument(skip(self, input), fields(customer_email = %input.customer.email))]
    pub async fn submit_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderIntakeOutcome, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let total_amount = total_minor_units(&input.services)?;
        let service_type = ServiceType::from_ceremony_type(
            input
                .ceremony
                .as_ref()
                .and_then(|c| c.ceremony_type.as_deref()),
        );
        let payload = serde_json::to_value(&input)
            .map_err(|e| ServiceError::InternalError(format!("payload serialization: {}", e)))?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = generate_order_number();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order intake");
            ServiceError::DatabaseError(e)
        })?;

        // Upsert the customer by email
        let existing = CustomerEntity::find()
            .filter(customer::Column::Email.eq(&input.customer.email))
            .one(&txn)
            .await?;

        let customer_id = match existing {
            Some(found) => {
                let customer_id = found.id;
                let mut active: customer::ActiveModel = found.into();
                if input.customer.name.is_some() {
                    active.name = Set(input.customer.name.clone());
                }
                if input.customer.phone.is_some() {
                    active.phone = Set(input.customer.phone.clone());
                }
                active.updated_at = Set(now);
                active.update(&txn).await?;
                customer_id
            }
            None => {
                let customer_id = Uuid::new_v4();
                let active = customer::ActiveModel {
                    id: Set(customer_id),
                    email: Set(input.customer.email.clone()),
                    name: Set(input.customer.name.clone()),
                    phone: Set(input.customer.phone.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&txn).await?;
                customer_id
            }
        };

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(customer_id),
            service_type: Set(service_type),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total_amount),
            currency: Set(self.currency.clone()),
            payload: Set(payload),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        order.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order intake transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, order_number = %order_number, total_amount, "Order created");

        if let Err(e) = self.event_sender.send(Event::OrderCreated(order_id)).await {
            warn!(error = %e, order_id = %order_id, "Failed to send order created event");
        }

        let email = self
            .send_confirmation(&input.customer.email, &order_number, total_amount)
            .await;

        Ok(OrderIntakeOutcome {
            order_id,
            order_number,
            total_amount,
            currency: self.currency.clone(),
            email,
        })
    }

    /// Fetches an order by its public identifier.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_number: &str) -> Result<order::Model, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))
    }

    /// Best-effort delivery to the customer and the operator. Failures are
    /// collapsed into the outcome and never propagated.
    async fn send_confirmation(
        &self,
        customer_email: &str,
        order_number: &str,
        total_amount: i64,
    ) -> MailOutcome {
        let subject = format!("Order {} received", order_number);
        let body = format!(
            "Your order {} has been received.\nTotal: {}.{:02} {}\nWe will contact you shortly.",
            order_number,
            total_amount / 100,
            total_amount % 100,
            self.currency,
        );

        let mut recipients = vec![customer_email.to_string()];
        if let Some(operator) = &self.operator_email {
            recipients.push(operator.clone());
        }

        let mut outcome = MailOutcome {
            sent: true,
            error: None,
        };
        for to in recipients {
            if let Err(e) = self.mailer.send(&to, &subject, &body).await {
                warn!(error = %e, to = %to, order_number, "Confirmation email failed");
                outcome.sent = false;
                if outcome.error.is_none() {
                    outcome.error = Some(e.to_string());
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(name: &str, price: Decimal, quantity: Option<u32>) -> ServiceLineInput {
        ServiceLineInput {
            name: name.to_string(),
            price,
            quantity,
        }
    }

    #[test]
    fn empty_service_list_totals_zero() {
        assert_eq!(total_minor_units(&[]).unwrap(), 0);
    }

    #[test]
    fn total_is_price_times_quantity_in_minor_units() {
        let services = vec![line("A", dec!(1000), Some(2))];
        assert_eq!(total_minor_units(&services).unwrap(), 200_000);
    }

    #[test]
    fn missing_quantity_defaults_to_one() {
        let services = vec![line("A", dec!(19.99), None)];
        assert_eq!(total_minor_units(&services).unwrap(), 1_999);
    }

    #[test]
    fn fractional_totals_round_to_nearest_minor_unit() {
        let services = vec![line("A", dec!(33.33), Some(3))];
        assert_eq!(total_minor_units(&services).unwrap(), 9_999);
    }

    #[test]
    fn midpoint_totals_round_away_from_zero() {
        // 33.335 -> 3333.5 minor units -> 3334
        let services = vec![line("A", dec!(33.335), Some(1))];
        assert_eq!(total_minor_units(&services).unwrap(), 3_334);
        // 0.005 -> 0.5 minor units -> 1
        let services = vec![line("B", dec!(0.005), Some(1))];
        assert_eq!(total_minor_units(&services).unwrap(), 1);
    }

    #[test]
    fn negative_price_is_rejected() {
        let services = vec![line("A", dec!(-10), None)];
        assert!(total_minor_units(&services).is_err());
    }

    #[test]
    fn multiple_lines_accumulate() {
        let services = vec![
            line("Coffin", dec!(1500.50), Some(1)),
            line("Flowers", dec!(45.25), Some(4)),
        ];
        // 1500.50 + 181.00 = 1681.50 -> 168150
        assert_eq!(total_minor_units(&services).unwrap(), 168_150);
    }

    #[test]
    fn order_numbers_have_public_prefix_and_are_distinct() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("MEM-"));
        assert_ne!(a, b);
    }
}
