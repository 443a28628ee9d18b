pub mod health;
pub mod orders;
pub mod payments;
pub mod webhooks;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::Mailer;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<crate::services::orders::OrderIntakeService>,
    pub payments: Arc<crate::services::payments::PaymentService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        cfg: &AppConfig,
    ) -> Self {
        let orders = Arc::new(crate::services::orders::OrderIntakeService::new(
            db.clone(),
            event_sender.clone(),
            mailer,
            cfg.currency.clone(),
            cfg.operator_email.clone(),
        ));
        let payments = Arc::new(crate::services::payments::PaymentService::new(
            db,
            event_sender,
            cfg.public_base_url.clone(),
        ));
        Self { orders, payments }
    }
}
