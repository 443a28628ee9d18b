use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by the order/payment lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentCreated {
        payment_id: Uuid,
        order_id: Uuid,
    },
    PaymentStatusChanged {
        payment_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes lifecycle events for the duration of the process. Today this is
/// a logging sink; downstream integrations subscribe here when they exist.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, old_status, new_status, "Order status changed");
            }
            Event::PaymentCreated {
                payment_id,
                order_id,
            } => {
                info!(payment_id = %payment_id, order_id = %order_id, "Payment created");
            }
            Event::PaymentStatusChanged {
                payment_id,
                old_status,
                new_status,
            } => {
                info!(payment_id = %payment_id, old_status, new_status, "Payment status changed");
            }
        }
        debug!(?event, "Event processed");
    }
    info!("Event processor stopped");
}
