use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

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

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order lifecycle events
    OrderCreated {
        order_id: i32,
        order_number: String,
        to_store_id: i32,
        product_id: i32,
        quantity_cases: i32,
    },
    OrderStatusChanged {
        order_id: i32,
        order_number: String,
        old_status: String,
        new_status: String,
    },
    OrderCancelled {
        order_id: i32,
        order_number: String,
        reason: String,
    },
    OrderFieldsUpdated {
        order_id: i32,
        order_number: String,
    },

    // Inventory ledger events
    InventoryReserved {
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    },
    InventoryReleased {
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    },
    InventoryTransferred {
        from_store_id: i32,
        to_store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    },
    InventoryReceived {
        store_id: i32,
        product_id: i32,
        quantity_cases: i32,
        order_id: i32,
    },
    InventoryAdjusted {
        store_id: i32,
        product_id: i32,
        old_quantity: i32,
        new_quantity: i32,
    },
    LowStockDetected {
        store_id: i32,
        product_id: i32,
        available_cases: i32,
        threshold: i32,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

// Function to process incoming events and distribute them to handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        // Process events based on type
        match event {
            Event::OrderCreated {
                order_id,
                ref order_number,
                ..
            } => {
                if let Err(e) = handle_order_created(order_id, order_number).await {
                    error!(
                        "Failed to handle order created event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderStatusChanged {
                order_id,
                ref order_number,
                ref old_status,
                ref new_status,
            } => {
                info!(
                    "Order {} ({}) transitioned from {} to {}",
                    order_number, order_id, old_status, new_status
                );
            }
            Event::OrderCancelled {
                order_id,
                ref order_number,
                ref reason,
            } => {
                info!(
                    "Order {} ({}) cancelled: {}",
                    order_number, order_id, reason
                );
            }
            Event::LowStockDetected {
                store_id,
                product_id,
                available_cases,
                threshold,
            } => {
                if let Err(e) =
                    handle_low_stock(store_id, product_id, available_cases, threshold).await
                {
                    error!(
                        "Failed to handle low stock event: store_id={}, product_id={}, error={}",
                        store_id, product_id, e
                    );
                }
            }
            Event::InventoryAdjusted {
                store_id,
                product_id,
                old_quantity,
                new_quantity,
            } => {
                info!(
                    "Inventory adjusted: store={}, product={}, {} -> {} cases",
                    store_id, product_id, old_quantity, new_quantity
                );
            }
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events
async fn handle_order_created(order_id: i32, order_number: &str) -> Result<(), String> {
    info!(
        "Processing order created event for order {} ({})",
        order_number, order_id
    );
    Ok(())
}

async fn handle_low_stock(
    store_id: i32,
    product_id: i32,
    available_cases: i32,
    threshold: i32,
) -> Result<(), String> {
    warn!(
        "Low stock alert: product {} at store {} has only {} cases available (threshold {})",
        product_id, store_id, available_cases, threshold
    );
    Ok(())
}
