use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fund_core::error::GatewayError;
use fund_core::model::{Action, InstrumentId, Order, Price, Prices};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub order_id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

/// Asynchronous confirmation from the broker side. Feeding these into
/// `Pipeline::on_execution_report` is the only path that mutates
/// portfolio state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionReport {
    Filled {
        order_id: Uuid,
        instrument: InstrumentId,
        action: Action,
        quantity: f64,
        price: f64,
    },
    PartiallyFilled {
        order_id: Uuid,
        instrument: InstrumentId,
        action: Action,
        quantity: f64,
        price: f64,
    },
    Rejected {
        order_id: Uuid,
        reason: String,
    },
}

/// External order-routing collaborator.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn submit(&self, order: &Order) -> Result<SubmitAck, GatewayError>;
}

/// In-process gateway that fills every order immediately at the last
/// known price and pushes the report onto a channel, standing in for a
/// real broker adapter.
pub struct PaperGateway {
    prices: Mutex<Prices>,
    reports: mpsc::UnboundedSender<ExecutionReport>,
}

impl PaperGateway {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExecutionReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                prices: Mutex::new(Prices::default()),
                reports: tx,
            },
            rx,
        )
    }

    pub fn set_price(&self, price: Price) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(price.instrument().clone(), price);
        }
    }

    fn fill_price(&self, order: &Order) -> Option<f64> {
        let prices = self.prices.lock().ok()?;
        prices
            .get(order.instrument())
            .map(|p| p.last())
            .or(order.max_price())
    }
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    async fn submit(&self, order: &Order) -> Result<SubmitAck, GatewayError> {
        let report = match self.fill_price(order) {
            Some(price) if price > 0.0 => ExecutionReport::Filled {
                order_id: order.id(),
                instrument: order.instrument().clone(),
                action: order.action(),
                quantity: order.quantity(),
                price,
            },
            _ => ExecutionReport::Rejected {
                order_id: order.id(),
                reason: "no market price".into(),
            },
        };

        self.reports
            .send(report)
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        Ok(SubmitAck {
            order_id: order.id(),
            accepted_at: Utc::now(),
        })
    }
}
