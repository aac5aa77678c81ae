use super::instrument::InstrumentId;
use super::signal::Action;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal artifact of one cycle. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    instrument: InstrumentId,
    action: Action,
    quantity: f64,
    max_price: Option<f64>,
    risk_score: f64,
    timestamp: i64,
}

impl Order {
    pub fn new(
        id: Uuid,
        instrument: InstrumentId,
        action: Action,
        quantity: f64,
        max_price: Option<f64>,
        risk_score: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            instrument,
            action,
            quantity,
            max_price,
            risk_score,
            timestamp,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
