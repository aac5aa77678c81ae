use super::instrument::InstrumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for one analyst in the roster.
/// e.g. "graham", "buffett", "momentum"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        write!(f, "{}", name)
    }
}

/// One agent's opinion on one instrument for one cycle. Immutable once
/// created; confidence is clamped into [0, 1] at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    agent_id: AgentId,
    instrument: InstrumentId,
    action: Action,
    confidence: f64,
    rationale: String,
    produced_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        agent_id: AgentId,
        instrument: InstrumentId,
        action: Action,
        confidence: f64,
        rationale: impl Into<String>,
        produced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id,
            instrument,
            action,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            produced_at,
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped_at_construction() {
        let s = Signal::new(
            AgentId::new("graham"),
            InstrumentId::new("RELIANCE", "NSE"),
            Action::Buy,
            1.7,
            "overconfident",
            Utc::now(),
        );
        assert_eq!(s.confidence(), 1.0);

        let s = Signal::new(
            AgentId::new("graham"),
            InstrumentId::new("RELIANCE", "NSE"),
            Action::Sell,
            -0.2,
            "underconfident",
            Utc::now(),
        );
        assert_eq!(s.confidence(), 0.0);
    }
}
