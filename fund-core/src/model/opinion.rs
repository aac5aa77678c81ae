use super::instrument::InstrumentId;
use super::signal::{Action, Signal};
use serde::{Deserialize, Serialize};

/// The aggregated result of all signals for one instrument.
///
/// Created by the aggregator; the risk manager may only weaken it on the
/// way through (veto it outright, or cap the size it can be acted on at).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOpinion {
    instrument: InstrumentId,
    action: Action,
    strength: f64,
    contributing_signals: Vec<Signal>,
    dissent_count: usize,
}

impl ConsensusOpinion {
    pub fn new(
        instrument: InstrumentId,
        action: Action,
        strength: f64,
        contributing_signals: Vec<Signal>,
        dissent_count: usize,
    ) -> Self {
        Self {
            instrument,
            action,
            strength: strength.clamp(0.0, 1.0),
            contributing_signals,
            dissent_count,
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn contributing_signals(&self) -> &[Signal] {
        &self.contributing_signals
    }

    pub fn dissent_count(&self) -> usize {
        self.dissent_count
    }
}
