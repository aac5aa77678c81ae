use fund_core::config::RiskLimits;
use fund_core::model::{ConsensusOpinion, InstrumentId, PortfolioState, Prices, Sector, VetoReason};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod confidence;
pub mod drawdown;
pub mod position_limit;
pub mod sector_exposure;

pub use confidence::ConfidenceGate;
pub use drawdown::DrawdownGate;
pub use position_limit::PositionLimitGate;
pub use sector_exposure::SectorExposureGate;

/// Context passed to gates to make decisions. Snapshotted at cycle start
/// and read-only: identical contexts always yield identical decisions.
pub struct RiskContext<'a> {
    pub portfolio: &'a PortfolioState,
    pub prices: &'a Prices,
    pub sectors: &'a HashMap<InstrumentId, Sector>,
    pub limits: &'a RiskLimits,
    /// Equity at cycle start under the snapshot prices.
    pub equity: f64,
}

/// One gate's verdict on one opinion. `Shrink` carries the remaining
/// notional headroom the order may use.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Pass,
    Shrink(f64),
    Veto(VetoReason),
}

pub trait Gate: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> GateDecision;
}

/// An opinion that survived every gate, with the tightest notional cap
/// any shrinking gate imposed. `None` means no gate constrained it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedOpinion {
    opinion: ConsensusOpinion,
    notional_cap: Option<f64>,
}

impl ApprovedOpinion {
    pub fn new(opinion: ConsensusOpinion, notional_cap: Option<f64>) -> Self {
        Self {
            opinion,
            notional_cap,
        }
    }

    pub fn opinion(&self) -> &ConsensusOpinion {
        &self.opinion
    }

    pub fn notional_cap(&self) -> Option<f64> {
        self.notional_cap
    }
}

#[derive(Debug, Clone)]
pub enum RiskOutcome {
    Approved(ApprovedOpinion),
    Vetoed(VetoReason),
}

/// Chains the configured gates in order. Each gate can pass, shrink, or
/// veto; the first veto wins and shrinks accumulate as a running minimum.
///
/// Pure over (opinion, context): no hidden state, so identical inputs
/// replay to identical outcomes.
pub struct RiskManager {
    gates: Vec<Box<dyn Gate>>,
}

impl Default for RiskManager {
    fn default() -> Self {
        Self::with_default_gates()
    }
}

impl RiskManager {
    pub fn new() -> Self {
        Self { gates: Vec::new() }
    }

    /// Standard gate sequence: confidence, position limit, sector
    /// exposure, then the drawdown circuit breaker.
    pub fn with_default_gates() -> Self {
        let mut manager = Self::new();
        manager.add_gate(Box::new(ConfidenceGate));
        manager.add_gate(Box::new(PositionLimitGate));
        manager.add_gate(Box::new(SectorExposureGate));
        manager.add_gate(Box::new(DrawdownGate));
        manager
    }

    pub fn add_gate(&mut self, gate: Box<dyn Gate>) {
        self.gates.push(gate);
    }

    pub fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> RiskOutcome {
        let mut cap: Option<f64> = None;
        for gate in &self.gates {
            match gate.check(opinion, ctx) {
                GateDecision::Pass => continue,
                GateDecision::Shrink(headroom) => {
                    info!(
                        "{} shrank {} to {:.2} notional headroom",
                        gate.name(),
                        opinion.instrument(),
                        headroom
                    );
                    cap = Some(cap.map_or(headroom, |c: f64| c.min(headroom)));
                }
                GateDecision::Veto(reason) => {
                    // A veto is an expected business outcome, but the
                    // breaker tripping means the risk system is actively
                    // protecting capital, so it logs loudly.
                    if reason == VetoReason::DrawdownBreaker {
                        warn!(
                            "{} vetoed {} ({}): portfolio-wide de-risking active",
                            gate.name(),
                            opinion.instrument(),
                            reason
                        );
                    } else {
                        info!(
                            "{} vetoed {} ({})",
                            gate.name(),
                            opinion.instrument(),
                            reason
                        );
                    }
                    return RiskOutcome::Vetoed(reason);
                }
            }
        }
        RiskOutcome::Approved(ApprovedOpinion::new(opinion.clone(), cap))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use fund_core::model::Action;

    #[test]
    fn test_check_is_pure_over_identical_inputs() {
        let manager = RiskManager::with_default_gates();
        let limits = RiskLimits::default();
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[("A", 100.0)]);
        let sectors = HashMap::new();
        let ctx = RiskContext {
            portfolio: &portfolio,
            prices: &prices,
            sectors: &sectors,
            limits: &limits,
            equity: 10_000.0,
        };
        let op = opinion("A", Action::Buy, 0.6);

        for _ in 0..3 {
            match manager.check(&op, &ctx) {
                RiskOutcome::Approved(approved) => {
                    // Position gate headroom: 20% of 10k.
                    assert_eq!(approved.notional_cap(), Some(2_000.0));
                }
                other => panic!("expected approval, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_first_veto_wins() {
        let manager = RiskManager::with_default_gates();
        let mut limits = RiskLimits::default();
        limits.min_confidence_to_act = 0.5;
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[("A", 100.0)]);
        let sectors = HashMap::new();
        let ctx = RiskContext {
            portfolio: &portfolio,
            prices: &prices,
            sectors: &sectors,
            limits: &limits,
            equity: 10_000.0,
        };

        match manager.check(&opinion("A", Action::Buy, 0.2), &ctx) {
            RiskOutcome::Vetoed(reason) => assert_eq!(reason, VetoReason::LowConfidence),
            other => panic!("expected veto, got {:?}", other),
        }
    }
}
