use super::{Gate, GateDecision, RiskContext};
use fund_core::model::{Action, ConsensusOpinion, VetoReason};

/// Vetoes opinions whose consensus strength is below the configured
/// minimum. HOLD passes through; there is nothing to act on anyway.
pub struct ConfidenceGate;

impl Gate for ConfidenceGate {
    fn name(&self) -> &str {
        "Confidence"
    }

    fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> GateDecision {
        if opinion.action() == Action::Hold {
            return GateDecision::Pass;
        }
        if opinion.strength() < ctx.limits.min_confidence_to_act {
            return GateDecision::Veto(VetoReason::LowConfidence);
        }
        GateDecision::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use fund_core::config::RiskLimits;
    use fund_core::model::PortfolioState;
    use std::collections::HashMap;

    #[test]
    fn test_strength_below_threshold_is_vetoed() {
        let mut limits = RiskLimits::default();
        limits.min_confidence_to_act = 0.3;
        let portfolio = PortfolioState::with_cash(10_000.0);
        let prices = prices_with(&[]);
        let sectors = HashMap::new();
        let ctx = RiskContext {
            portfolio: &portfolio,
            prices: &prices,
            sectors: &sectors,
            limits: &limits,
            equity: 10_000.0,
        };

        // Strength from the aggregator's split-opinion scenario: 0.217.
        let weak = opinion("A", Action::Buy, 0.5 / 2.3);
        assert_eq!(
            ConfidenceGate.check(&weak, &ctx),
            GateDecision::Veto(VetoReason::LowConfidence)
        );

        let strong = opinion("A", Action::Buy, 0.31);
        assert_eq!(ConfidenceGate.check(&strong, &ctx), GateDecision::Pass);

        // Exactly at the threshold acts; the veto is strictly below.
        let boundary = opinion("A", Action::Buy, 0.3);
        assert_eq!(ConfidenceGate.check(&boundary, &ctx), GateDecision::Pass);
    }
}
