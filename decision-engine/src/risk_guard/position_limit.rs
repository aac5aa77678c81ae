use super::{Gate, GateDecision, RiskContext};
use fund_core::model::{Action, ConsensusOpinion, VetoReason};

/// Bounds one position's market value to a fraction of total equity.
///
/// Only BUY grows a position, so only BUY is gated. An instrument with
/// remaining headroom gets shrunk to it; one already at or over its cap
/// is vetoed.
pub struct PositionLimitGate;

impl Gate for PositionLimitGate {
    fn name(&self) -> &str {
        "PositionLimit"
    }

    fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> GateDecision {
        if opinion.action() != Action::Buy {
            return GateDecision::Pass;
        }

        let current = ctx.portfolio.exposure(opinion.instrument(), ctx.prices);
        let limit = ctx.equity * ctx.limits.max_position_pct_per_instrument;
        let headroom = limit - current;

        if headroom <= 0.0 {
            return GateDecision::Veto(VetoReason::PositionLimit);
        }
        GateDecision::Shrink(headroom)
    }
}
