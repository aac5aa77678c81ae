use super::{Gate, GateDecision, RiskContext};
use fund_core::model::{Action, ConsensusOpinion, VetoReason};

/// System-wide circuit breaker: once equity has fallen to the configured
/// drawdown from its peak, every BUY is vetoed regardless of opinion
/// strength until the portfolio recovers. SELL and HOLD pass; reducing
/// risk is exactly what a drawdown calls for.
pub struct DrawdownGate;

impl Gate for DrawdownGate {
    fn name(&self) -> &str {
        "DrawdownBreaker"
    }

    fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> GateDecision {
        if opinion.action() != Action::Buy {
            return GateDecision::Pass;
        }

        let peak = ctx.portfolio.peak_equity();
        if peak <= 0.0 {
            return GateDecision::Pass;
        }

        let floor = peak * (1.0 - ctx.limits.max_portfolio_drawdown_pct);
        if ctx.equity <= floor {
            return GateDecision::Veto(VetoReason::DrawdownBreaker);
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

    fn ctx_with_equity<'a>(
        portfolio: &'a PortfolioState,
        prices: &'a fund_core::model::Prices,
        sectors: &'a HashMap<fund_core::model::InstrumentId, fund_core::model::Sector>,
        limits: &'a RiskLimits,
        equity: f64,
    ) -> RiskContext<'a> {
        RiskContext {
            portfolio,
            prices,
            sectors,
            limits,
            equity,
        }
    }

    #[test]
    fn test_breaker_trips_at_exact_threshold() {
        let limits = RiskLimits::default(); // 20% max drawdown
        let prices = prices_with(&[]);
        let sectors = HashMap::new();

        let mut portfolio = PortfolioState::with_cash(10_000.0);
        portfolio.deposit(0.0); // peak stays 10,000

        // Equity exactly at (1 - 0.20) * peak trips the breaker.
        let ctx = ctx_with_equity(&portfolio, &prices, &sectors, &limits, 8_000.0);
        assert_eq!(
            DrawdownGate.check(&opinion("A", Action::Buy, 0.9), &ctx),
            GateDecision::Veto(VetoReason::DrawdownBreaker)
        );

        // SELL in the same conditions still passes.
        assert_eq!(
            DrawdownGate.check(&opinion("A", Action::Sell, 0.9), &ctx),
            GateDecision::Pass
        );

        // A hair above the floor does not trip.
        let ctx = ctx_with_equity(&portfolio, &prices, &sectors, &limits, 8_000.01);
        assert_eq!(
            DrawdownGate.check(&opinion("A", Action::Buy, 0.9), &ctx),
            GateDecision::Pass
        );
    }
}
