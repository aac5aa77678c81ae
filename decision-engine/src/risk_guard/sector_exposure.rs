use super::{Gate, GateDecision, RiskContext};
use fund_core::model::{Action, ConsensusOpinion, Sector, VetoReason};

/// Bounds aggregate exposure of one sector, including the candidate, to
/// a fraction of total equity. Same shrink-then-veto policy as the
/// per-instrument gate. Instruments the provider could not classify
/// count toward `Unclassified`, which is bounded like any other sector.
pub struct SectorExposureGate;

impl Gate for SectorExposureGate {
    fn name(&self) -> &str {
        "SectorExposure"
    }

    fn check(&self, opinion: &ConsensusOpinion, ctx: &RiskContext) -> GateDecision {
        if opinion.action() != Action::Buy {
            return GateDecision::Pass;
        }

        let sector = ctx
            .sectors
            .get(opinion.instrument())
            .copied()
            .unwrap_or(Sector::Unclassified);

        let mut sector_exposure = 0.0;
        for (held, _) in ctx.portfolio.positions() {
            let held_sector = ctx
                .sectors
                .get(held)
                .copied()
                .unwrap_or(Sector::Unclassified);
            if held_sector == sector {
                sector_exposure += ctx.portfolio.exposure(held, ctx.prices);
            }
        }

        let limit = ctx.equity * ctx.limits.max_sector_exposure_pct;
        let headroom = limit - sector_exposure;

        if headroom <= 0.0 {
            return GateDecision::Veto(VetoReason::SectorExposure);
        }
        GateDecision::Shrink(headroom)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use fund_core::config::RiskLimits;
    use fund_core::model::{InstrumentId, PortfolioState};
    use std::collections::HashMap;

    fn sector_map(entries: &[(&str, Sector)]) -> HashMap<InstrumentId, Sector> {
        entries
            .iter()
            .map(|(sym, sector)| (instrument(sym), *sector))
            .collect()
    }

    #[test]
    fn test_sector_headroom_counts_existing_holdings() {
        let limits = RiskLimits::default(); // 40% per sector
        let prices = prices_with(&[("HDFC", 100.0), ("ICICI", 50.0)]);
        let sectors = sector_map(&[
            ("HDFC", Sector::Financials),
            ("ICICI", Sector::Financials),
            ("INFY", Sector::Technology),
        ]);

        // 30 HDFC @ 100 = 3,000 financials exposure on 10,000 equity;
        // sector cap is 4,000.
        let mut portfolio = PortfolioState::with_cash(7_000.0);
        portfolio.set_position(instrument("HDFC"), 30.0, 100.0);
        let ctx = RiskContext {
            portfolio: &portfolio,
            prices: &prices,
            sectors: &sectors,
            limits: &limits,
            equity: 10_000.0,
        };

        assert_eq!(
            SectorExposureGate.check(&opinion("ICICI", Action::Buy, 0.8), &ctx),
            GateDecision::Shrink(1_000.0)
        );

        // A different sector is unaffected by financials exposure.
        assert_eq!(
            SectorExposureGate.check(&opinion("INFY", Action::Buy, 0.8), &ctx),
            GateDecision::Shrink(4_000.0)
        );
    }

    #[test]
    fn test_saturated_sector_vetoes() {
        let limits = RiskLimits::default();
        let prices = prices_with(&[("HDFC", 100.0), ("ICICI", 50.0)]);
        let sectors = sector_map(&[
            ("HDFC", Sector::Financials),
            ("ICICI", Sector::Financials),
        ]);

        let mut portfolio = PortfolioState::with_cash(6_000.0);
        portfolio.set_position(instrument("HDFC"), 40.0, 100.0);
        let ctx = RiskContext {
            portfolio: &portfolio,
            prices: &prices,
            sectors: &sectors,
            limits: &limits,
            equity: 10_000.0,
        };

        assert_eq!(
            SectorExposureGate.check(&opinion("ICICI", Action::Buy, 0.8), &ctx),
            GateDecision::Veto(VetoReason::SectorExposure)
        );
    }
}
