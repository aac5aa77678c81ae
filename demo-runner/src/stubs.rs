//! Scripted stand-ins for the external collaborators, so the pipeline
//! can be driven end to end without a market feed or an LLM.

use analyst_pool::market_data::MarketDataProvider;
use analyst_pool::reasoner::{ReasonRequest, ReasonedSignal, Reasoner};
use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{FinancialMetrics, InstrumentId, MarketContext, Price, Sector};
use std::collections::HashMap;

/// Echoes the analyst's proposed action and derives confidence from the
/// score ratio on the collaborator's native 0-100 scale. Deterministic,
/// which keeps demo cycles replayable.
pub struct HeuristicReasoner;

#[async_trait]
impl Reasoner for HeuristicReasoner {
    async fn reason(&self, request: &ReasonRequest) -> Result<ReasonedSignal, AgentError> {
        let ratio = request.summary.ratio();
        let mut rationale = format!(
            "{} scored {} of {} on {}",
            request.agent_id,
            request.summary.total_score,
            request.summary.max_score,
            request.instrument
        );
        if let Some(mos) = request.summary.margin_of_safety {
            rationale.push_str(&format!(", margin of safety {:.0}%", mos * 100.0));
        }
        Ok(ReasonedSignal {
            action: request.proposed_action,
            confidence: 50.0 + 45.0 * ratio,
            rationale,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Profile {
    Strong,
    Mixed,
    Weak,
}

const SECTORS: [Sector; 4] = [
    Sector::Technology,
    Sector::Financials,
    Sector::Energy,
    Sector::Consumer,
];

fn period(profile: Profile, step: usize) -> FinancialMetrics {
    match profile {
        Profile::Strong => FinancialMetrics {
            net_income: Some(200_000.0 + 25_000.0 * step as f64),
            depreciation_and_amortization: Some(50_000.0),
            capital_expenditure: Some(40_000.0),
            outstanding_shares: Some(100_000.0),
            total_assets: Some(3_000_000.0),
            total_liabilities: Some(600_000.0),
            current_assets: Some(1_800_000.0),
            current_liabilities: Some(600_000.0),
            dividends_and_other_cash_distributions: Some(-40_000.0),
            issuance_or_purchase_of_equity_shares: Some(-15_000.0),
            return_on_equity: Some(0.21),
            debt_to_equity_ratio: Some(0.25),
            operating_margin: Some(0.22),
            current_ratio: Some(3.0),
            earnings_per_share: Some(2.0 + 0.25 * step as f64),
            book_value_per_share: Some(18.0),
            market_cap: Some(1_200_000.0),
            ..Default::default()
        },
        Profile::Mixed => FinancialMetrics {
            net_income: Some(100_000.0 + if step % 2 == 0 { 10_000.0 } else { -5_000.0 }),
            outstanding_shares: Some(100_000.0),
            total_assets: Some(2_000_000.0),
            total_liabilities: Some(1_200_000.0),
            current_assets: Some(700_000.0),
            current_liabilities: Some(450_000.0),
            return_on_equity: Some(0.11),
            debt_to_equity_ratio: Some(0.9),
            operating_margin: Some(0.12),
            current_ratio: Some(1.55),
            earnings_per_share: Some(1.0 + 0.05 * step as f64),
            book_value_per_share: Some(9.0),
            market_cap: Some(2_500_000.0),
            ..Default::default()
        },
        Profile::Weak => FinancialMetrics {
            net_income: Some(40_000.0 - 30_000.0 * step as f64),
            outstanding_shares: Some(100_000.0),
            total_assets: Some(900_000.0),
            total_liabilities: Some(800_000.0),
            current_assets: Some(150_000.0),
            current_liabilities: Some(220_000.0),
            issuance_or_purchase_of_equity_shares: Some(60_000.0),
            return_on_equity: Some(0.03),
            debt_to_equity_ratio: Some(2.8),
            operating_margin: Some(0.02),
            current_ratio: Some(0.7),
            earnings_per_share: Some(0.4 - 0.35 * step as f64),
            book_value_per_share: Some(1.5),
            market_cap: Some(700_000.0),
            ..Default::default()
        },
    }
}

fn closes(profile: Profile) -> Vec<f64> {
    match profile {
        Profile::Strong => (0..30).map(|i| 10.0 + 0.12 * i as f64).collect(),
        Profile::Mixed => (0..30)
            .map(|i| 24.0 + if i % 2 == 0 { 0.4 } else { -0.4 })
            .collect(),
        Profile::Weak => (0..30).map(|i| 90.0 - 1.5 * i as f64).collect(),
    }
}

/// Builds a deterministic context per instrument, cycling profiles and
/// sectors so one demo run exercises buys, holds, and sells.
pub fn demo_contexts(instruments: &[InstrumentId], timestamp: i64) -> Vec<MarketContext> {
    instruments
        .iter()
        .enumerate()
        .map(|(index, instrument)| {
            let profile = match index % 3 {
                0 => Profile::Strong,
                1 => Profile::Mixed,
                _ => Profile::Weak,
            };
            let sector = SECTORS[index % SECTORS.len()];
            let history: Vec<FinancialMetrics> = (0..5).map(|s| period(profile, s)).collect();
            let latest = history[history.len() - 1].clone();
            let price_history = closes(profile);
            let last = price_history[price_history.len() - 1];
            MarketContext::new(
                instrument.clone(),
                sector,
                Price::new(
                    instrument.clone(),
                    last,
                    last * 0.999,
                    last * 1.001,
                    timestamp,
                ),
                latest,
                history,
                price_history,
            )
        })
        .collect()
}

pub struct DemoMarketData {
    contexts: HashMap<InstrumentId, MarketContext>,
}

impl DemoMarketData {
    pub fn new(contexts: Vec<MarketContext>) -> Self {
        Self {
            contexts: contexts
                .into_iter()
                .map(|c| (c.instrument().clone(), c))
                .collect(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for DemoMarketData {
    async fn get_context(&self, instrument: &InstrumentId) -> Result<MarketContext, AgentError> {
        self.contexts
            .get(instrument)
            .cloned()
            .ok_or_else(|| AgentError::MarketData(format!("no demo data for {}", instrument)))
    }
}
