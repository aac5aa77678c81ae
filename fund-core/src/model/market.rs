use super::instrument::{InstrumentId, Sector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    instrument: InstrumentId,
    last: f64,
    bid: f64,
    ask: f64,
    timestamp: i64,
}

impl Price {
    pub fn new(instrument: InstrumentId, last: f64, bid: f64, ask: f64, timestamp: i64) -> Self {
        Self {
            instrument,
            last,
            bid,
            ask,
            timestamp,
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn bid(&self) -> f64 {
        self.bid
    }

    pub fn ask(&self) -> f64 {
        self.ask
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prices {
    market_data: HashMap<InstrumentId, Price>,
}

impl Prices {
    pub fn insert(&mut self, instrument: InstrumentId, price: Price) {
        self.market_data.insert(instrument, price);
    }

    pub fn get(&self, instrument: &InstrumentId) -> Option<&Price> {
        self.market_data.get(instrument)
    }

    pub fn contains_key(&self, instrument: &InstrumentId) -> bool {
        self.market_data.contains_key(instrument)
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, InstrumentId, Price> {
        self.market_data.iter()
    }
}

/// One reporting period of fundamentals. Every field is optional: the
/// upstream data provider frequently has gaps, and analysts must score
/// around them rather than fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub net_income: Option<f64>,
    pub depreciation_and_amortization: Option<f64>,
    pub capital_expenditure: Option<f64>,
    pub outstanding_shares: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub working_capital: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub dividends_and_other_cash_distributions: Option<f64>,
    pub issuance_or_purchase_of_equity_shares: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub debt_to_equity_ratio: Option<f64>,
    pub operating_margin: Option<f64>,
    pub current_ratio: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Everything an analyst gets to see about one instrument for one cycle.
///
/// `history` and `price_history` are ordered oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    instrument: InstrumentId,
    sector: Sector,
    price: Price,
    metrics: FinancialMetrics,
    history: Vec<FinancialMetrics>,
    price_history: Vec<f64>,
}

impl MarketContext {
    pub fn new(
        instrument: InstrumentId,
        sector: Sector,
        price: Price,
        metrics: FinancialMetrics,
        history: Vec<FinancialMetrics>,
        price_history: Vec<f64>,
    ) -> Self {
        Self {
            instrument,
            sector,
            price,
            metrics,
            history,
            price_history,
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn metrics(&self) -> &FinancialMetrics {
        &self.metrics
    }

    pub fn history(&self) -> &[FinancialMetrics] {
        &self.history
    }

    pub fn price_history(&self) -> &[f64] {
        &self.price_history
    }

    /// Latest reported period, preferring the explicit snapshot over the
    /// tail of the historical series.
    pub fn latest_metrics(&self) -> &FinancialMetrics {
        &self.metrics
    }
}
