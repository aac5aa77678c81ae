use super::{action_from_ratio, combine, finish_signal, Analyst, SubScore};
use crate::reasoner::Reasoner;
use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{AgentId, FinancialMetrics, MarketContext, Signal};
use std::sync::Arc;

/// Classic value screen: earnings stability over multiple years, solid
/// financial strength, and a discount to intrinsic value (Graham Number
/// or net-net), with an adequate margin of safety.
pub struct GrahamAnalyst {
    reasoner: Arc<dyn Reasoner>,
}

impl GrahamAnalyst {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Analyst for GrahamAnalyst {
    fn id(&self) -> AgentId {
        AgentId::new("graham")
    }

    async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError> {
        let history = context.history();
        let metrics = context.latest_metrics();

        let earnings = analyze_earnings_stability(history);
        let strength = analyze_financial_strength(history);
        let valuation = analyze_valuation(metrics, history);

        let summary = combine(&[earnings, strength, valuation]);
        let proposed = action_from_ratio(summary.ratio());

        finish_signal(&self.reasoner, self.id(), context, proposed, summary).await
    }
}

/// Wants several years of consistently positive EPS, ideally growing from
/// earliest to latest period.
fn analyze_earnings_stability(history: &[FinancialMetrics]) -> SubScore {
    let mut result = SubScore::new(4);

    let eps: Vec<f64> = history
        .iter()
        .filter_map(|m| m.earnings_per_share)
        .collect();

    if eps.len() < 2 {
        result.note("Not enough multi-year EPS data");
        return result;
    }

    let positive_years = eps.iter().filter(|e| **e > 0.0).count();
    if positive_years == eps.len() {
        result.add(3, "EPS was positive in all available periods");
    } else if positive_years as f64 >= eps.len() as f64 * 0.8 {
        result.add(2, "EPS was positive in most periods");
    } else {
        result.note("EPS was negative in multiple periods");
    }

    if eps[eps.len() - 1] > eps[0] {
        result.add(1, "EPS grew from earliest to latest period");
    } else {
        result.note("EPS did not grow from earliest to latest period");
    }

    result
}

/// Liquidity (current ratio >= 2), manageable debt, and some dividend
/// record.
fn analyze_financial_strength(history: &[FinancialMetrics]) -> SubScore {
    let mut result = SubScore::new(5);

    let latest = match history.last() {
        Some(latest) => latest,
        None => {
            result.note("No data for financial strength analysis");
            return result;
        }
    };

    let current_assets = latest.current_assets.unwrap_or(0.0);
    let current_liabilities = latest.current_liabilities.unwrap_or(0.0);
    if current_liabilities > 0.0 {
        let current_ratio = current_assets / current_liabilities;
        if current_ratio >= 2.0 {
            result.add(2, format!("Current ratio {:.2} (>=2.0: solid)", current_ratio));
        } else if current_ratio >= 1.5 {
            result.add(
                1,
                format!("Current ratio {:.2} (moderately strong)", current_ratio),
            );
        } else {
            result.note(format!(
                "Current ratio {:.2} (<1.5: weaker liquidity)",
                current_ratio
            ));
        }
    } else {
        result.note("Cannot compute current ratio");
    }

    let total_assets = latest.total_assets.unwrap_or(0.0);
    let total_liabilities = latest.total_liabilities.unwrap_or(0.0);
    if total_assets > 0.0 {
        let debt_ratio = total_liabilities / total_assets;
        if debt_ratio < 0.5 {
            result.add(2, format!("Debt ratio {:.2}, under 0.50", debt_ratio));
        } else if debt_ratio < 0.8 {
            result.add(1, format!("Debt ratio {:.2}, somewhat high", debt_ratio));
        } else {
            result.note(format!("Debt ratio {:.2}, high by Graham standards", debt_ratio));
        }
    } else {
        result.note("Cannot compute debt ratio");
    }

    // Dividend outflow is reported as a negative cash distribution.
    let dividend_periods: Vec<f64> = history
        .iter()
        .filter_map(|m| m.dividends_and_other_cash_distributions)
        .collect();
    if dividend_periods.is_empty() {
        result.note("No dividend data available");
    } else {
        let paid_years = dividend_periods.iter().filter(|d| **d < 0.0).count();
        if paid_years >= dividend_periods.len() / 2 + 1 {
            result.add(1, "Dividends paid in the majority of reported years");
        } else if paid_years > 0 {
            result.note("Some dividend payments, but not most years");
        } else {
            result.note("No dividends paid in these periods");
        }
    }

    result
}

/// Net-net check (NCAV vs market cap) plus Graham Number margin of
/// safety: sqrt(22.5 * EPS * book value per share) against the current
/// per-share price.
fn analyze_valuation(metrics: &FinancialMetrics, history: &[FinancialMetrics]) -> SubScore {
    let mut result = SubScore::new(7);

    let market_cap = metrics.market_cap.unwrap_or(0.0);
    let latest = match history.last() {
        Some(latest) if market_cap > 0.0 => latest,
        _ => {
            result.note("Insufficient data to perform valuation");
            return result;
        }
    };

    let current_assets = latest.current_assets.unwrap_or(0.0);
    let total_liabilities = latest.total_liabilities.unwrap_or(0.0);
    let shares = latest.outstanding_shares.unwrap_or(0.0);
    let eps = latest.earnings_per_share.unwrap_or(0.0);
    let book_value_ps = latest.book_value_per_share.unwrap_or(0.0);

    let ncav = current_assets - total_liabilities;
    if ncav > 0.0 && shares > 0.0 {
        let ncav_per_share = ncav / shares;
        let price_per_share = market_cap / shares;
        if ncav > market_cap {
            result.add(4, "Net-net: NCAV exceeds market cap (classic deep value)");
        } else if ncav_per_share >= price_per_share * 0.67 {
            result.add(2, "NCAV per share >= 2/3 of price (moderate net-net discount)");
        } else {
            result.note("No meaningful net-net discount");
        }
    } else {
        result.note("Insufficient data for the net-net approach");
    }

    if eps > 0.0 && book_value_ps > 0.0 && shares > 0.0 {
        let graham_number = (22.5 * eps * book_value_ps).sqrt();
        let current_price = market_cap / shares;
        if current_price > 0.0 {
            let margin_of_safety = (graham_number - current_price) / current_price;
            result.note(format!(
                "Graham Number {:.2}, margin of safety {:.1}%",
                graham_number,
                margin_of_safety * 100.0
            ));
            if margin_of_safety > 0.5 {
                result.add(3, "Price well below Graham Number (>=50% margin)");
            } else if margin_of_safety > 0.2 {
                result.add(1, "Some margin of safety relative to Graham Number");
            } else {
                result.note("Price close to or above Graham Number");
            }
        }
    } else {
        result.note("Unable to compute Graham Number");
    }

    result
}
