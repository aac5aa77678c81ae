use super::{combine, finish_signal, Analyst, SubScore};
use crate::reasoner::Reasoner;
use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{Action, AgentId, FinancialMetrics, MarketContext, Signal};
use std::sync::Arc;

/// Quality-compounder screen: strong fundamentals, consistent earnings,
/// a durable moat, shareholder-friendly management, and a discounted
/// owner-earnings DCF for the margin of safety.
pub struct BuffettAnalyst {
    reasoner: Arc<dyn Reasoner>,
}

// Conservative DCF assumptions over owner earnings.
const GROWTH_RATE: f64 = 0.05;
const DISCOUNT_RATE: f64 = 0.09;
const TERMINAL_MULTIPLE: f64 = 12.0;
const PROJECTION_YEARS: u32 = 10;

impl BuffettAnalyst {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Analyst for BuffettAnalyst {
    fn id(&self) -> AgentId {
        AgentId::new("buffett")
    }

    async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError> {
        let metrics = context.latest_metrics();
        let history = context.history();

        let fundamentals = analyze_fundamentals(metrics);
        let consistency = analyze_consistency(history);
        let moat = analyze_moat(history);
        let management = analyze_management_quality(metrics);

        let mut summary = combine(&[fundamentals, consistency, moat, management]);

        let margin_of_safety = match (calculate_intrinsic_value(metrics), metrics.market_cap) {
            (Some(intrinsic), Some(cap)) if cap > 0.0 => {
                let mos = (intrinsic - cap) / cap;
                summary.details.push(format!(
                    "Intrinsic value {:.0} vs market cap {:.0}, margin of safety {:.1}%",
                    intrinsic,
                    cap,
                    mos * 100.0
                ));
                Some(mos)
            }
            _ => {
                summary
                    .details
                    .push("Intrinsic value unavailable (missing owner-earnings inputs)".into());
                None
            }
        };
        summary.margin_of_safety = margin_of_safety;

        // Bullish needs both a high score and a real discount; a deep
        // premium is bearish on its own.
        let ratio = summary.ratio();
        let proposed = if ratio >= 0.7 && margin_of_safety.map_or(false, |m| m >= 0.3) {
            Action::Buy
        } else if ratio <= 0.3 || margin_of_safety.map_or(false, |m| m < -0.3) {
            Action::Sell
        } else {
            Action::Hold
        };

        finish_signal(&self.reasoner, self.id(), context, proposed, summary).await
    }
}

fn analyze_fundamentals(metrics: &FinancialMetrics) -> SubScore {
    let mut result = SubScore::new(7);

    match metrics.return_on_equity {
        Some(roe) if roe > 0.15 => result.add(2, format!("Strong ROE of {:.1}%", roe * 100.0)),
        Some(roe) => result.note(format!("Weak ROE of {:.1}%", roe * 100.0)),
        None => result.note("ROE data not available"),
    }

    match metrics.debt_to_equity_ratio {
        Some(de) if de < 0.5 => result.add(2, "Conservative debt levels"),
        Some(de) => result.note(format!("High debt to equity ratio of {:.1}", de)),
        None => result.note("Debt to equity data not available"),
    }

    match metrics.operating_margin {
        Some(margin) if margin > 0.15 => result.add(2, "Strong operating margins"),
        Some(margin) => result.note(format!("Weak operating margin of {:.1}%", margin * 100.0)),
        None => result.note("Operating margin data not available"),
    }

    match metrics.current_ratio {
        Some(ratio) if ratio > 1.5 => result.add(1, "Good liquidity position"),
        Some(ratio) => result.note(format!("Weak liquidity with current ratio of {:.1}", ratio)),
        None => result.note("Current ratio data not available"),
    }

    result
}

/// Needs at least four periods of net income, each growing on the last.
fn analyze_consistency(history: &[FinancialMetrics]) -> SubScore {
    let mut result = SubScore::new(3);

    let earnings: Vec<f64> = history.iter().filter_map(|m| m.net_income).collect();
    if earnings.len() < 4 {
        result.note("Insufficient earnings data for trend analysis");
        return result;
    }

    let growing = earnings.windows(2).all(|pair| pair[1] > pair[0]);
    if growing {
        result.add(3, "Consistent earnings growth over past periods");
    } else {
        result.note("Inconsistent earnings growth pattern");
    }

    let oldest = earnings[0];
    if oldest != 0.0 {
        let growth_rate = (earnings[earnings.len() - 1] - oldest) / oldest.abs();
        result.note(format!(
            "Total earnings growth of {:.1}% over {} periods",
            growth_rate * 100.0,
            earnings.len()
        ));
    }

    result
}

/// Stability of ROE and operating margins over multiple periods as a
/// proxy for a durable competitive advantage.
fn analyze_moat(history: &[FinancialMetrics]) -> SubScore {
    let mut result = SubScore::new(3);

    if history.len() < 3 {
        result.note("Insufficient data for moat analysis");
        return result;
    }

    let roes: Vec<f64> = history.iter().filter_map(|m| m.return_on_equity).collect();
    let margins: Vec<f64> = history.iter().filter_map(|m| m.operating_margin).collect();

    let mut stable_parts = 0;
    if roes.len() >= 3 {
        if roes.iter().all(|r| *r > 0.15) {
            result.add(1, "Stable ROE above 15% across periods (suggests moat)");
            stable_parts += 1;
        } else {
            result.note("ROE not consistently above 15%");
        }
    }
    if margins.len() >= 3 {
        if margins.iter().all(|m| *m > 0.15) {
            result.add(1, "Stable operating margins above 15% (moat indicator)");
            stable_parts += 1;
        } else {
            result.note("Operating margin not consistently above 15%");
        }
    }
    if stable_parts == 2 {
        result.add(1, "Both ROE and margin stability indicate a solid moat");
    }

    result
}

/// Buybacks and dividends read as shareholder-friendly; fresh issuance
/// reads as dilution.
fn analyze_management_quality(metrics: &FinancialMetrics) -> SubScore {
    let mut result = SubScore::new(2);

    match metrics.issuance_or_purchase_of_equity_shares {
        Some(flow) if flow < 0.0 => {
            result.add(1, "Company has been repurchasing shares (shareholder-friendly)")
        }
        Some(flow) if flow > 0.0 => {
            result.note("Recent common stock issuance (potential dilution)")
        }
        _ => result.note("No significant new stock issuance detected"),
    }

    match metrics.dividends_and_other_cash_distributions {
        Some(dividends) if dividends < 0.0 => {
            result.add(1, "Company has a track record of paying dividends")
        }
        _ => result.note("No or minimal dividends paid"),
    }

    result
}

/// Owner earnings: net income + depreciation - maintenance capex
/// (estimated at 75% of total capex).
fn calculate_owner_earnings(metrics: &FinancialMetrics) -> Option<f64> {
    let net_income = metrics.net_income?;
    let depreciation = metrics.depreciation_and_amortization?;
    let capex = metrics.capital_expenditure?;
    Some(net_income + depreciation - capex * 0.75)
}

/// Ten-year DCF over owner earnings plus a terminal multiple.
fn calculate_intrinsic_value(metrics: &FinancialMetrics) -> Option<f64> {
    let owner_earnings = calculate_owner_earnings(metrics)?;
    metrics.outstanding_shares?;

    let mut future_value = 0.0;
    for year in 1..=PROJECTION_YEARS {
        let future_earnings = owner_earnings * (1.0 + GROWTH_RATE).powi(year as i32);
        future_value += future_earnings / (1.0 + DISCOUNT_RATE).powi(year as i32);
    }
    let terminal = owner_earnings * (1.0 + GROWTH_RATE).powi(PROJECTION_YEARS as i32)
        * TERMINAL_MULTIPLE
        / (1.0 + DISCOUNT_RATE).powi(PROJECTION_YEARS as i32);

    Some(future_value + terminal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_period() -> FinancialMetrics {
        FinancialMetrics {
            return_on_equity: Some(0.22),
            operating_margin: Some(0.25),
            ..Default::default()
        }
    }

    #[test]
    fn test_fundamentals_full_score() {
        let metrics = FinancialMetrics {
            return_on_equity: Some(0.20),
            debt_to_equity_ratio: Some(0.3),
            operating_margin: Some(0.22),
            current_ratio: Some(2.1),
            ..Default::default()
        };
        let score = analyze_fundamentals(&metrics);
        assert_eq!(score.score, 7);
        assert_eq!(score.max_score, 7);
    }

    #[test]
    fn test_moat_requires_joint_stability() {
        let history = vec![strong_period(), strong_period(), strong_period()];
        let score = analyze_moat(&history);
        assert_eq!(score.score, 3);

        let mut wobbly = strong_period();
        wobbly.operating_margin = Some(0.10);
        let history = vec![strong_period(), wobbly, strong_period()];
        let score = analyze_moat(&history);
        assert_eq!(score.score, 1);
    }

    #[test]
    fn test_consistency_needs_monotonic_growth() {
        let income = |v: f64| FinancialMetrics {
            net_income: Some(v),
            ..Default::default()
        };
        let growing = vec![income(100.0), income(120.0), income(150.0), income(190.0)];
        assert_eq!(analyze_consistency(&growing).score, 3);

        let choppy = vec![income(100.0), income(90.0), income(150.0), income(190.0)];
        assert_eq!(analyze_consistency(&choppy).score, 0);
    }

    #[test]
    fn test_intrinsic_value_requires_owner_earnings_inputs() {
        let mut metrics = FinancialMetrics {
            net_income: Some(1_000.0),
            depreciation_and_amortization: Some(200.0),
            capital_expenditure: Some(400.0),
            outstanding_shares: Some(100.0),
            ..Default::default()
        };
        let value = calculate_intrinsic_value(&metrics).unwrap();
        // Owner earnings 900; a 10y DCF at 5%/9% lands well above one year.
        assert!(value > 900.0 * 10.0);

        metrics.capital_expenditure = None;
        assert!(calculate_intrinsic_value(&metrics).is_none());
    }
}
