use super::{action_from_ratio, combine, finish_signal, Analyst, SubScore};
use crate::reasoner::Reasoner;
use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{Action, AgentId, MarketContext, Signal};
use std::sync::Arc;

const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 20;

/// Price-trend screen filling the roster's technical slot: lookback
/// return, moving-average posture, and drawdown from the window high.
pub struct MomentumAnalyst {
    reasoner: Arc<dyn Reasoner>,
}

impl MomentumAnalyst {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Analyst for MomentumAnalyst {
    fn id(&self) -> AgentId {
        AgentId::new("momentum")
    }

    async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError> {
        let closes = context.price_history();

        if closes.len() < LONG_WINDOW {
            let mut summary = combine(&[]);
            summary.details.push(format!(
                "Only {} closes available, need {} for trend analysis",
                closes.len(),
                LONG_WINDOW
            ));
            // Not enough history to have a view either way.
            return finish_signal(&self.reasoner, self.id(), context, Action::Hold, summary)
                .await;
        }

        let trend = analyze_trend(closes);
        let posture = analyze_ma_posture(closes);

        let summary = combine(&[trend, posture]);
        let proposed = action_from_ratio(summary.ratio());

        finish_signal(&self.reasoner, self.id(), context, proposed, summary).await
    }
}

fn analyze_trend(closes: &[f64]) -> SubScore {
    let mut result = SubScore::new(3);

    let start = closes[closes.len() - LONG_WINDOW];
    let latest = closes[closes.len() - 1];
    if start <= 0.0 {
        result.note("Unusable price history (non-positive close)");
        return result;
    }

    let lookback_return = (latest - start) / start;
    result.note(format!(
        "{}-period return {:.1}%",
        LONG_WINDOW,
        lookback_return * 100.0
    ));
    if lookback_return > 0.10 {
        result.add(2, "Strong positive trend over the lookback window");
    } else if lookback_return > 0.0 {
        result.add(1, "Mildly positive trend over the lookback window");
    }

    let window_high = closes[closes.len() - LONG_WINDOW..]
        .iter()
        .cloned()
        .fold(f64::MIN, f64::max);
    if window_high > 0.0 && latest >= window_high * 0.95 {
        result.add(1, "Trading within 5% of the window high");
    } else {
        result.note("Well off the window high");
    }

    result
}

fn analyze_ma_posture(closes: &[f64]) -> SubScore {
    let mut result = SubScore::new(3);

    let mean = |window: &[f64]| window.iter().sum::<f64>() / window.len() as f64;
    let short_ma = mean(&closes[closes.len() - SHORT_WINDOW..]);
    let long_ma = mean(&closes[closes.len() - LONG_WINDOW..]);
    let latest = closes[closes.len() - 1];

    if long_ma <= 0.0 {
        result.note("Unusable moving averages");
        return result;
    }

    if short_ma > long_ma * 1.02 {
        result.add(2, "Short MA more than 2% above long MA");
    } else if short_ma > long_ma {
        result.add(1, "Short MA above long MA");
    } else {
        result.note("Short MA below long MA");
    }

    if latest > long_ma {
        result.add(1, "Price above the long MA");
    } else {
        result.note("Price below the long MA");
    }

    result
}
