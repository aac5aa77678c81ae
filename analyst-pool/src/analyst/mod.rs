use crate::reasoner::{ReasonRequest, Reasoner, ScoreSummary};
use async_trait::async_trait;
use chrono::Utc;
use fund_core::error::AgentError;
use fund_core::model::{Action, AgentId, MarketContext, Signal};
use std::sync::Arc;

pub mod buffett;
pub mod graham;
pub mod momentum;

pub use buffett::BuffettAnalyst;
pub use graham::GrahamAnalyst;
pub use momentum::MomentumAnalyst;

/// One reasoning strategy. Stateless and swappable: given instrument
/// context, produce a Signal or fail. Agents must not mutate shared
/// state.
#[async_trait]
pub trait Analyst: Send + Sync {
    fn id(&self) -> AgentId;
    async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError>;
}

/// Result of one sub-analysis (earnings stability, moat, ...).
#[derive(Debug, Clone, Default)]
pub struct SubScore {
    pub score: u32,
    pub max_score: u32,
    pub details: Vec<String>,
}

impl SubScore {
    pub fn new(max_score: u32) -> Self {
        Self {
            score: 0,
            max_score,
            details: Vec::new(),
        }
    }

    pub fn add(&mut self, points: u32, detail: impl Into<String>) {
        self.score += points;
        self.details.push(detail.into());
    }

    pub fn note(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }
}

pub(crate) fn combine(parts: &[SubScore]) -> ScoreSummary {
    let mut details = Vec::new();
    let mut total = 0;
    let mut max = 0;
    for part in parts {
        total += part.score;
        max += part.max_score;
        details.extend(part.details.iter().cloned());
    }
    ScoreSummary {
        total_score: total,
        max_score: max,
        details,
        margin_of_safety: None,
    }
}

/// Score-to-action thresholds: at least 70% of the maximum reads bullish,
/// at most 30% reads bearish, anything between stays neutral.
pub(crate) fn action_from_ratio(ratio: f64) -> Action {
    if ratio >= 0.7 {
        Action::Buy
    } else if ratio <= 0.3 {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// Hands the quantitative summary to the reasoning collaborator and turns
/// its answer into an immutable Signal. A reasoner failure is the
/// analyst's failure. Confidence on the collaborator's 0-100 scale is
/// normalized to [0, 1]; `Signal::new` clamps the rest.
pub(crate) async fn finish_signal(
    reasoner: &Arc<dyn Reasoner>,
    agent_id: AgentId,
    context: &MarketContext,
    proposed_action: Action,
    summary: ScoreSummary,
) -> Result<Signal, AgentError> {
    let request = ReasonRequest {
        agent_id: agent_id.clone(),
        instrument: context.instrument().clone(),
        proposed_action,
        summary,
    };
    let reasoned = reasoner.reason(&request).await?;

    let confidence = if reasoned.confidence > 1.0 {
        reasoned.confidence / 100.0
    } else {
        reasoned.confidence
    };

    Ok(Signal::new(
        agent_id,
        context.instrument().clone(),
        reasoned.action,
        confidence,
        reasoned.rationale,
        Utc::now(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_thresholds() {
        assert_eq!(action_from_ratio(0.7), Action::Buy);
        assert_eq!(action_from_ratio(0.9), Action::Buy);
        assert_eq!(action_from_ratio(0.3), Action::Sell);
        assert_eq!(action_from_ratio(0.1), Action::Sell);
        assert_eq!(action_from_ratio(0.5), Action::Hold);
    }
}
