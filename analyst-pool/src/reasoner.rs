use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{Action, AgentId, InstrumentId};
use serde::{Deserialize, Serialize};

/// Condensed quantitative findings an analyst hands to the reasoner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_score: u32,
    pub max_score: u32,
    pub details: Vec<String>,
    /// Discount to estimated intrinsic value, when the analyst computed one.
    pub margin_of_safety: Option<f64>,
}

impl ScoreSummary {
    pub fn ratio(&self) -> f64 {
        if self.max_score == 0 {
            0.0
        } else {
            self.total_score as f64 / self.max_score as f64
        }
    }
}

/// One request to the external reasoning collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonRequest {
    pub agent_id: AgentId,
    pub instrument: InstrumentId,
    pub proposed_action: Action,
    pub summary: ScoreSummary,
}

/// What the reasoning collaborator returns. Confidence may arrive on a
/// 0-100 scale; callers normalize before building a `Signal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonedSignal {
    pub action: Action,
    pub confidence: f64,
    pub rationale: String,
}

/// External LLM-backed reasoning collaborator. The pipeline depends only
/// on this contract, never on model choice or prompt content.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, request: &ReasonRequest) -> Result<ReasonedSignal, AgentError>;
}
