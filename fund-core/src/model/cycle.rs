use super::instrument::InstrumentId;
use super::order::Order;
use super::signal::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stages of one pipeline run. A cycle that ends in `Done` with zero
/// orders is a valid, non-error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStage {
    Ingest,
    Evaluate,
    Aggregate,
    RiskCheck,
    Allocate,
    Emit,
    Done,
    Failed,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::Ingest => "INGEST",
            CycleStage::Evaluate => "EVALUATE",
            CycleStage::Aggregate => "AGGREGATE",
            CycleStage::RiskCheck => "RISK_CHECK",
            CycleStage::Allocate => "ALLOCATE",
            CycleStage::Emit => "EMIT",
            CycleStage::Done => "DONE",
            CycleStage::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Reason codes attached to vetoed opinions. A veto is an expected
/// business outcome, never logged as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoReason {
    LowConfidence,
    PositionLimit,
    SectorExposure,
    DrawdownBreaker,
}

impl fmt::Display for VetoReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VetoReason::LowConfidence => "LOW_CONFIDENCE",
            VetoReason::PositionLimit => "POSITION_LIMIT",
            VetoReason::SectorExposure => "SECTOR_EXPOSURE",
            VetoReason::DrawdownBreaker => "DRAWDOWN_BREAKER",
        };
        write!(f, "{}", name)
    }
}

/// Why an instrument produced no consensus this cycle. A skip is not a
/// cycle error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    QuorumNotMet { succeeded: usize, required: usize },
    MarketDataUnavailable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::QuorumNotMet {
                succeeded,
                required,
            } => write!(f, "quorum not met ({}/{})", succeeded, required),
            SkipReason::MarketDataUnavailable(reason) => {
                write!(f, "market data unavailable: {}", reason)
            }
        }
    }
}

/// One agent's failure on one instrument. Absorbed locally, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent_id: AgentId,
    pub instrument: InstrumentId,
    pub reason: String,
}

/// The audit record of one pipeline run. A cycle always produces exactly
/// one of these, even when it failed, was cancelled, or emitted nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    cycle_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    stage: CycleStage,
    cancelled: bool,
    orders: Vec<Order>,
    vetoed: HashMap<InstrumentId, VetoReason>,
    skipped: HashMap<InstrumentId, SkipReason>,
    agent_failures: Vec<AgentFailure>,
    error: Option<String>,
}

impl CycleResult {
    pub fn begin(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            started_at,
            finished_at: None,
            stage: CycleStage::Ingest,
            cancelled: false,
            orders: Vec::new(),
            vetoed: HashMap::new(),
            skipped: HashMap::new(),
            agent_failures: Vec::new(),
            error: None,
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn vetoed(&self) -> &HashMap<InstrumentId, VetoReason> {
        &self.vetoed
    }

    pub fn skipped(&self) -> &HashMap<InstrumentId, SkipReason> {
        &self.skipped
    }

    pub fn agent_failures(&self) -> &[AgentFailure] {
        &self.agent_failures
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_stage(&mut self, stage: CycleStage) {
        self.stage = stage;
    }

    pub fn record_veto(&mut self, instrument: InstrumentId, reason: VetoReason) {
        self.vetoed.insert(instrument, reason);
    }

    pub fn record_skip(&mut self, instrument: InstrumentId, reason: SkipReason) {
        self.skipped.insert(instrument, reason);
    }

    pub fn record_agent_failure(&mut self, failure: AgentFailure) {
        self.agent_failures.push(failure);
    }

    pub fn record_orders(&mut self, orders: Vec<Order>) {
        self.orders = orders;
    }

    pub fn finish(&mut self, stage: CycleStage, finished_at: DateTime<Utc>) {
        self.stage = stage;
        self.finished_at = Some(finished_at);
    }

    pub fn cancel(&mut self, at_stage: CycleStage, finished_at: DateTime<Utc>) {
        self.cancelled = true;
        self.orders.clear();
        self.finish(at_stage, finished_at);
    }

    pub fn fail(&mut self, error: impl Into<String>, finished_at: DateTime<Utc>) {
        self.error = Some(error.into());
        self.finish(CycleStage::Failed, finished_at);
    }
}
