use thiserror::Error;

/// Cycle-level failures. Everything else (agent failures, quorum misses,
/// vetoes) is absorbed into the `CycleResult` instead of propagating.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Configuration(err.to_string())
    }
}

/// Per-agent failures during one instrument's evaluation. Recorded in the
/// cycle result and excluded from aggregation; never aborts the cycle.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Agent timed out after {0}s")]
    Timeout(u64),
    #[error("Reasoner error: {0}")]
    Reasoner(String),
    #[error("Market data error: {0}")]
    MarketData(String),
    #[error("Agent error: {0}")]
    Internal(String),
}

/// Failures surfaced by the execution gateway. Recorded against the
/// order; never rolls back portfolio state (nothing was mutated
/// speculatively).
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Order rejected: {0}")]
    Rejected(String),
    #[error("Gateway transport error: {0}")]
    Transport(String),
}
