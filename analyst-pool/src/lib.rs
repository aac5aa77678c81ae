pub mod analyst;
pub mod market_data;
pub mod pool;
pub mod reasoner;

pub use analyst::Analyst;
pub use market_data::MarketDataProvider;
pub use pool::{AgentPool, EvaluatedInstrument, PoolOutcome};
pub use reasoner::{ReasonRequest, ReasonedSignal, Reasoner, ScoreSummary};
