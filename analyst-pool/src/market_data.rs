use async_trait::async_trait;
use fund_core::error::AgentError;
use fund_core::model::{InstrumentId, MarketContext};

/// External market-data collaborator. A transient failure here excludes
/// the instrument from the cycle the same way an agent failure would; it
/// is never fatal.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_context(&self, instrument: &InstrumentId) -> Result<MarketContext, AgentError>;
}
