use crate::analyst::Analyst;
use crate::market_data::MarketDataProvider;
use fund_core::error::AgentError;
use fund_core::model::{AgentFailure, AgentId, InstrumentId, MarketContext, Signal, SkipReason};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Everything one instrument produced during fan-out: the context the
/// agents saw, the surviving signals, and the failures that were
/// absorbed along the way.
#[derive(Debug)]
pub struct EvaluatedInstrument {
    pub instrument: InstrumentId,
    pub context: MarketContext,
    pub signals: Vec<Signal>,
    pub failures: Vec<AgentFailure>,
}

#[derive(Debug)]
pub enum PoolOutcome {
    Evaluated(EvaluatedInstrument),
    Skipped {
        instrument: InstrumentId,
        reason: SkipReason,
        failures: Vec<AgentFailure>,
    },
}

/// Runs the configured analyst roster concurrently per instrument, each
/// agent under an independent timeout budget. A single agent failure
/// never aborts the instrument; falling below quorum skips it.
pub struct AgentPool {
    analysts: Vec<Arc<dyn Analyst>>,
    market_data: Arc<dyn MarketDataProvider>,
    agent_timeout: Duration,
    quorum: usize,
    concurrency: Arc<Semaphore>,
}

impl AgentPool {
    pub fn new(
        analysts: Vec<Arc<dyn Analyst>>,
        market_data: Arc<dyn MarketDataProvider>,
        agent_timeout: Duration,
        quorum: usize,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            analysts,
            market_data,
            agent_timeout,
            quorum,
            concurrency: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        }
    }

    pub fn roster_size(&self) -> usize {
        self.analysts.len()
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Fans out every analyst for one instrument and collects structured
    /// per-agent results.
    pub async fn evaluate(&self, instrument: &InstrumentId) -> PoolOutcome {
        let context = match self.market_data.get_context(instrument).await {
            Ok(context) => context,
            Err(err) => {
                warn!("Market data unavailable for {}: {}", instrument, err);
                return PoolOutcome::Skipped {
                    instrument: instrument.clone(),
                    reason: SkipReason::MarketDataUnavailable(err.to_string()),
                    failures: Vec::new(),
                };
            }
        };

        let timeout_secs = self.agent_timeout.as_secs();
        let mut tasks: Vec<(AgentId, JoinHandle<_>)> = Vec::new();
        for analyst in &self.analysts {
            let analyst = Arc::clone(analyst);
            let analyst_id = analyst.id();
            let agent_context = context.clone();
            let budget = self.agent_timeout;
            let handle = tokio::spawn(async move {
                tokio::time::timeout(budget, analyst.evaluate(&agent_context)).await
            });
            tasks.push((analyst_id, handle));
        }

        let mut signals = Vec::new();
        let mut failures = Vec::new();
        for (agent_id, handle) in tasks {
            let failure_reason = match handle.await {
                Ok(Ok(Ok(signal))) => {
                    debug!(
                        "{} on {}: {} ({:.2})",
                        agent_id,
                        instrument,
                        signal.action(),
                        signal.confidence()
                    );
                    signals.push(signal);
                    continue;
                }
                Ok(Ok(Err(err))) => err.to_string(),
                Ok(Err(_elapsed)) => AgentError::Timeout(timeout_secs).to_string(),
                Err(join_err) => format!("Agent task aborted: {}", join_err),
            };
            warn!("{} failed on {}: {}", agent_id, instrument, failure_reason);
            failures.push(AgentFailure {
                agent_id,
                instrument: instrument.clone(),
                reason: failure_reason,
            });
        }

        if signals.len() < self.quorum {
            info!(
                "Skipping {}: {}/{} agents succeeded, quorum is {}",
                instrument,
                signals.len(),
                self.analysts.len(),
                self.quorum
            );
            return PoolOutcome::Skipped {
                instrument: instrument.clone(),
                reason: SkipReason::QuorumNotMet {
                    succeeded: signals.len(),
                    required: self.quorum,
                },
                failures,
            };
        }

        PoolOutcome::Evaluated(EvaluatedInstrument {
            instrument: instrument.clone(),
            context,
            signals,
            failures,
        })
    }

    /// Evaluates independent instruments in parallel, bounded by the
    /// configured concurrency limit so the external collaborators are
    /// not overwhelmed.
    pub async fn evaluate_all(&self, instruments: &[InstrumentId]) -> Vec<PoolOutcome> {
        let tasks = instruments.iter().map(|instrument| {
            let semaphore = Arc::clone(&self.concurrency);
            async move {
                let _permit = semaphore.acquire().await.ok();
                self.evaluate(instrument).await
            }
        });
        futures::future::join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyst::Analyst;
    use async_trait::async_trait;
    use chrono::Utc;
    use fund_core::model::{Action, AgentId, FinancialMetrics, Price, Sector};

    fn instrument(s: &str) -> InstrumentId {
        InstrumentId::new(s, "TEST")
    }

    fn context_for(id: &InstrumentId) -> MarketContext {
        MarketContext::new(
            id.clone(),
            Sector::Technology,
            Price::new(id.clone(), 100.0, 99.5, 100.5, 0),
            FinancialMetrics::default(),
            Vec::new(),
            Vec::new(),
        )
    }

    struct StaticMarketData;

    #[async_trait]
    impl MarketDataProvider for StaticMarketData {
        async fn get_context(
            &self,
            instrument: &InstrumentId,
        ) -> Result<MarketContext, AgentError> {
            Ok(context_for(instrument))
        }
    }

    struct FailingMarketData;

    #[async_trait]
    impl MarketDataProvider for FailingMarketData {
        async fn get_context(
            &self,
            _instrument: &InstrumentId,
        ) -> Result<MarketContext, AgentError> {
            Err(AgentError::MarketData("feed offline".into()))
        }
    }

    struct FixedAnalyst {
        name: &'static str,
        action: Action,
        confidence: f64,
    }

    #[async_trait]
    impl Analyst for FixedAnalyst {
        fn id(&self) -> AgentId {
            AgentId::new(self.name)
        }

        async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError> {
            Ok(Signal::new(
                self.id(),
                context.instrument().clone(),
                self.action,
                self.confidence,
                "fixed",
                Utc::now(),
            ))
        }
    }

    struct BrokenAnalyst {
        name: &'static str,
    }

    #[async_trait]
    impl Analyst for BrokenAnalyst {
        fn id(&self) -> AgentId {
            AgentId::new(self.name)
        }

        async fn evaluate(&self, _context: &MarketContext) -> Result<Signal, AgentError> {
            Err(AgentError::Internal("model returned garbage".into()))
        }
    }

    struct SlowAnalyst {
        name: &'static str,
    }

    #[async_trait]
    impl Analyst for SlowAnalyst {
        fn id(&self) -> AgentId {
            AgentId::new(self.name)
        }

        async fn evaluate(&self, context: &MarketContext) -> Result<Signal, AgentError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Signal::new(
                self.id(),
                context.instrument().clone(),
                Action::Hold,
                0.5,
                "too late",
                Utc::now(),
            ))
        }
    }

    fn fixed(name: &'static str, action: Action, confidence: f64) -> Arc<dyn Analyst> {
        Arc::new(FixedAnalyst {
            name,
            action,
            confidence,
        })
    }

    #[tokio::test]
    async fn test_partial_agent_failure_is_absorbed() {
        let pool = AgentPool::new(
            vec![
                fixed("a", Action::Buy, 0.8),
                fixed("b", Action::Buy, 0.6),
                Arc::new(BrokenAnalyst { name: "c" }),
            ],
            Arc::new(StaticMarketData),
            Duration::from_secs(5),
            2,
            4,
        );

        match pool.evaluate(&instrument("A")).await {
            PoolOutcome::Evaluated(result) => {
                assert_eq!(result.signals.len(), 2);
                assert_eq!(result.failures.len(), 1);
                assert_eq!(result.failures[0].agent_id, AgentId::new("c"));
            }
            other => panic!("expected evaluated outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_quorum_miss_skips_instrument() {
        // Roster of 5 with quorum 3; only 2 succeed.
        let pool = AgentPool::new(
            vec![
                fixed("a", Action::Buy, 0.8),
                fixed("b", Action::Sell, 0.6),
                Arc::new(BrokenAnalyst { name: "c" }),
                Arc::new(BrokenAnalyst { name: "d" }),
                Arc::new(BrokenAnalyst { name: "e" }),
            ],
            Arc::new(StaticMarketData),
            Duration::from_secs(5),
            3,
            4,
        );

        match pool.evaluate(&instrument("A")).await {
            PoolOutcome::Skipped {
                reason, failures, ..
            } => {
                assert_eq!(
                    reason,
                    SkipReason::QuorumNotMet {
                        succeeded: 2,
                        required: 3
                    }
                );
                assert_eq!(failures.len(), 3);
            }
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_agent_times_out_without_blocking_others() {
        let pool = AgentPool::new(
            vec![
                fixed("fast", Action::Buy, 0.9),
                Arc::new(SlowAnalyst { name: "slow" }),
            ],
            Arc::new(StaticMarketData),
            Duration::from_secs(1),
            1,
            4,
        );

        match pool.evaluate(&instrument("A")).await {
            PoolOutcome::Evaluated(result) => {
                assert_eq!(result.signals.len(), 1);
                assert_eq!(result.failures.len(), 1);
                assert!(result.failures[0].reason.contains("timed out"));
            }
            other => panic!("expected evaluated outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_market_data_failure_skips_like_agent_failure() {
        let pool = AgentPool::new(
            vec![fixed("a", Action::Buy, 0.8)],
            Arc::new(FailingMarketData),
            Duration::from_secs(5),
            1,
            4,
        );

        match pool.evaluate(&instrument("A")).await {
            PoolOutcome::Skipped { reason, .. } => match reason {
                SkipReason::MarketDataUnavailable(msg) => {
                    assert!(msg.contains("feed offline"));
                }
                other => panic!("expected market data skip, got {:?}", other),
            },
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_evaluate_all_preserves_instrument_order() {
        let pool = AgentPool::new(
            vec![fixed("a", Action::Hold, 0.5)],
            Arc::new(StaticMarketData),
            Duration::from_secs(5),
            1,
            2,
        );

        let instruments = vec![instrument("A"), instrument("B"), instrument("C")];
        let outcomes = pool.evaluate_all(&instruments).await;
        assert_eq!(outcomes.len(), 3);
        for (outcome, expected) in outcomes.iter().zip(&instruments) {
            match outcome {
                PoolOutcome::Evaluated(result) => {
                    assert_eq!(&result.instrument, expected)
                }
                other => panic!("expected evaluated outcome, got {:?}", other),
            }
        }
    }
}
