use crate::aggregator;
use crate::allocator;
use crate::gateway::{ExecutionGateway, ExecutionReport};
use crate::risk_guard::{RiskContext, RiskManager, RiskOutcome};
use analyst_pool::analyst::Analyst;
use analyst_pool::market_data::MarketDataProvider;
use analyst_pool::pool::{AgentPool, PoolOutcome};
use chrono::Utc;
use fund_core::config::PipelineConfig;
use fund_core::error::PipelineError;
use fund_core::model::{
    ConsensusOpinion, CycleResult, CycleStage, InstrumentId, Order, PortfolioState, Prices, Sector,
};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Sequences one evaluation cycle: INGEST, EVALUATE, AGGREGATE,
/// RISK_CHECK, ALLOCATE, EMIT, DONE.
///
/// Owns the portfolio. Decision stages read a frozen snapshot of it;
/// the only writer is `on_execution_report`, invoked when the external
/// gateway confirms an order. `&mut self` on `run_cycle` keeps cycles
/// serialized: at most one in flight, so a stale risk check can never
/// race a concurrent allocation.
pub struct Pipeline {
    config: PipelineConfig,
    analysts: Vec<Arc<dyn Analyst>>,
    market_data: Arc<dyn MarketDataProvider>,
    pool: AgentPool,
    risk: RiskManager,
    gateway: Arc<dyn ExecutionGateway>,
    portfolio: PortfolioState,
    last_prices: Prices,
    sectors: HashMap<InstrumentId, Sector>,
    open_orders: HashMap<Uuid, Order>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        analysts: Vec<Arc<dyn Analyst>>,
        market_data: Arc<dyn MarketDataProvider>,
        gateway: Arc<dyn ExecutionGateway>,
        portfolio: PortfolioState,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let pool = Self::build_pool(&config, &analysts, &market_data)?;
        Ok(Self {
            config,
            analysts,
            market_data,
            pool,
            risk: RiskManager::with_default_gates(),
            gateway,
            portfolio,
            last_prices: Prices::default(),
            sectors: HashMap::new(),
            open_orders: HashMap::new(),
        })
    }

    fn build_pool(
        config: &PipelineConfig,
        analysts: &[Arc<dyn Analyst>],
        market_data: &Arc<dyn MarketDataProvider>,
    ) -> Result<AgentPool, PipelineError> {
        let roster: Vec<Arc<dyn Analyst>> = analysts
            .iter()
            .filter(|a| config.agents.iter().any(|name| name.as_str() == a.id().as_str()))
            .cloned()
            .collect();
        if roster.is_empty() {
            return Err(PipelineError::Configuration(
                "configured agent roster matches no available analyst".into(),
            ));
        }
        let quorum = config.quorum_for(roster.len());
        Ok(AgentPool::new(
            roster,
            Arc::clone(market_data),
            Duration::from_secs(config.agent_timeout_secs),
            quorum,
            config.concurrency_limit,
        ))
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn open_orders(&self) -> usize {
        self.open_orders.len()
    }

    /// Swaps configuration between cycles. Rejected configuration leaves
    /// the previous one in force; limits are never silently stale
    /// because `run_cycle` re-validates before INGEST.
    pub fn reload_config(&mut self, config: PipelineConfig) -> Result<(), PipelineError> {
        config.validate()?;
        self.pool = Self::build_pool(&config, &self.analysts, &self.market_data)?;
        self.config = config;
        Ok(())
    }

    /// Runs one full cycle over the given instruments. Always returns a
    /// CycleResult, even when failed, cancelled, or empty: callers get a
    /// total record of exactly what happened and why.
    pub async fn run_cycle(&mut self, instruments: &[InstrumentId]) -> CycleResult {
        let mut result = CycleResult::begin(Uuid::new_v4(), Utc::now());

        // INGEST: freeze configuration for the whole cycle.
        if let Err(err) = self.config.validate() {
            warn!("Cycle aborted before INGEST: {}", err);
            result.fail(err.to_string(), Utc::now());
            return result;
        }
        let config = self.config.clone();
        let deadline = Instant::now() + Duration::from_secs(config.cycle_deadline_secs);
        info!(
            "Cycle {} started over {} instruments",
            result.cycle_id(),
            instruments.len()
        );

        // EVALUATE: bounded fan-out across instruments and agents.
        result.set_stage(CycleStage::Evaluate);
        let outcomes = self.pool.evaluate_all(instruments).await;

        let mut evaluated = Vec::new();
        for outcome in outcomes {
            match outcome {
                PoolOutcome::Evaluated(entry) => {
                    for failure in &entry.failures {
                        result.record_agent_failure(failure.clone());
                    }
                    evaluated.push(entry);
                }
                PoolOutcome::Skipped {
                    instrument,
                    reason,
                    failures,
                } => {
                    for failure in failures {
                        result.record_agent_failure(failure);
                    }
                    result.record_skip(instrument, reason);
                }
            }
        }

        let mut prices = Prices::default();
        for entry in &evaluated {
            prices.insert(entry.instrument.clone(), entry.context.price().clone());
            self.last_prices
                .insert(entry.instrument.clone(), entry.context.price().clone());
            self.sectors.insert(entry.instrument.clone(), entry.context.sector());
        }

        if self.cancelled(deadline, &mut result, CycleStage::Evaluate) {
            return result;
        }

        // AGGREGATE: one consensus opinion per surviving instrument.
        result.set_stage(CycleStage::Aggregate);
        let opinions: Vec<ConsensusOpinion> = evaluated
            .iter()
            .map(|entry| aggregator::aggregate(&entry.instrument, &entry.signals))
            .collect();

        if self.cancelled(deadline, &mut result, CycleStage::Aggregate) {
            return result;
        }

        // RISK_CHECK: pure gate chain over the frozen snapshot. Orders
        // are only sized after every instrument has been through here.
        result.set_stage(CycleStage::RiskCheck);
        let equity = self.portfolio.equity(&prices);
        let ctx = RiskContext {
            portfolio: &self.portfolio,
            prices: &prices,
            sectors: &self.sectors,
            limits: &config.risk,
            equity,
        };
        let mut approved = Vec::new();
        for opinion in &opinions {
            match self.risk.check(opinion, &ctx) {
                RiskOutcome::Approved(candidate) => approved.push(candidate),
                RiskOutcome::Vetoed(reason) => {
                    result.record_veto(opinion.instrument().clone(), reason);
                }
            }
        }

        if self.cancelled(deadline, &mut result, CycleStage::RiskCheck) {
            return result;
        }

        // ALLOCATE: rank and fund the full approved set.
        result.set_stage(CycleStage::Allocate);
        let orders = allocator::allocate(
            &approved,
            &self.portfolio,
            &prices,
            config.margin_budget,
            Utc::now().timestamp_millis(),
        );

        if self.cancelled(deadline, &mut result, CycleStage::Allocate) {
            return result;
        }

        // EMIT: hand orders to the gateway. Confirmation arrives later
        // through on_execution_report; nothing is mutated here.
        result.set_stage(CycleStage::Emit);
        for order in &orders {
            match self.gateway.submit(order).await {
                Ok(_ack) => {
                    self.open_orders.insert(order.id(), order.clone());
                }
                Err(err) => {
                    warn!(
                        "Submission failed for order {} on {}: {}",
                        order.id(),
                        order.instrument(),
                        err
                    );
                }
            }
        }

        info!(
            "Cycle {} done: {} orders, {} vetoes, {} skips, {} agent failures",
            result.cycle_id(),
            orders.len(),
            result.vetoed().len(),
            result.skipped().len(),
            result.agent_failures().len()
        );
        result.record_orders(orders);
        result.finish(CycleStage::Done, Utc::now());
        result
    }

    fn cancelled(
        &self,
        deadline: Instant,
        result: &mut CycleResult,
        stage: CycleStage,
    ) -> bool {
        if Instant::now() >= deadline {
            info!(
                "Cycle {} cancelled after {}: deadline exceeded",
                result.cycle_id(),
                stage
            );
            result.cancel(stage, Utc::now());
            return true;
        }
        false
    }

    /// Single writer for portfolio state, driven by gateway
    /// confirmations. A rejection only annotates: the portfolio was
    /// never mutated speculatively, so there is nothing to roll back.
    pub fn on_execution_report(&mut self, report: ExecutionReport) {
        match report {
            ExecutionReport::Filled {
                order_id,
                instrument,
                action,
                quantity,
                price,
            } => {
                if self.open_orders.remove(&order_id).is_none() {
                    warn!("Fill for unknown order {}", order_id);
                }
                info!(
                    "Filled {} {} x{:.4} @ {:.2}",
                    action, instrument, quantity, price
                );
                self.portfolio.apply_fill(&instrument, action, quantity, price);
                self.portfolio.mark(&self.last_prices);
            }
            ExecutionReport::PartiallyFilled {
                order_id,
                instrument,
                action,
                quantity,
                price,
            } => {
                if !self.open_orders.contains_key(&order_id) {
                    warn!("Partial fill for unknown order {}", order_id);
                }
                info!(
                    "Partial fill {} {} x{:.4} @ {:.2}",
                    action, instrument, quantity, price
                );
                self.portfolio.apply_fill(&instrument, action, quantity, price);
                self.portfolio.mark(&self.last_prices);
            }
            ExecutionReport::Rejected { order_id, reason } => {
                self.open_orders.remove(&order_id);
                warn!("Order {} rejected by gateway: {}", order_id, reason);
            }
        }
    }
}
