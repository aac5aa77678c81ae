use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_max_position_pct() -> f64 {
    0.20
}

fn default_max_sector_pct() -> f64 {
    0.40
}

fn default_max_drawdown_pct() -> f64 {
    0.20
}

fn default_min_confidence() -> f64 {
    0.15
}

/// Hard portfolio risk limits. Loaded once per cycle, immutable during
/// the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum market value of one position as a fraction of equity.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct_per_instrument: f64,
    /// Maximum aggregate exposure of one sector as a fraction of equity.
    #[serde(default = "default_max_sector_pct")]
    pub max_sector_exposure_pct: f64,
    /// Drawdown from peak equity at which the circuit breaker vetoes all
    /// BUY actions system-wide.
    #[serde(default = "default_max_drawdown_pct")]
    pub max_portfolio_drawdown_pct: f64,
    /// Consensus strength below which an opinion is vetoed.
    #[serde(default = "default_min_confidence")]
    pub min_confidence_to_act: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_pct_per_instrument: default_max_position_pct(),
            max_sector_exposure_pct: default_max_sector_pct(),
            max_portfolio_drawdown_pct: default_max_drawdown_pct(),
            min_confidence_to_act: default_min_confidence(),
        }
    }
}

fn default_agent_timeout() -> u64 {
    10
}

fn default_concurrency() -> usize {
    4
}

fn default_cycle_deadline() -> u64 {
    120
}

fn default_agents() -> Vec<String> {
    vec![
        "graham".to_string(),
        "buffett".to_string(),
        "momentum".to_string(),
    ]
}

/// Full pipeline configuration surface. Reloaded only between cycles,
/// never mid-cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub risk: RiskLimits,
    /// Independent timeout budget for each analyst invocation.
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_secs: u64,
    /// Minimum successful agents per instrument. Unset means a majority
    /// of the roster.
    #[serde(default)]
    pub quorum_minimum: Option<usize>,
    /// Bound on concurrently evaluated instruments.
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    /// Wall-clock budget for one cycle; exceeded between stages means the
    /// cycle is cancelled.
    #[serde(default = "default_cycle_deadline")]
    pub cycle_deadline_secs: u64,
    /// Notional borrowing allowance added to cash when sizing buys.
    #[serde(default)]
    pub margin_budget: f64,
    /// Analyst roster by id.
    #[serde(default = "default_agents")]
    pub agents: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            risk: RiskLimits::default(),
            agent_timeout_secs: default_agent_timeout(),
            quorum_minimum: None,
            concurrency_limit: default_concurrency(),
            cycle_deadline_secs: default_cycle_deadline(),
            margin_budget: 0.0,
            agents: default_agents(),
        }
    }
}

impl PipelineConfig {
    /// Loads layered configuration: file (optional) then `FUND_`
    /// environment overrides, e.g. `FUND_RISK__MIN_CONFIDENCE_TO_ACT`.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FUND")
                .separator("__")
                .try_parsing(true),
        );
        let loaded: PipelineConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Effective quorum for a roster of the given size.
    pub fn quorum_for(&self, roster_size: usize) -> usize {
        self.quorum_minimum.unwrap_or(roster_size / 2 + 1)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        fn check_fraction(name: &str, value: f64) -> Result<(), PipelineError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
            Ok(())
        }

        check_fraction(
            "risk.max_position_pct_per_instrument",
            self.risk.max_position_pct_per_instrument,
        )?;
        check_fraction(
            "risk.max_sector_exposure_pct",
            self.risk.max_sector_exposure_pct,
        )?;
        check_fraction(
            "risk.max_portfolio_drawdown_pct",
            self.risk.max_portfolio_drawdown_pct,
        )?;
        check_fraction("risk.min_confidence_to_act", self.risk.min_confidence_to_act)?;

        if self.risk.max_position_pct_per_instrument == 0.0 {
            return Err(PipelineError::Configuration(
                "risk.max_position_pct_per_instrument must be positive".into(),
            ));
        }
        if self.agent_timeout_secs == 0 {
            return Err(PipelineError::Configuration(
                "agent_timeout_secs must be positive".into(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(PipelineError::Configuration(
                "concurrency_limit must be positive".into(),
            ));
        }
        if self.margin_budget < 0.0 {
            return Err(PipelineError::Configuration(
                "margin_budget must not be negative".into(),
            ));
        }
        if self.agents.is_empty() {
            return Err(PipelineError::Configuration(
                "agent roster must not be empty".into(),
            ));
        }
        if let Some(quorum) = self.quorum_minimum {
            if quorum == 0 || quorum > self.agents.len() {
                return Err(PipelineError::Configuration(format!(
                    "quorum_minimum {} is outside 1..={}",
                    quorum,
                    self.agents.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_quorum_defaults_to_majority() {
        let mut cfg = PipelineConfig::default();
        cfg.quorum_minimum = None;
        assert_eq!(cfg.quorum_for(5), 3);
        assert_eq!(cfg.quorum_for(4), 3);
        assert_eq!(cfg.quorum_for(1), 1);

        cfg.quorum_minimum = Some(2);
        assert_eq!(cfg.quorum_for(5), 2);
    }

    #[test]
    fn test_out_of_range_limits_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.risk.max_portfolio_drawdown_pct = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.quorum_minimum = Some(7);
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.agents.clear();
        assert!(cfg.validate().is_err());
    }
}
