//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Strategy knobs map onto `ScoringConfig` and `AllocationConfig` so the
//! strategy crate-internals never see raw TOML.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::strategy::allocation::AllocationConfig;
use crate::strategy::scoring::ScoringConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub strategy: StrategyConfig,
    pub sources: SourcesConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    /// Chain the agent farms on, e.g. "base".
    pub chain: String,
    /// Total portfolio value under management, in USD.
    pub total_value_usd: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    pub acceptance_threshold: f64,
    pub tier_one_target: f64,
    pub tier_two_target: f64,
    pub tier_three_target: f64,
    pub max_position_pct: f64,
    pub new_position_pct: f64,
    pub min_positions: usize,
    pub max_positions: usize,
    pub volume_drop_pct: f64,
    pub exit_bsr_threshold: f64,
    pub bsr_sustain_hours: i64,
    pub tier_one_apr_floor: f64,
    pub tier_two_apr_floor: f64,
    pub tier_three_apr_floor: f64,
}

impl StrategyConfig {
    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            acceptance_threshold: self.acceptance_threshold,
        }
    }

    pub fn allocation(&self) -> AllocationConfig {
        AllocationConfig {
            tier_one_target: self.tier_one_target,
            tier_two_target: self.tier_two_target,
            tier_three_target: self.tier_three_target,
            max_position_pct: self.max_position_pct,
            new_position_pct: self.new_position_pct,
            min_positions: self.min_positions,
            max_positions: self.max_positions,
            volume_drop_pct: self.volume_drop_pct,
            exit_bsr_threshold: self.exit_bsr_threshold,
            bsr_sustain_hours: self.bsr_sustain_hours,
            tier_one_apr_floor: self.tier_one_apr_floor,
            tier_two_apr_floor: self.tier_two_apr_floor,
            tier_three_apr_floor: self.tier_three_apr_floor,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub dexscreener: DexScreenerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DexScreenerConfig {
    pub enabled: bool,
    /// Token addresses whose pairs are scanned each cycle.
    pub token_watchlist: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    pub dry_run: bool,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        // This test requires config.toml to be in the working directory.
        // In CI, copy config.toml to the test working dir.
        let result = AppConfig::load("config.toml");
        if let Ok(cfg) = result {
            assert_eq!(cfg.agent.name, "HARVESTER-001");
            assert_eq!(cfg.agent.chain, "base");
            assert!(cfg.agent.total_value_usd > 0.0);
            assert!(cfg.strategy.acceptance_threshold > 0.0);
            assert!(cfg.strategy.acceptance_threshold < 1.0);
            let targets = cfg.strategy.tier_one_target
                + cfg.strategy.tier_two_target
                + cfg.strategy.tier_three_target;
            assert!((targets - 1.0).abs() < 1e-9);
            assert!(cfg.strategy.min_positions <= cfg.strategy.max_positions);
            assert!(cfg.sources.dexscreener.enabled);
        }
        // If config.toml isn't found, that's acceptable in some test environments
    }

    #[test]
    fn test_strategy_config_maps_to_engine_configs() {
        let strategy = StrategyConfig {
            acceptance_threshold: 0.7,
            tier_one_target: 0.40,
            tier_two_target: 0.35,
            tier_three_target: 0.25,
            max_position_pct: 0.15,
            new_position_pct: 0.05,
            min_positions: 8,
            max_positions: 10,
            volume_drop_pct: 0.70,
            exit_bsr_threshold: 0.8,
            bsr_sustain_hours: 48,
            tier_one_apr_floor: 30.0,
            tier_two_apr_floor: 50.0,
            tier_three_apr_floor: 100.0,
        };

        assert!((strategy.scoring().acceptance_threshold - 0.7).abs() < 1e-12);
        let allocation = strategy.allocation();
        assert!((allocation.tier_three_target - 0.25).abs() < 1e-12);
        assert_eq!(allocation.max_positions, 10);
        assert!((allocation.tier_three_apr_floor - 100.0).abs() < 1e-9);
    }
}
