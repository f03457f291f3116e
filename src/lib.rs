//! HARVESTER — Autonomous LP Yield-Farming Agent
//!
//! An autonomous agent that scans DEX pairs on Base, scores them as
//! concentrated-liquidity farming opportunities, and manages a tiered
//! portfolio of LP positions.
//!
//! # Architecture
//!
//! - `sources` — market data providers (DexScreener)
//! - `strategy` — metrics, opportunity scoring, allocation policy
//! - `engine` — decision execution and portfolio tracking
//! - `config` — TOML configuration
//! - `types` — shared data model

pub mod config;
pub mod engine;
pub mod sources;
pub mod strategy;
pub mod types;
