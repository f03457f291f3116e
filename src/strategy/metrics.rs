//! Metrics engine.
//!
//! Converts one raw pair snapshot into the normalized signals the scoring
//! engine consumes. Pure: no side effects, no external calls, no ambient
//! clock — callers pass `now` explicitly.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{PairMetrics, PairSnapshot};

/// Flat pool fee assumption used for the APR estimate (0.3%).
/// A known simplification: real fee tiers vary per pool (0.05%–1%).
pub const FEE_RATE: f64 = 0.003;

const DAYS_PER_YEAR: f64 = 365.0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Recoverable per-pair evaluation failures.
///
/// None of these abort a batch: the offending pair is skipped and surfaced
/// to the caller as a warning. The two division edge cases are explicit
/// variants rather than ±∞ sentinels — an infinity would sail through the
/// capped sub-scores and rank the pair maximally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("pool has zero liquidity")]
    ZeroLiquidity,

    #[error("no sell transactions in 24h window")]
    ZeroSells,
}

/// A pair excluded from an evaluation batch, with the reason.
#[derive(Debug, Clone)]
pub struct EvalWarning {
    pub pair_address: String,
    pub error: EvalError,
}

impl std::fmt::Display for EvalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.pair_address, self.error)
    }
}

// ---------------------------------------------------------------------------
// Metrics computation
// ---------------------------------------------------------------------------

/// Compute the five normalized signals for one pair.
///
/// Formulas:
/// - `volume_to_liquidity = volume_24h / liquidity_usd`
/// - `fee_apr = (volume_24h * FEE_RATE * 365 / liquidity_usd) * 100`
/// - `price_volatility = (high - low) / price` with
///   `high = price * (1 + pct24h/100)`, `low = price * (1 - pct24h/100)`
/// - `buy_to_sell_ratio = buys_24h / sells_24h`
/// - `age_hours = (now - created_at)` in hours
pub fn compute_metrics(
    snapshot: &PairSnapshot,
    now: DateTime<Utc>,
) -> Result<PairMetrics, EvalError> {
    validate(snapshot)?;

    if snapshot.liquidity_usd == 0.0 {
        return Err(EvalError::ZeroLiquidity);
    }
    if snapshot.txns.h24.sells == 0 {
        return Err(EvalError::ZeroSells);
    }

    let volume_to_liquidity = snapshot.volume_24h / snapshot.liquidity_usd;

    let fee_apr =
        (snapshot.volume_24h * FEE_RATE * DAYS_PER_YEAR / snapshot.liquidity_usd) * 100.0;

    let price_high = snapshot.price_usd * (1.0 + snapshot.price_change_24h_pct / 100.0);
    let price_low = snapshot.price_usd * (1.0 - snapshot.price_change_24h_pct / 100.0);
    let price_volatility = (price_high - price_low) / snapshot.price_usd;

    let buy_to_sell_ratio = snapshot.txns.h24.buys as f64 / snapshot.txns.h24.sells as f64;

    let age = now - snapshot.created_at;
    let age_hours = age.num_seconds() as f64 / 3600.0;
    if age_hours < 0.0 {
        return Err(EvalError::MalformedSnapshot {
            reason: "pool created in the future".to_string(),
        });
    }

    // The high/low proxy goes negative for down moves (pct24h < 0); the
    // invariant is non-negative, so clamp the floor.
    let price_volatility = price_volatility.max(0.0);

    Ok(PairMetrics {
        volume_to_liquidity,
        fee_apr,
        price_volatility,
        buy_to_sell_ratio,
        age_hours,
    })
}

/// Reject snapshots with missing or nonsensical numeric fields so that
/// NaN/∞ never propagate into scores.
fn validate(snapshot: &PairSnapshot) -> Result<(), EvalError> {
    let malformed = |reason: &str| EvalError::MalformedSnapshot {
        reason: reason.to_string(),
    };

    if !snapshot.price_usd.is_finite() || snapshot.price_usd <= 0.0 {
        return Err(malformed("non-positive or non-finite price"));
    }
    if !snapshot.volume_24h.is_finite() || snapshot.volume_24h < 0.0 {
        return Err(malformed("negative or non-finite 24h volume"));
    }
    if !snapshot.liquidity_usd.is_finite() || snapshot.liquidity_usd < 0.0 {
        return Err(malformed("negative or non-finite liquidity"));
    }
    if !snapshot.price_change_24h_pct.is_finite() {
        return Err(malformed("non-finite 24h price change"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
