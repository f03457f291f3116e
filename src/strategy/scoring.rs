//! Opportunity scoring.
//!
//! Combines the five normalized signals into a bounded score in [0, 1] and
//! emits `Opportunity` records for pairs clearing the acceptance threshold.
//! Additive over independently-capped sub-scores; deterministic for a given
//! metrics input.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::metrics::{compute_metrics, EvalError, EvalWarning};
use crate::types::{Opportunity, PairMetrics, PairSnapshot, PriceRange};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scoring configuration (defaults — overridden by config.toml at runtime).
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Minimum normalized score to emit an opportunity. Strict: a score
    /// exactly at the threshold does not emit.
    pub acceptance_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.7,
        }
    }
}

// Sub-score caps. The five caps sum to 100; the total is normalized by that.
const VTL_CAP: f64 = 30.0;
const FEE_APR_CAP: f64 = 25.0;
const MOMENTUM_CAP: f64 = 20.0;
const AGE_CAP: f64 = 15.0;
const VOLATILITY_CAP: f64 = 10.0;

// Suggested range: fixed asymmetric band around current price, not derived
// from volatility. 25% below, 2.5x above.
const RANGE_LOWER_MULT: f64 = 0.75;
const RANGE_UPPER_MULT: f64 = 2.5;

// ---------------------------------------------------------------------------
// Score breakdown
// ---------------------------------------------------------------------------

/// Per-signal sub-scores. Each is capped independently; the normalized
/// total is the sum divided by 100.
#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub volume_liquidity: f64,
    pub fee_apr: f64,
    pub momentum: f64,
    pub age: f64,
    pub volatility: f64,
}

impl ScoreBreakdown {
    /// Normalized total in [0, 1].
    pub fn total(&self) -> f64 {
        (self.volume_liquidity + self.fee_apr + self.momentum + self.age + self.volatility) / 100.0
    }
}

/// Score one set of metrics. Pure and deterministic.
pub fn score_metrics(m: &PairMetrics) -> ScoreBreakdown {
    // Volume to liquidity (0-30): more trading activity relative to pool size.
    let volume_liquidity = (m.volume_to_liquidity * 100.0).min(VTL_CAP);

    // Fee APR (0-25): higher fee return is better.
    let fee_apr = (m.fee_apr / 4.0).min(FEE_APR_CAP);

    // Buy/sell momentum (0-20): only rewarded when buys outnumber sells.
    let momentum = if m.buy_to_sell_ratio > 1.0 {
        ((m.buy_to_sell_ratio - 1.0) * 10.0).min(MOMENTUM_CAP)
    } else {
        0.0
    };

    // Age (0-15): newer pools are riskier but have more potential.
    let age = AGE_CAP.min(m.age_hours / 24.0);

    // Volatility (0-10): some volatility is good for range trading, too much
    // is penalized past 0.5.
    let volatility = if m.price_volatility < 0.5 {
        m.price_volatility * 20.0
    } else {
        (10.0 - (m.price_volatility - 0.5) * 10.0).max(0.0)
    };

    ScoreBreakdown {
        volume_liquidity,
        fee_apr,
        momentum,
        age,
        volatility,
    }
}

/// The fixed entry band around the current price.
pub fn suggested_range(price_usd: f64) -> PriceRange {
    PriceRange {
        lower: price_usd * RANGE_LOWER_MULT,
        upper: price_usd * RANGE_UPPER_MULT,
    }
}

// ---------------------------------------------------------------------------
// Reasoning
// ---------------------------------------------------------------------------

// Qualitative thresholds for the reasoning sentences. Fixed heuristic
// constants, intentionally independent of the scoring caps.
const REASON_VTL: f64 = 0.3;
const REASON_FEE_APR: f64 = 50.0;
const REASON_BSR: f64 = 1.2;
const REASON_AGE_HOURS: f64 = 48.0;
const REASON_VOL_LOW: f64 = 0.2;
const REASON_VOL_HIGH: f64 = 0.5;

/// Build the human-readable reasoning string for a set of metrics.
/// Deterministic: identical metrics always yield identical text. An empty
/// sentence list yields "." (the trailing period is always present).
pub fn reasoning_for(m: &PairMetrics) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    if m.volume_to_liquidity > REASON_VTL {
        reasons.push("High trading volume relative to liquidity");
    }
    if m.fee_apr > REASON_FEE_APR {
        reasons.push("Strong fee APR potential");
    }
    if m.buy_to_sell_ratio > REASON_BSR {
        reasons.push("Bullish buy pressure");
    }
    if m.age_hours < REASON_AGE_HOURS {
        reasons.push("New pool with growth potential");
    }
    if m.price_volatility > REASON_VOL_LOW && m.price_volatility < REASON_VOL_HIGH {
        reasons.push("Healthy volatility for range trading");
    }

    reasons.join(". ") + "."
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Result of evaluating a snapshot batch.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Opportunities above the acceptance threshold, best first.
    pub opportunities: Vec<Opportunity>,
    /// Pairs excluded for recoverable reasons.
    pub warnings: Vec<EvalWarning>,
    /// Metrics for every pair that evaluated cleanly (including those below
    /// the threshold) — the allocation layer reads these for held positions.
    pub metrics: HashMap<String, PairMetrics>,
}

/// Scores pair snapshots and emits opportunities.
pub struct OpportunityScorer {
    config: ScoringConfig,
}

impl OpportunityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Evaluate one pair. `Ok(None)` means the pair scored cleanly but below
    /// the threshold; `Err` means it was malformed or hit a division edge
    /// case and should be skipped with a warning.
    pub fn evaluate_pair(
        &self,
        snapshot: &PairSnapshot,
        now: DateTime<Utc>,
    ) -> Result<Option<Opportunity>, EvalError> {
        let metrics = compute_metrics(snapshot, now)?;
        Ok(self.emit(&snapshot.pair_address, snapshot.price_usd, &metrics))
    }

    /// Threshold check + opportunity construction for already-computed
    /// metrics.
    pub fn emit(
        &self,
        pair_address: &str,
        price_usd: f64,
        metrics: &PairMetrics,
    ) -> Option<Opportunity> {
        let score = score_metrics(metrics).total();

        if score <= self.config.acceptance_threshold {
            debug!(
                pair = %pair_address,
                score = format!("{:.3}", score),
                threshold = self.config.acceptance_threshold,
                "Below acceptance threshold"
            );
            return None;
        }

        Some(Opportunity {
            pair_address: pair_address.to_string(),
            score,
            suggested_range: suggested_range(price_usd),
            metrics: *metrics,
            reasoning: reasoning_for(metrics),
        })
    }

    /// Evaluate a full snapshot batch.
    ///
    /// Never fails as a whole: malformed pairs are excluded and reported in
    /// `warnings`, all others are scored normally. Opportunities come back
    /// sorted by score descending. Pairs are independent, so results merge
    /// by simple concatenation.
    pub fn evaluate_all(&self, snapshots: &[PairSnapshot], now: DateTime<Utc>) -> Evaluation {
        let mut eval = Evaluation::default();

        for snapshot in snapshots {
            let metrics = match compute_metrics(snapshot, now) {
                Ok(m) => m,
                Err(error) => {
                    debug!(pair = %snapshot.pair_address, %error, "Pair excluded");
                    eval.warnings.push(EvalWarning {
                        pair_address: snapshot.pair_address.clone(),
                        error,
                    });
                    continue;
                }
            };

            eval.metrics.insert(snapshot.pair_address.clone(), metrics);

            if let Some(opp) = self.emit(&snapshot.pair_address, snapshot.price_usd, &metrics) {
                eval.opportunities.push(opp);
            }
        }

        // Best opportunities first
        eval.opportunities.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        eval
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TxnWindow, WindowedTxns};
    use chrono::Duration;

    fn make_metrics(vtl: f64, fee_apr: f64, bsr: f64, age: f64, vol: f64) -> PairMetrics {
        PairMetrics {
            volume_to_liquidity: vtl,
            fee_apr,
            price_volatility: vol,
            buy_to_sell_ratio: bsr,
            age_hours: age,
        }
    }

    #[test]
    fn test_worked_example_score() {
        // vtl 0.3 → 30 (capped), feeAPR 32.85 → 8.2125, bsr 3 → 20,
        // age 72h → 3, vol 0.2 → 4. Total 65.2125/100.
        let m = make_metrics(0.3, 32.85, 3.0, 72.0, 0.2);
        let b = score_metrics(&m);
        assert!((b.volume_liquidity - 30.0).abs() < 1e-9);
        assert!((b.fee_apr - 8.2125).abs() < 1e-9);
        assert!((b.momentum - 20.0).abs() < 1e-9);
        assert!((b.age - 3.0).abs() < 1e-9);
        assert!((b.volatility - 4.0).abs() < 1e-9);
        assert!((b.total() - 0.652125).abs() < 1e-9);
    }

    #[test]
    fn test_sub_scores_never_exceed_caps() {
        let extreme = make_metrics(100.0, 1_000_000.0, 500.0, 1_000_000.0, 0.49999);
        let b = score_metrics(&extreme);
        assert_eq!(b.volume_liquidity, 30.0);
        assert_eq!(b.fee_apr, 25.0);
        assert_eq!(b.momentum, 20.0);
        assert_eq!(b.age, 15.0);
        assert!(b.volatility <= 10.0);
        assert!(b.total() <= 1.0);
    }

    #[test]
    fn test_score_in_unit_interval() {
        let cases = [
            make_metrics(0.0, 0.0, 0.0, 0.0, 0.0),
            make_metrics(0.15, 20.0, 0.5, 12.0, 0.1),
            make_metrics(2.0, 400.0, 10.0, 5000.0, 3.0),
            make_metrics(0.3, 32.85, 3.0, 72.0, 0.2),
        ];
        for m in &cases {
            let total = score_metrics(m).total();
            assert!((0.0..=1.0).contains(&total), "score {total} out of range");
        }
    }

    #[test]
    fn test_momentum_zero_when_sells_dominate() {
        let m = make_metrics(0.1, 10.0, 0.9, 100.0, 0.1);
        assert_eq!(score_metrics(&m).momentum, 0.0);
    }

    #[test]
    fn test_volatility_penalized_past_half() {
        // Rising leg: below 0.5 scales linearly
        assert!((score_metrics(&make_metrics(0.0, 0.0, 0.0, 0.0, 0.25)).volatility - 5.0).abs() < 1e-9);
        // Falling leg: past 0.5, 10 - (vol - 0.5) * 10
        assert!((score_metrics(&make_metrics(0.0, 0.0, 0.0, 0.0, 0.8)).volatility - 7.0).abs() < 1e-9);
        // Floor at zero for extreme volatility
        assert_eq!(score_metrics(&make_metrics(0.0, 0.0, 0.0, 0.0, 5.0)).volatility, 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let scorer = OpportunityScorer::new(ScoringConfig::default());
        // 30 + 25 + 0 + 10 + 5 = 70 exactly → score 0.7, must NOT emit
        let at_threshold = make_metrics(0.3, 100.0, 1.0, 240.0, 0.25);
        assert!((score_metrics(&at_threshold).total() - 0.7).abs() < 1e-12);
        assert!(scorer.emit("0xpair", 1.0, &at_threshold).is_none());

        // Nudge momentum above zero → emits
        let above = make_metrics(0.3, 100.0, 1.1, 240.0, 0.25);
        assert!(scorer.emit("0xpair", 1.0, &above).is_some());
    }

    #[test]
    fn test_suggested_range_exact() {
        let range = suggested_range(2.0);
        assert_eq!(range.lower, 1.5);
        assert_eq!(range.upper, 5.0);
    }

    #[test]
    fn test_reasoning_deterministic() {
        let m = make_metrics(0.5, 80.0, 2.0, 24.0, 0.3);
        let a = reasoning_for(&m);
        let b = reasoning_for(&m);
        assert_eq!(a, b);
        assert_eq!(
            a,
            "High trading volume relative to liquidity. Strong fee APR potential. \
             Bullish buy pressure. New pool with growth potential. \
             Healthy volatility for range trading."
        );
    }

    #[test]
    fn test_reasoning_empty_is_bare_period() {
        // Nothing clears a qualitative threshold
        let m = make_metrics(0.1, 10.0, 1.0, 100.0, 0.1);
        assert_eq!(reasoning_for(&m), ".");
    }

    #[test]
    fn test_reasoning_boundaries_are_strict() {
        // Exactly at each threshold → no sentence
        let m = make_metrics(0.3, 50.0, 1.2, 48.0, 0.2);
        assert_eq!(reasoning_for(&m), ".");
    }

    #[test]
    fn test_batch_isolates_bad_pairs() {
        let now = Utc::now();
        let good = PairSnapshot::sample();

        let mut zero_liq = PairSnapshot::sample();
        zero_liq.pair_address = "0xzero_liq".into();
        zero_liq.liquidity_usd = 0.0;

        let mut zero_sells = PairSnapshot::sample();
        zero_sells.pair_address = "0xzero_sells".into();
        zero_sells.txns = WindowedTxns {
            h24: TxnWindow { buys: 10, sells: 0 },
            ..Default::default()
        };

        let scorer = OpportunityScorer::new(ScoringConfig::default());
        let eval = scorer.evaluate_all(&[good.clone(), zero_liq, zero_sells], now);

        assert_eq!(eval.warnings.len(), 2);
        assert!(eval.metrics.contains_key(&good.pair_address));
        assert!(!eval.metrics.contains_key("0xzero_liq"));
        assert!(!eval.metrics.contains_key("0xzero_sells"));
    }

    #[test]
    fn test_batch_sorted_by_score_desc() {
        let now = Utc::now();

        // A hot pair: young, high vtl, strong momentum
        let mut hot = PairSnapshot::sample();
        hot.pair_address = "0xhot".into();
        hot.volume_24h = 2_000_000.0;
        hot.liquidity_usd = 1_000_000.0;
        hot.txns.h24 = TxnWindow { buys: 400, sells: 100 };
        hot.created_at = now - Duration::hours(36);
        hot.price_change_24h_pct = 15.0;

        // A slightly cooler pair, still above threshold
        let mut warm = hot.clone();
        warm.pair_address = "0xwarm".into();
        warm.txns.h24 = TxnWindow { buys: 200, sells: 100 };

        let scorer = OpportunityScorer::new(ScoringConfig::default());
        let eval = scorer.evaluate_all(&[warm, hot], now);

        assert!(eval.opportunities.len() >= 2);
        assert_eq!(eval.opportunities[0].pair_address, "0xhot");
        assert!(eval.opportunities[0].score >= eval.opportunities[1].score);
    }

    #[test]
    fn test_evaluate_pair_below_threshold_is_ok_none() {
        let scorer = OpportunityScorer::new(ScoringConfig::default());
        // Sample pair scores ~0.652 — clean evaluation, no emission
        let result = scorer.evaluate_pair(&PairSnapshot::sample(), Utc::now());
        assert!(matches!(result, Ok(None)));
    }
}
