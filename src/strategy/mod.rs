//! Strategy engine — metrics, opportunity scoring, and portfolio allocation.

pub mod allocation;
pub mod metrics;
pub mod scoring;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::types::{PairSnapshot, PortfolioState, PositionDecision};
use allocation::{Allocator, LivePair};
use scoring::{Evaluation, OpportunityScorer};

/// Result of one full strategy pass.
#[derive(Debug, Clone)]
pub struct StrategyPass {
    pub evaluation: Evaluation,
    pub decisions: Vec<PositionDecision>,
}

/// Pipelines snapshot evaluation → opportunity ranking → allocation.
///
/// Pure and stateless between cycles: each pass takes the full snapshot
/// batch, the current portfolio, and an explicit `now`, and returns ranked
/// opportunities plus decisions. Holds no connections, locks, or caches
/// across its boundary.
pub struct FarmingStrategy {
    scorer: OpportunityScorer,
    allocator: Allocator,
}

impl FarmingStrategy {
    pub fn new(scorer: OpportunityScorer, allocator: Allocator) -> Self {
        Self { scorer, allocator }
    }

    /// Score every pair in the batch. Malformed pairs are excluded and
    /// reported as warnings, never as batch failures.
    pub fn evaluate(&self, snapshots: &[PairSnapshot], now: DateTime<Utc>) -> Evaluation {
        let eval = self.scorer.evaluate_all(snapshots, now);

        for warning in &eval.warnings {
            warn!(pair = %warning.pair_address, error = %warning.error, "Pair skipped");
        }
        info!(
            pairs_in = snapshots.len(),
            scored = eval.metrics.len(),
            skipped = eval.warnings.len(),
            opportunities = eval.opportunities.len(),
            "Evaluation complete"
        );

        eval
    }

    /// Apply allocation policy to an evaluation.
    pub fn decide(
        &self,
        evaluation: &Evaluation,
        snapshots: &[PairSnapshot],
        portfolio: &PortfolioState,
        now: DateTime<Utc>,
    ) -> Vec<PositionDecision> {
        let live = live_view(snapshots, evaluation);
        self.allocator
            .decide(&evaluation.opportunities, portfolio, &live, now)
    }

    /// Run the full pass: evaluate, then decide.
    pub fn run(
        &self,
        snapshots: &[PairSnapshot],
        portfolio: &PortfolioState,
        now: DateTime<Utc>,
    ) -> StrategyPass {
        let evaluation = self.evaluate(snapshots, now);
        let decisions = self.decide(&evaluation, snapshots, portfolio, now);
        StrategyPass {
            evaluation,
            decisions,
        }
    }
}

/// Join snapshots with their computed metrics into the allocator's view.
/// Pairs that failed evaluation have no metrics and are omitted.
pub fn live_view(snapshots: &[PairSnapshot], evaluation: &Evaluation) -> HashMap<String, LivePair> {
    snapshots
        .iter()
        .filter_map(|s| {
            evaluation.metrics.get(&s.pair_address).map(|m| {
                (
                    s.pair_address.clone(),
                    LivePair {
                        price_usd: s.price_usd,
                        volume_24h: s.volume_24h,
                        metrics: *m,
                    },
                )
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
