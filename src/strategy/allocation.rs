//! Portfolio allocation.
//!
//! Turns ranked opportunities plus current portfolio state into concrete
//! ENTER / EXIT / ADJUST decisions, subject to tier targets, position-size
//! caps, and the minimum-positions band. Constraints live here, never in
//! the scoring function. Stateless: the full snapshot is re-evaluated every
//! cycle.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use super::scoring::suggested_range;
use crate::types::{
    Opportunity, PairMetrics, PortfolioState, PositionAction, PositionDecision, Tier,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Allocation policy (defaults — overridden by config.toml at runtime).
#[derive(Debug, Clone)]
pub struct AllocationConfig {
    /// Target share of total value per tier.
    pub tier_one_target: f64,
    pub tier_two_target: f64,
    pub tier_three_target: f64,
    /// Hard cap on any single position as a fraction of total value.
    pub max_position_pct: f64,
    /// Default sizing for a new position as a fraction of total value.
    pub new_position_pct: f64,
    /// Below this many active positions, tier targets are relaxed so the
    /// book fills first.
    pub min_positions: usize,
    pub max_positions: usize,
    /// Exit when 24h volume drops by more than this fraction of the entry
    /// baseline.
    pub volume_drop_pct: f64,
    /// Exit when the buy/sell ratio stays below this...
    pub exit_bsr_threshold: f64,
    /// ...for at least this many hours.
    pub bsr_sustain_hours: i64,
    /// Per-tier fee APR floors, in percent.
    pub tier_one_apr_floor: f64,
    pub tier_two_apr_floor: f64,
    pub tier_three_apr_floor: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
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
        }
    }
}

impl AllocationConfig {
    /// Target share of total value for a tier.
    pub fn target_for(&self, tier: Tier) -> f64 {
        match tier {
            Tier::One => self.tier_one_target,
            Tier::Two => self.tier_two_target,
            Tier::Three => self.tier_three_target,
        }
    }

    /// Minimum acceptable fee APR for a tier, in percent.
    pub fn apr_floor_for(&self, tier: Tier) -> f64 {
        match tier {
            Tier::One => self.tier_one_apr_floor,
            Tier::Two => self.tier_two_apr_floor,
            Tier::Three => self.tier_three_apr_floor,
        }
    }
}

// ---------------------------------------------------------------------------
// Live pair view
// ---------------------------------------------------------------------------

/// Current-cycle view of a pair, as the allocator needs it: price for range
/// checks, raw 24h volume for the drop trigger, metrics for the rest.
#[derive(Debug, Clone, Copy)]
pub struct LivePair {
    pub price_usd: f64,
    pub volume_24h: f64,
    pub metrics: PairMetrics,
}

// ---------------------------------------------------------------------------
// Tier classification
// ---------------------------------------------------------------------------

/// Classify a pair into a risk tier from its metrics.
///
/// The thresholds are heuristic: pools under a week old or with triple-digit
/// APR are high-risk alpha (tier 3); pools over a month old with modest
/// turnover are blue chip (tier 1); everything else is a momentum play
/// (tier 2).
pub fn classify_tier(metrics: &PairMetrics) -> Tier {
    if metrics.age_hours < 168.0 || metrics.fee_apr > 100.0 {
        Tier::Three
    } else if metrics.age_hours > 720.0 && metrics.volume_to_liquidity < 0.5 {
        Tier::One
    } else {
        Tier::Two
    }
}

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

/// Applies allocation policy to produce position decisions.
pub struct Allocator {
    config: AllocationConfig,
}

impl Allocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Produce this cycle's decisions: exits first, then range adjustments
    /// for held positions, then new entries in opportunity-score order.
    pub fn decide(
        &self,
        opportunities: &[Opportunity],
        portfolio: &PortfolioState,
        live: &HashMap<String, LivePair>,
        now: DateTime<Utc>,
    ) -> Vec<PositionDecision> {
        let mut decisions = Vec::new();

        let exiting = self.plan_exits(portfolio, live, now, &mut decisions);
        self.plan_adjusts(portfolio, live, &exiting, &mut decisions);
        self.plan_entries(opportunities, portfolio, &mut decisions);

        info!(
            exits = decisions.iter().filter(|d| d.action == PositionAction::Exit).count(),
            adjusts = decisions.iter().filter(|d| d.action == PositionAction::Adjust).count(),
            entries = decisions.iter().filter(|d| d.action == PositionAction::Enter).count(),
            "Allocation pass complete"
        );

        decisions
    }

    /// Evaluate exit triggers for every active position. Returns the set of
    /// pair addresses being exited this cycle.
    fn plan_exits(
        &self,
        portfolio: &PortfolioState,
        live: &HashMap<String, LivePair>,
        now: DateTime<Utc>,
        decisions: &mut Vec<PositionDecision>,
    ) -> Vec<String> {
        let mut exiting = Vec::new();

        for position in portfolio.active_positions() {
            // A pair missing from this fetch is a data gap, not a signal.
            let Some(pair) = live.get(&position.pair_address) else {
                debug!(pair = %position.pair_address, "No live data for held position");
                continue;
            };

            let reason = self.exit_trigger(position, pair, now);
            if let Some(reason) = reason {
                info!(pair = %position.pair_address, %reason, "Exit triggered");
                decisions.push(PositionDecision {
                    action: PositionAction::Exit,
                    pair_address: position.pair_address.clone(),
                    amount_usd: None,
                    range: None,
                    tier: None,
                    reasoning: reason,
                });
                exiting.push(position.pair_address.clone());
            }
        }

        exiting
    }

    /// First matching exit trigger for a position, if any.
    fn exit_trigger(
        &self,
        position: &crate::types::Position,
        pair: &LivePair,
        now: DateTime<Utc>,
    ) -> Option<String> {
        // Volume collapse vs entry baseline
        if position.entry_volume_24h > 0.0 {
            let drop = 1.0 - pair.volume_24h / position.entry_volume_24h;
            if drop > self.config.volume_drop_pct {
                return Some(format!(
                    "24h volume down {:.0}% from entry baseline",
                    drop * 100.0
                ));
            }
        }

        // Sustained weak buy pressure. The streak start is carried on the
        // position by the portfolio tracker; the core stays stateless.
        if pair.metrics.buy_to_sell_ratio < self.config.exit_bsr_threshold {
            if let Some(since) = position.bsr_below_since {
                if now - since >= Duration::hours(self.config.bsr_sustain_hours) {
                    return Some(format!(
                        "buy/sell ratio below {:.1} for {}h+",
                        self.config.exit_bsr_threshold, self.config.bsr_sustain_hours
                    ));
                }
            }
        }

        // Fee APR under the tier floor
        let floor = self.config.apr_floor_for(position.tier);
        if pair.metrics.fee_apr < floor {
            return Some(format!(
                "fee APR {:.1}% below {} floor of {:.0}%",
                pair.metrics.fee_apr, position.tier, floor
            ));
        }

        None
    }

    /// Re-center ranges for held positions whose price has drifted out.
    fn plan_adjusts(
        &self,
        portfolio: &PortfolioState,
        live: &HashMap<String, LivePair>,
        exiting: &[String],
        decisions: &mut Vec<PositionDecision>,
    ) {
        for position in portfolio.active_positions() {
            if exiting.contains(&position.pair_address) {
                continue;
            }
            let Some(pair) = live.get(&position.pair_address) else {
                continue;
            };

            if !position.range.contains(pair.price_usd) {
                let range = suggested_range(pair.price_usd);
                info!(
                    pair = %position.pair_address,
                    price = pair.price_usd,
                    old_range = %position.range,
                    new_range = %range,
                    "Price left range, adjusting"
                );
                decisions.push(PositionDecision {
                    action: PositionAction::Adjust,
                    pair_address: position.pair_address.clone(),
                    amount_usd: None,
                    range: Some(range),
                    tier: None,
                    reasoning: format!(
                        "price ${:.4} outside active range {}",
                        pair.price_usd, position.range
                    ),
                });
            }
        }
    }

    /// Open new positions from the ranked opportunity list.
    fn plan_entries(
        &self,
        opportunities: &[Opportunity],
        portfolio: &PortfolioState,
        decisions: &mut Vec<PositionDecision>,
    ) {
        let total = portfolio.total_value_usd;
        let mut open_count = portfolio.active_count();
        let mut available = portfolio.unallocated();
        // Entries planned this cycle count against tier budgets immediately.
        let mut pending_by_tier: HashMap<Tier, f64> = HashMap::new();

        for opp in opportunities {
            if open_count >= self.config.max_positions {
                debug!(pair = %opp.pair_address, "At max positions, skipping entry");
                break;
            }
            if portfolio.position_for(&opp.pair_address).is_some() {
                debug!(pair = %opp.pair_address, "Already holding pair");
                continue;
            }

            let tier = classify_tier(&opp.metrics);
            let tier_allocated = portfolio.allocation_for(tier)
                + pending_by_tier.get(&tier).copied().unwrap_or(0.0);
            let tier_budget = self.config.target_for(tier) * total;

            // Tier targets yield while the book is under-filled.
            if tier_allocated >= tier_budget && open_count >= self.config.min_positions {
                debug!(
                    pair = %opp.pair_address,
                    %tier,
                    allocated = format!("${tier_allocated:.0}"),
                    budget = format!("${tier_budget:.0}"),
                    "Tier target met, skipping entry"
                );
                continue;
            }

            let amount = (self.config.new_position_pct * total)
                .min(self.config.max_position_pct * total)
                .min(available);
            if amount <= 0.0 {
                debug!(pair = %opp.pair_address, "No capital available for entry");
                break;
            }

            info!(
                pair = %opp.pair_address,
                score = format!("{:.1}%", opp.score * 100.0),
                %tier,
                amount = format!("${amount:.0}"),
                range = %opp.suggested_range,
                "Entry planned"
            );

            decisions.push(PositionDecision {
                action: PositionAction::Enter,
                pair_address: opp.pair_address.clone(),
                amount_usd: Some(amount),
                range: Some(opp.suggested_range),
                tier: Some(tier),
                reasoning: format!("score {:.1}%: {}", opp.score * 100.0, opp.reasoning),
            });

            open_count += 1;
            available -= amount;
            *pending_by_tier.entry(tier).or_insert(0.0) += amount;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
