//! Portfolio tracking.
//!
//! Owns the `PortfolioState` and is the only place it is mutated. State
//! changes happen in exactly two ways: applying a confirmed execution
//! receipt, and refreshing per-position signals (the buy-pressure streak)
//! from the latest market view. The strategy core only ever sees the state
//! read-only.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::strategy::allocation::LivePair;
use crate::types::{
    ExecutionReceipt, PortfolioState, Position, PositionAction, PositionDecision, PositionStatus,
};

/// Tracks positions and tier allocations across cycles.
pub struct PortfolioTracker {
    state: PortfolioState,
}

impl PortfolioTracker {
    pub fn new(total_value_usd: f64) -> Self {
        Self {
            state: PortfolioState::new(total_value_usd),
        }
    }

    /// Resume from a previously built state.
    pub fn with_state(state: PortfolioState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    /// Apply one confirmed execution to the portfolio.
    ///
    /// `market` is the live view of the pair at execution time; entries need
    /// it for the entry price and the volume baseline. Rejects transitions
    /// the lifecycle does not allow (double enter, adjust/exit of a pair we
    /// do not hold).
    pub fn apply(
        &mut self,
        decision: &PositionDecision,
        receipt: &ExecutionReceipt,
        market: Option<&LivePair>,
    ) -> Result<()> {
        match decision.action {
            PositionAction::Enter => self.apply_enter(decision, receipt, market),
            PositionAction::Adjust => self.apply_adjust(decision, receipt),
            PositionAction::Exit => self.apply_exit(decision, receipt),
        }
    }

    fn apply_enter(
        &mut self,
        decision: &PositionDecision,
        receipt: &ExecutionReceipt,
        market: Option<&LivePair>,
    ) -> Result<()> {
        if self.state.position_for(&decision.pair_address).is_some() {
            bail!("Already holding an active position in {}", decision.pair_address);
        }
        let amount = decision
            .amount_usd
            .context("ENTER decision without an amount")?;
        let range = decision.range.context("ENTER decision without a range")?;
        let tier = decision.tier.context("ENTER decision without a tier")?;
        let market = market.with_context(|| {
            format!("No market data for entered pair {}", decision.pair_address)
        })?;

        self.state.positions.push(Position {
            pair_address: decision.pair_address.clone(),
            tier,
            allocated_usd: amount,
            entry_price: market.price_usd,
            range,
            entry_volume_24h: market.volume_24h,
            entered_at: receipt.timestamp,
            status: PositionStatus::Entered,
            bsr_below_since: None,
        });
        *self.state.tier_allocations.entry(tier).or_insert(0.0) += amount;

        info!(
            pair = %decision.pair_address,
            %tier,
            amount = format!("${amount:.0}"),
            tx = %receipt.tx_id,
            "Position entered"
        );
        Ok(())
    }

    fn apply_adjust(&mut self, decision: &PositionDecision, receipt: &ExecutionReceipt) -> Result<()> {
        let range = decision.range.context("ADJUST decision without a range")?;
        let position = self
            .active_position_mut(&decision.pair_address)
            .with_context(|| {
                format!("No active position in {} to adjust", decision.pair_address)
            })?;

        position.range = range;
        position.status = PositionStatus::Adjusted;

        info!(
            pair = %decision.pair_address,
            new_range = %range,
            tx = %receipt.tx_id,
            "Position range adjusted"
        );
        Ok(())
    }

    fn apply_exit(&mut self, decision: &PositionDecision, receipt: &ExecutionReceipt) -> Result<()> {
        let position = self
            .active_position_mut(&decision.pair_address)
            .with_context(|| {
                format!("No active position in {} to exit", decision.pair_address)
            })?;

        position.status = PositionStatus::Exited;
        let tier = position.tier;
        let amount = position.allocated_usd;

        if let Some(allocated) = self.state.tier_allocations.get_mut(&tier) {
            *allocated = (*allocated - amount).max(0.0);
        }

        info!(
            pair = %decision.pair_address,
            %tier,
            released = format!("${amount:.0}"),
            tx = %receipt.tx_id,
            "Position exited"
        );
        Ok(())
    }

    /// Refresh per-position market signals from this cycle's view.
    ///
    /// Starts the weak-buy-pressure clock when a held pair's buy/sell ratio
    /// drops below the threshold, and clears it on recovery. Runs before the
    /// allocator so a streak that just crossed the sustain window is acted
    /// on in the same cycle.
    pub fn update_signals(
        &mut self,
        live: &HashMap<String, LivePair>,
        now: DateTime<Utc>,
        bsr_threshold: f64,
    ) {
        for position in self.state.positions.iter_mut().filter(|p| p.is_active()) {
            let Some(pair) = live.get(&position.pair_address) else {
                continue;
            };

            if pair.metrics.buy_to_sell_ratio < bsr_threshold {
                if position.bsr_below_since.is_none() {
                    debug!(
                        pair = %position.pair_address,
                        ratio = pair.metrics.buy_to_sell_ratio,
                        "Weak buy pressure streak started"
                    );
                    position.bsr_below_since = Some(now);
                }
            } else if position.bsr_below_since.take().is_some() {
                debug!(
                    pair = %position.pair_address,
                    ratio = pair.metrics.buy_to_sell_ratio,
                    "Buy pressure recovered"
                );
            }
        }
    }

    fn active_position_mut(&mut self, pair_address: &str) -> Option<&mut Position> {
        self.state
            .positions
            .iter_mut()
            .find(|p| p.is_active() && p.pair_address == pair_address)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
