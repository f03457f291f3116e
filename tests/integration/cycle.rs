//! End-to-end cycle tests: scan → score → allocate → execute → record.

use chrono::Utc;
use std::collections::HashMap;

use harvester::engine::executor::{execute_batch, DryRunExecutor};
use harvester::engine::portfolio::PortfolioTracker;
use harvester::sources::{scan_sources, MarketDataSource};
use harvester::strategy::allocation::{AllocationConfig, Allocator, LivePair};
use harvester::strategy::scoring::{OpportunityScorer, ScoringConfig};
use harvester::strategy::{live_view, FarmingStrategy};
use harvester::types::{PairSnapshot, PositionAction, PositionStatus};

use super::mock_source::{hot_snapshot, quiet_snapshot, MockDataSource};

fn make_strategy() -> FarmingStrategy {
    FarmingStrategy::new(
        OpportunityScorer::new(ScoringConfig::default()),
        Allocator::new(AllocationConfig::default()),
    )
}

/// Run one full cycle against a set of snapshots, mutating the tracker the
/// way the main loop does.
async fn run_cycle(
    snapshots: &[PairSnapshot],
    strategy: &FarmingStrategy,
    tracker: &mut PortfolioTracker,
) -> (usize, HashMap<String, LivePair>) {
    let now = Utc::now();
    let evaluation = strategy.evaluate(snapshots, now);
    let live = live_view(snapshots, &evaluation);
    tracker.update_signals(&live, now, AllocationConfig::default().exit_bsr_threshold);
    let decisions = strategy.decide(&evaluation, snapshots, tracker.state(), now);
    let report = execute_batch(&DryRunExecutor, &decisions).await;
    assert!(report.failed.is_empty());
    for (decision, receipt) in &report.executed {
        tracker
            .apply(decision, receipt, live.get(&decision.pair_address))
            .unwrap();
    }
    (report.executed.len(), live)
}

#[tokio::test]
async fn test_full_cycle_enters_hot_pair() {
    let strategy = make_strategy();
    let mut tracker = PortfolioTracker::new(1_000_000.0);
    let snapshots = vec![hot_snapshot("0xhot"), quiet_snapshot("0xquiet")];

    let (executed, _) = run_cycle(&snapshots, &strategy, &mut tracker).await;

    assert_eq!(executed, 1);
    let state = tracker.state();
    assert_eq!(state.active_count(), 1);
    let position = state.position_for("0xhot").unwrap();
    assert_eq!(position.status, PositionStatus::Entered);
    // Sized at 5% of the $1M book
    assert!((position.allocated_usd - 50_000.0).abs() < 1e-9);
    // Entry baseline captured for the volume-drop trigger
    assert!((position.entry_volume_24h - 2_000_000.0).abs() < 1e-9);
    assert!((state.unallocated() - 950_000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_malformed_pair_does_not_poison_cycle() {
    let strategy = make_strategy();
    let mut tracker = PortfolioTracker::new(1_000_000.0);

    let mut drained = hot_snapshot("0xdrained");
    drained.liquidity_usd = 0.0;
    let snapshots = vec![drained, hot_snapshot("0xhot")];

    let now = Utc::now();
    let evaluation = strategy.evaluate(&snapshots, now);
    assert_eq!(evaluation.warnings.len(), 1);
    assert_eq!(evaluation.warnings[0].pair_address, "0xdrained");

    let (executed, _) = run_cycle(&snapshots, &strategy, &mut tracker).await;
    assert_eq!(executed, 1);
    assert!(tracker.state().position_for("0xhot").is_some());
    assert!(tracker.state().position_for("0xdrained").is_none());
}

#[tokio::test]
async fn test_volume_collapse_exits_on_later_cycle() {
    let strategy = make_strategy();
    let mut tracker = PortfolioTracker::new(1_000_000.0);

    // Cycle 1: enter
    run_cycle(&[hot_snapshot("0xhot")], &strategy, &mut tracker).await;
    assert_eq!(tracker.state().active_count(), 1);

    // Cycle 2: volume collapses to 10% of the entry baseline
    let mut collapsed = hot_snapshot("0xhot");
    collapsed.volume_24h = 200_000.0;
    run_cycle(&[collapsed], &strategy, &mut tracker).await;

    let state = tracker.state();
    assert_eq!(state.active_count(), 0);
    assert_eq!(state.positions.len(), 1);
    assert_eq!(state.positions[0].status, PositionStatus::Exited);
    // Capital fully released
    assert!((state.unallocated() - 1_000_000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_held_pair_not_reentered_next_cycle() {
    let strategy = make_strategy();
    let mut tracker = PortfolioTracker::new(1_000_000.0);

    run_cycle(&[hot_snapshot("0xhot")], &strategy, &mut tracker).await;
    // Same pair still hot next cycle: no duplicate entry, no exit
    let (executed, _) = run_cycle(&[hot_snapshot("0xhot")], &strategy, &mut tracker).await;

    assert_eq!(executed, 0);
    assert_eq!(tracker.state().active_count(), 1);
}

#[tokio::test]
async fn test_scan_survives_failing_source() {
    let sources: Vec<Box<dyn MarketDataSource>> = vec![
        Box::new(MockDataSource::failing()),
        Box::new(MockDataSource::new(vec![hot_snapshot("0xhot")])),
    ];

    let snapshots = scan_sources(&sources).await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].pair_address, "0xhot");
}

#[tokio::test]
async fn test_exit_decision_carries_reasoning() {
    let strategy = make_strategy();
    let mut tracker = PortfolioTracker::new(1_000_000.0);
    run_cycle(&[hot_snapshot("0xhot")], &strategy, &mut tracker).await;

    let mut collapsed = hot_snapshot("0xhot");
    collapsed.volume_24h = 100_000.0;
    let now = Utc::now();
    let evaluation = strategy.evaluate(&[collapsed.clone()], now);
    let decisions = strategy.decide(&evaluation, &[collapsed], tracker.state(), now);

    let exit = decisions
        .iter()
        .find(|d| d.action == PositionAction::Exit)
        .expect("exit decision");
    assert!(exit.reasoning.contains("volume"));
}
