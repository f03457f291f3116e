//! HARVESTER — Autonomous LP Yield-Farming Agent
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! up the data sources, strategy, and execution engine, and runs the main
//! scan→score→allocate→execute loop with graceful shutdown.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, warn};

use harvester::config;
use harvester::engine::executor::{execute_batch, ChainExecutor, DryRunExecutor};
use harvester::engine::portfolio::PortfolioTracker;
use harvester::sources::dexscreener::DexScreenerClient;
use harvester::sources::{scan_sources, MarketDataSource};
use harvester::strategy::allocation::Allocator;
use harvester::strategy::scoring::OpportunityScorer;
use harvester::strategy::{live_view, FarmingStrategy};
use harvester::types::PositionAction;

const BANNER: &str = r#"
 _   _    _    ______     _______ ____ _____ _____ ____
| | | |  / \  |  _ \ \   / / ____/ ___|_   _| ____|  _ \
| |_| | / _ \ | |_) \ \ / /|  _| \___ \ | | |  _| | |_) |
|  _  |/ ___ \|  _ < \ V / | |___ ___) || | | |___|  _ <
|_| |_/_/   \_\_| \_\ \_/  |_____|____/ |_| |_____|_| \_\

  Autonomous LP Yield-Farming Agent
  v0.1.0 — Base
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        scan_interval_secs = cfg.agent.scan_interval_secs,
        chain = %cfg.agent.chain,
        total_value = format!("${:.0}", cfg.agent.total_value_usd),
        "HARVESTER starting up"
    );

    // -- Initialise components -------------------------------------------

    let mut sources: Vec<Box<dyn MarketDataSource>> = Vec::new();
    if cfg.sources.dexscreener.enabled {
        sources.push(Box::new(DexScreenerClient::new(
            cfg.agent.chain.clone(),
            cfg.sources.dexscreener.token_watchlist.clone(),
        )?));
    }
    if sources.is_empty() {
        warn!("No data sources enabled — every cycle will be empty");
    }

    let strategy = FarmingStrategy::new(
        OpportunityScorer::new(cfg.strategy.scoring()),
        Allocator::new(cfg.strategy.allocation()),
    );

    let mut tracker = PortfolioTracker::new(cfg.agent.total_value_usd);

    // On-chain execution is not wired up yet, so the executor is always
    // dry-run regardless of config.
    if !cfg.execution.dry_run {
        warn!("Live execution not available — forcing dry-run mode");
    }
    let executor = DryRunExecutor;

    let bsr_threshold = cfg.strategy.exit_bsr_threshold;

    // -- Main loop -------------------------------------------------------

    let scan_interval = Duration::from_secs(cfg.agent.scan_interval_secs);
    let mut interval = tokio::time::interval(scan_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.scan_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    let mut cycle_count: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cycle_count += 1;
                match run_cycle(&sources, &strategy, &executor, &mut tracker, bsr_threshold, cycle_count).await {
                    Ok(summary) => log_cycle_summary(&summary),
                    Err(e) => error!(error = %e, "Cycle failed — continuing to next"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    let state = tracker.state();
    info!(
        cycles = cycle_count,
        positions = state.active_count(),
        allocated = format!("${:.2}", state.allocated_total()),
        "HARVESTER shut down cleanly."
    );

    Ok(())
}

/// Summary of one scan→score→allocate→execute cycle.
struct CycleSummary {
    cycle_number: u64,
    pairs_scanned: usize,
    pairs_skipped: usize,
    opportunities: usize,
    entries: usize,
    exits: usize,
    adjusts: usize,
    failed: usize,
    committed: f64,
    active_positions: usize,
}

/// Run a single cycle.
async fn run_cycle(
    sources: &[Box<dyn MarketDataSource>],
    strategy: &FarmingStrategy,
    executor: &dyn ChainExecutor,
    tracker: &mut PortfolioTracker,
    bsr_threshold: f64,
    cycle_number: u64,
) -> Result<CycleSummary> {
    info!(cycle = cycle_number, "Starting cycle");
    let now = Utc::now();

    // 1. Scan sources
    let snapshots = scan_sources(sources).await;
    let pairs_scanned = snapshots.len();

    // 2. Score the batch
    let evaluation = strategy.evaluate(&snapshots, now);
    let live = live_view(&snapshots, &evaluation);

    // 3. Refresh held-position signals before deciding, so a weak-pressure
    //    streak crossing the sustain window exits this cycle
    tracker.update_signals(&live, now, bsr_threshold);

    // 4. Allocate
    let decisions = strategy.decide(&evaluation, &snapshots, tracker.state(), now);

    // 5. Execute
    let report = execute_batch(executor, &decisions).await;

    // 6. Apply confirmed results to the portfolio
    for (decision, receipt) in &report.executed {
        if let Err(e) = tracker.apply(decision, receipt, live.get(&decision.pair_address)) {
            error!(pair = %decision.pair_address, error = %e, "Failed to record execution");
        }
    }

    let count = |action| {
        report
            .executed
            .iter()
            .filter(|(d, _)| d.action == action)
            .count()
    };

    Ok(CycleSummary {
        cycle_number,
        pairs_scanned,
        pairs_skipped: evaluation.warnings.len(),
        opportunities: evaluation.opportunities.len(),
        entries: count(PositionAction::Enter),
        exits: count(PositionAction::Exit),
        adjusts: count(PositionAction::Adjust),
        failed: report.failed.len(),
        committed: report.total_committed,
        active_positions: tracker.state().active_count(),
    })
}

/// Log a human-readable cycle summary.
fn log_cycle_summary(summary: &CycleSummary) {
    info!(
        cycle = summary.cycle_number,
        scanned = summary.pairs_scanned,
        skipped = summary.pairs_skipped,
        opportunities = summary.opportunities,
        entries = summary.entries,
        exits = summary.exits,
        adjusts = summary.adjusts,
        failed = summary.failed,
        committed = format!("${:.2}", summary.committed),
        positions = summary.active_positions,
        "Cycle complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("harvester=info"));

    let json_logging = std::env::var("HARVESTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
