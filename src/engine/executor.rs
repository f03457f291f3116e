//! Decision executor.
//!
//! Submits position decisions through a `ChainExecutor` and tracks
//! per-batch results. On-chain execution (position minting, range moves,
//! withdrawals) lives behind the trait; the shipped implementation is a
//! dry-run executor that fabricates receipts.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::types::{ExecutionReceipt, PositionAction, PositionDecision};

// ---------------------------------------------------------------------------
// Execution seam
// ---------------------------------------------------------------------------

/// Abstraction over chain execution.
///
/// Takes ownership of a decision's intent: builds, signs, and submits the
/// corresponding transaction, returning a receipt with the transaction id.
/// Implementations are fallible and independently retryable per decision.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    async fn execute(&self, decision: &PositionDecision) -> Result<ExecutionReceipt>;

    /// Executor name for logging and identification.
    fn name(&self) -> &str;
}

/// Logs decisions without touching the chain and fabricates receipts.
pub struct DryRunExecutor;

#[async_trait]
impl ChainExecutor for DryRunExecutor {
    async fn execute(&self, decision: &PositionDecision) -> Result<ExecutionReceipt> {
        info!(
            action = %decision.action,
            pair = %decision.pair_address,
            amount = ?decision.amount_usd,
            "[DRY RUN] Would submit position transaction"
        );
        Ok(ExecutionReceipt {
            tx_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
            pair_address: decision.pair_address.clone(),
            action: decision.action,
            timestamp: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

// ---------------------------------------------------------------------------
// Batch execution
// ---------------------------------------------------------------------------

/// Result of executing a batch of decisions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub executed: Vec<(PositionDecision, ExecutionReceipt)>,
    pub failed: Vec<FailedExecution>,
    /// USD committed by executed entries.
    pub total_committed: f64,
}

#[derive(Debug, Clone)]
pub struct FailedExecution {
    pub pair_address: String,
    pub action: PositionAction,
    pub reason: String,
}

/// Execute a batch of decisions, one at a time.
///
/// Individual failures are collected, not propagated: a reverted ENTER must
/// not block the EXIT queued behind it.
pub async fn execute_batch(
    executor: &dyn ChainExecutor,
    decisions: &[PositionDecision],
) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    if decisions.is_empty() {
        return report;
    }

    info!(
        count = decisions.len(),
        executor = executor.name(),
        "Executing batch"
    );

    for decision in decisions {
        match executor.execute(decision).await {
            Ok(receipt) => {
                if decision.action == PositionAction::Enter {
                    report.total_committed += decision.amount_usd.unwrap_or(0.0);
                }
                report.executed.push((decision.clone(), receipt));
            }
            Err(error) => {
                warn!(
                    pair = %decision.pair_address,
                    action = %decision.action,
                    %error,
                    "Execution failed"
                );
                report.failed.push(FailedExecution {
                    pair_address: decision.pair_address.clone(),
                    action: decision.action,
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        executed = report.executed.len(),
        failed = report.failed.len(),
        committed = format!("${:.2}", report.total_committed),
        "Batch execution complete"
    );

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
