//! Market data sources.
//!
//! Defines the `MarketDataSource` trait and provides the DexScreener REST
//! implementation. Sources are asynchronous, fallible, and independently
//! retryable; the strategy core never talks to them directly.

pub mod dexscreener;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::types::PairSnapshot;

/// Abstraction over pair-snapshot providers.
///
/// Implementors fetch the current market state for a set of trading pairs.
/// A failed fetch is the caller's problem to retry; implementations should
/// not loop internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch current snapshots for this source's pair set.
    async fn fetch_pairs(&self) -> Result<Vec<PairSnapshot>>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

/// Fetch from every source, deduplicating by pair address (first source
/// wins). A source failing does not fail the scan; it is logged and the
/// remaining sources are still consulted.
pub async fn scan_sources(sources: &[Box<dyn MarketDataSource>]) -> Vec<PairSnapshot> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut snapshots = Vec::new();

    for source in sources {
        match source.fetch_pairs().await {
            Ok(pairs) => {
                let fetched = pairs.len();
                for pair in pairs {
                    if seen.insert(pair.pair_address.clone()) {
                        snapshots.push(pair);
                    }
                }
                info!(source = source.name(), fetched, "Source scanned");
            }
            Err(error) => {
                warn!(source = source.name(), %error, "Source fetch failed, continuing");
            }
        }
    }

    snapshots
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
