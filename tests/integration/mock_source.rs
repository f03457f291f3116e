//! In-memory market data source for integration tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use harvester::sources::MarketDataSource;
use harvester::types::{PairSnapshot, TokenInfo, TxnWindow, WindowedTxns};

/// A data source backed by a fixed snapshot list.
pub struct MockDataSource {
    snapshots: Vec<PairSnapshot>,
    force_error: bool,
}

impl MockDataSource {
    pub fn new(snapshots: Vec<PairSnapshot>) -> Self {
        Self {
            snapshots,
            force_error: false,
        }
    }

    /// A source whose fetches always fail.
    pub fn failing() -> Self {
        Self {
            snapshots: Vec::new(),
            force_error: true,
        }
    }
}

#[async_trait]
impl MarketDataSource for MockDataSource {
    async fn fetch_pairs(&self) -> Result<Vec<PairSnapshot>> {
        if self.force_error {
            return Err(anyhow!("mock source failure"));
        }
        Ok(self.snapshots.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A liquid, actively-traded pair that clears the acceptance threshold:
/// vtl 2.0 (cap), fee APR 219% (cap), strong buy pressure, young pool.
pub fn hot_snapshot(pair_address: &str) -> PairSnapshot {
    PairSnapshot {
        pair_address: pair_address.to_string(),
        chain_id: "base".to_string(),
        dex_id: "uniswap".to_string(),
        base_token: TokenInfo {
            address: format!("{pair_address}-base"),
            symbol: "DEGEN".to_string(),
        },
        quote_token: TokenInfo {
            address: "0x4200000000000000000000000000000000000006".to_string(),
            symbol: "WETH".to_string(),
        },
        price_usd: 1.0,
        volume_24h: 2_000_000.0,
        liquidity_usd: 1_000_000.0,
        txns: WindowedTxns {
            h24: TxnWindow {
                buys: 400,
                sells: 100,
            },
            ..Default::default()
        },
        price_change_24h_pct: 15.0,
        created_at: Utc::now() - Duration::hours(36),
    }
}

/// A sleepy pair that scores well under the threshold.
pub fn quiet_snapshot(pair_address: &str) -> PairSnapshot {
    let mut snap = hot_snapshot(pair_address);
    snap.volume_24h = 20_000.0;
    snap.liquidity_usd = 5_000_000.0;
    snap.txns.h24 = TxnWindow { buys: 20, sells: 25 };
    snap.price_change_24h_pct = 0.5;
    snap.created_at = Utc::now() - Duration::days(90);
    snap
}
