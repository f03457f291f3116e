//! DexScreener REST integration.
//!
//! Fetches pair snapshots for a configured token watchlist on one chain.
//!
//! API docs: https://docs.dexscreener.com/api/reference
//! Base URL: https://api.dexscreener.com/latest/dex
//! Rate limit: 300 requests/minute per IP
//! Auth: none.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::MarketDataSource;
use crate::types::{PairSnapshot, TokenInfo, TxnWindow, WindowedTxns};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex";
const SOURCE_NAME: &str = "dexscreener";

// ---------------------------------------------------------------------------
// API response types (DexScreener JSON → Rust)
// ---------------------------------------------------------------------------

/// Response from `/tokens/{address}`. `pairs` is null when the token is
/// unknown.
#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

/// One pair as DexScreener reports it. We only deserialize the fields we
/// need; numeric fields the API sometimes omits default to zero and are
/// validated during mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id: String,
    dex_id: String,
    pair_address: String,
    base_token: DexToken,
    quote_token: DexToken,

    /// Price in USD, as a decimal string. Absent for unpriced pairs.
    #[serde(default)]
    price_usd: Option<String>,

    #[serde(default)]
    price_change: ChangeWindows,

    #[serde(default)]
    volume: VolumeWindows,

    #[serde(default)]
    txns: TxnWindows,

    /// Absent for pairs DexScreener has no liquidity data for.
    #[serde(default)]
    liquidity: Option<DexLiquidity>,

    /// Pair creation time, ms since epoch. Absent for some older pairs.
    #[serde(default)]
    pair_created_at: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct DexToken {
    #[serde(default)]
    address: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize, Default)]
struct ChangeWindows {
    #[serde(default)]
    h24: f64,
}

#[derive(Debug, Deserialize, Default)]
struct VolumeWindows {
    #[serde(default)]
    h24: f64,
}

#[derive(Debug, Deserialize, Default)]
struct TxnWindows {
    #[serde(default)]
    m5: DexTxnWindow,
    #[serde(default)]
    h1: DexTxnWindow,
    #[serde(default)]
    h6: DexTxnWindow,
    #[serde(default)]
    h24: DexTxnWindow,
}

#[derive(Debug, Deserialize, Default)]
struct DexTxnWindow {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

impl From<DexTxnWindow> for TxnWindow {
    fn from(w: DexTxnWindow) -> Self {
        TxnWindow {
            buys: w.buys,
            sells: w.sells,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct DexLiquidity {
    #[serde(default)]
    usd: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DexScreener market data client for one chain.
pub struct DexScreenerClient {
    http: Client,
    /// Chain to keep, e.g. "base" — token endpoints return pairs across
    /// every chain DexScreener tracks.
    chain_id: String,
    /// Token addresses whose pairs are fetched each cycle.
    token_watchlist: Vec<String>,
}

impl DexScreenerClient {
    pub fn new(chain_id: String, token_watchlist: Vec<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("HARVESTER/0.1.0 (lp-farming-agent)")
            .build()
            .context("Failed to build HTTP client for DexScreener")?;

        Ok(Self {
            http,
            chain_id,
            token_watchlist,
        })
    }

    /// Fetch all pairs trading a given token.
    async fn fetch_token_pairs(&self, token_address: &str) -> Result<Vec<DexPair>> {
        let url = format!("{BASE_URL}/tokens/{token_address}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("DexScreener request failed: {url}"))?
            .error_for_status()
            .context("DexScreener returned an error status")?;

        let body: PairsResponse = response
            .json()
            .await
            .context("Failed to parse DexScreener response")?;

        Ok(body.pairs.unwrap_or_default())
    }

    /// Map an API pair to a snapshot, or None when required fields are
    /// missing. Incomplete pairs are common (new listings without liquidity
    /// data) and are dropped here rather than poisoning the batch.
    fn to_snapshot(&self, pair: DexPair) -> Option<PairSnapshot> {
        if pair.chain_id != self.chain_id {
            return None;
        }

        let Some(price_usd) = pair.price_usd.as_deref().and_then(|p| p.parse::<f64>().ok())
        else {
            debug!(pair = %pair.pair_address, "Dropping pair without USD price");
            return None;
        };

        let Some(liquidity) = pair.liquidity else {
            debug!(pair = %pair.pair_address, "Dropping pair without liquidity data");
            return None;
        };

        let Some(created_at) = pair
            .pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        else {
            debug!(pair = %pair.pair_address, "Dropping pair without creation time");
            return None;
        };

        Some(PairSnapshot {
            pair_address: pair.pair_address,
            chain_id: pair.chain_id,
            dex_id: pair.dex_id,
            base_token: TokenInfo {
                address: pair.base_token.address,
                symbol: pair.base_token.symbol,
            },
            quote_token: TokenInfo {
                address: pair.quote_token.address,
                symbol: pair.quote_token.symbol,
            },
            price_usd,
            volume_24h: pair.volume.h24,
            liquidity_usd: liquidity.usd,
            txns: WindowedTxns {
                m5: pair.txns.m5.into(),
                h1: pair.txns.h1.into(),
                h6: pair.txns.h6.into(),
                h24: pair.txns.h24.into(),
            },
            price_change_24h_pct: pair.price_change.h24,
            created_at,
        })
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch_pairs(&self) -> Result<Vec<PairSnapshot>> {
        let fetches = self
            .token_watchlist
            .iter()
            .map(|token| self.fetch_token_pairs(token));
        let results = futures::future::join_all(fetches).await;

        // Both tokens of a pair can be on the watchlist, so dedupe by
        // pair address.
        let mut seen = std::collections::HashSet::new();
        let mut snapshots = Vec::new();

        for (token, result) in self.token_watchlist.iter().zip(results) {
            match result {
                Ok(pairs) => {
                    for snapshot in pairs.into_iter().filter_map(|p| self.to_snapshot(p)) {
                        if seen.insert(snapshot.pair_address.clone()) {
                            snapshots.push(snapshot);
                        }
                    }
                }
                Err(error) => {
                    // One token failing shouldn't starve the whole watchlist.
                    warn!(token = %token, %error, "Token fetch failed, continuing");
                }
            }
        }

        Ok(snapshots)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
