//! Shared types for the HARVESTER agent.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that source, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// A token in a trading pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
}

/// Buy/sell transaction counts within one timeframe.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TxnWindow {
    pub buys: u64,
    pub sells: u64,
}

/// Transaction counts across the standard DEX timeframes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WindowedTxns {
    pub m5: TxnWindow,
    pub h1: TxnWindow,
    pub h6: TxnWindow,
    pub h24: TxnWindow,
}

/// One trading pair's market state at fetch time. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSnapshot {
    /// Pool contract address.
    pub pair_address: String,
    /// Chain identifier, e.g. "base".
    pub chain_id: String,
    /// DEX identifier, e.g. "uniswap" or "aerodrome".
    pub dex_id: String,
    pub base_token: TokenInfo,
    pub quote_token: TokenInfo,
    /// Current price in USD.
    pub price_usd: f64,
    /// Rolling 24-hour volume in USD.
    pub volume_24h: f64,
    /// Pool liquidity in USD.
    pub liquidity_usd: f64,
    pub txns: WindowedTxns,
    /// 24-hour price change, as a percentage (10.0 = +10%).
    pub price_change_24h_pct: f64,
    /// Pool creation time.
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for PairSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}/{} (${:.6} | vol: ${:.0} | liq: ${:.0})",
            self.chain_id,
            self.dex_id,
            self.base_token.symbol,
            self.quote_token.symbol,
            self.price_usd,
            self.volume_24h,
            self.liquidity_usd,
        )
    }
}

impl PairSnapshot {
    /// Helper to build a test/sample pair with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        PairSnapshot {
            pair_address: "0xpair0001".to_string(),
            chain_id: "base".to_string(),
            dex_id: "uniswap".to_string(),
            base_token: TokenInfo {
                address: "0xbase0001".to_string(),
                symbol: "DEGEN".to_string(),
            },
            quote_token: TokenInfo {
                address: "0x4200000000000000000000000000000000000006".to_string(),
                symbol: "WETH".to_string(),
            },
            price_usd: 1.0,
            volume_24h: 300_000.0,
            liquidity_usd: 1_000_000.0,
            txns: WindowedTxns {
                h24: TxnWindow { buys: 150, sells: 50 },
                ..Default::default()
            },
            price_change_24h_pct: 10.0,
            created_at: Utc::now() - chrono::Duration::hours(72),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------

/// Normalized per-pair signals, computed fresh each evaluation cycle.
/// All fields are non-negative; `price_volatility` and `buy_to_sell_ratio`
/// are unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    /// 24h volume divided by pool liquidity.
    pub volume_to_liquidity: f64,
    /// Annualized fee return estimate, in percent.
    pub fee_apr: f64,
    /// High-low range over current price (a proxy, not statistical vol).
    pub price_volatility: f64,
    /// 24h buys divided by 24h sells.
    pub buy_to_sell_ratio: f64,
    /// Pool age in hours (fractional).
    pub age_hours: f64,
}

impl fmt::Display for PairMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vtl: {:.3} | APR: {:.1}% | vol: {:.3} | b/s: {:.2} | age: {:.0}h",
            self.volume_to_liquidity,
            self.fee_apr,
            self.price_volatility,
            self.buy_to_sell_ratio,
            self.age_hours,
        )
    }
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

/// A price interval within which a concentrated-liquidity position earns fees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub lower: f64,
    pub upper: f64,
}

impl PriceRange {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether a price falls inside the range (inclusive).
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[${:.4}, ${:.4}]", self.lower, self.upper)
    }
}

/// A scored farming opportunity, emitted when the score clears the
/// acceptance threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub pair_address: String,
    /// Normalized score in [0, 1].
    pub score: f64,
    pub suggested_range: PriceRange,
    pub metrics: PairMetrics,
    pub reasoning: String,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}% {} — {}",
            self.pair_address,
            self.score * 100.0,
            self.suggested_range,
            self.reasoning,
        )
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

/// Risk classification bucket used for allocation targets.
/// Tier 1 = blue chip, Tier 3 = high-risk alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
}

impl Tier {
    /// All tiers (useful for iteration).
    pub const ALL: &'static [Tier] = &[Tier::One, Tier::Two, Tier::Three];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::One => write!(f, "Tier 1"),
            Tier::Two => write!(f, "Tier 2"),
            Tier::Three => write!(f, "Tier 3"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "one" | "tier 1" => Ok(Tier::One),
            "2" | "two" | "tier 2" => Ok(Tier::Two),
            "3" | "three" | "tier 3" => Ok(Tier::Three),
            _ => Err(anyhow::anyhow!("Unknown tier: {s}")),
        }
    }
}

/// Lifecycle status of a position.
/// Transitions: (none) → Entered → Adjusted* → Exited, driven only by
/// confirmed execution receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Entered,
    Adjusted,
    Exited,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Entered => write!(f, "ENTERED"),
            PositionStatus::Adjusted => write!(f, "ADJUSTED"),
            PositionStatus::Exited => write!(f, "EXITED"),
        }
    }
}

/// An active LP position under management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub pair_address: String,
    pub tier: Tier,
    pub allocated_usd: f64,
    pub entry_price: f64,
    pub range: PriceRange,
    /// 24h volume at entry time — baseline for the volume-drop exit trigger.
    pub entry_volume_24h: f64,
    pub entered_at: DateTime<Utc>,
    pub status: PositionStatus,
    /// When the buy/sell ratio first dropped below the exit threshold.
    /// Cleared whenever the ratio recovers. Read by the sustained-weakness
    /// exit trigger.
    pub bsr_below_since: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_active(&self) -> bool {
        self.status != PositionStatus::Exited
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ${:.0} ({}) {} [{}]",
            self.pair_address, self.allocated_usd, self.tier, self.range, self.status,
        )
    }
}

/// Current portfolio state. Supplied by the portfolio collaborator and
/// read-only to the strategy core; mutated only by confirmed execution
/// results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Total value under management in USD.
    pub total_value_usd: f64,
    /// USD allocated per tier.
    pub tier_allocations: HashMap<Tier, f64>,
    pub positions: Vec<Position>,
}

impl PortfolioState {
    pub fn new(total_value_usd: f64) -> Self {
        Self {
            total_value_usd,
            tier_allocations: HashMap::new(),
            positions: Vec::new(),
        }
    }

    /// Positions that have not been exited.
    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_positions().count()
    }

    /// USD currently allocated to a tier.
    pub fn allocation_for(&self, tier: Tier) -> f64 {
        self.tier_allocations.get(&tier).copied().unwrap_or(0.0)
    }

    /// Total USD committed across active positions.
    pub fn allocated_total(&self) -> f64 {
        self.active_positions().map(|p| p.allocated_usd).sum()
    }

    /// Uncommitted capital.
    pub fn unallocated(&self) -> f64 {
        (self.total_value_usd - self.allocated_total()).max(0.0)
    }

    /// Look up the active position for a pair, if any.
    pub fn position_for(&self, pair_address: &str) -> Option<&Position> {
        self.active_positions()
            .find(|p| p.pair_address == pair_address)
    }
}

// ---------------------------------------------------------------------------
// Decisions & execution
// ---------------------------------------------------------------------------

/// Kind of position change being proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionAction {
    Enter,
    Exit,
    Adjust,
}

impl fmt::Display for PositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionAction::Enter => write!(f, "ENTER"),
            PositionAction::Exit => write!(f, "EXIT"),
            PositionAction::Adjust => write!(f, "ADJUST"),
        }
    }
}

/// Output of the allocation engine. Ownership passes to the execution
/// collaborator once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDecision {
    pub action: PositionAction,
    pub pair_address: String,
    /// USD to commit (ENTER only).
    pub amount_usd: Option<f64>,
    /// Target range (ENTER and ADJUST).
    pub range: Option<PriceRange>,
    /// Tier classification (ENTER only).
    pub tier: Option<Tier>,
    pub reasoning: String,
}

impl fmt::Display for PositionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.pair_address)?;
        if let Some(amount) = self.amount_usd {
            write!(f, " ${amount:.0}")?;
        }
        if let Some(range) = &self.range {
            write!(f, " {range}")?;
        }
        write!(f, " — {}", self.reasoning)
    }
}

/// Receipt returned after a decision is executed on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// Transaction identifier (hash, or a dry-run id).
    pub tx_id: String,
    pub pair_address: String,
    pub action: PositionAction,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
