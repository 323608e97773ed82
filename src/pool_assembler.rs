//! # Pool Assembler
//!
//! Shared building blocks for turning joined market data into [`YieldPool`]
//! records, plus the final gate every adaptor's output passes through.
//!
//! Two TVL accounting models coexist and are deliberately kept apart:
//!
//! - [`available_liquidity_totals`]: TVL is the liquidity sitting in the
//!   reserve; total supply adds outstanding borrows on top (Aave style).
//! - [`cash_borrows_reserves_totals`]: total supply is
//!   `cash + borrows - reserves`; TVL is supply minus borrows (Compound style).

use std::collections::HashSet;
use tracing::debug;

use crate::metrics;
use crate::pools::YieldPool;

/// USD totals of one market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketTotals {
    pub tvl_usd: f64,
    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
}

/// `amount / 10^decimals * price`
pub fn to_usd(amount: f64, decimals: u32, price: f64) -> f64 {
    amount / 10f64.powi(decimals as i32) * price
}

/// Aave style: TVL is available liquidity, supply is liquidity plus borrows.
pub fn available_liquidity_totals(liquidity: f64, total_borrows: f64, decimals: u32, price: f64) -> MarketTotals {
    let tvl_usd = to_usd(liquidity, decimals, price);
    let total_borrow_usd = to_usd(total_borrows, decimals, price);
    MarketTotals {
        tvl_usd,
        total_supply_usd: tvl_usd + total_borrow_usd,
        total_borrow_usd,
    }
}

/// Compound style: supply is `cash + borrows - reserves`, TVL is supply minus borrows.
pub fn cash_borrows_reserves_totals(
    cash: f64,
    total_borrows: f64,
    total_reserves: f64,
    decimals: u32,
    price: f64,
) -> MarketTotals {
    let total_supply_usd = to_usd(cash + total_borrows - total_reserves, decimals, price);
    let total_borrow_usd = to_usd(total_borrows, decimals, price);
    MarketTotals {
        tvl_usd: total_supply_usd - total_borrow_usd,
        total_supply_usd,
        total_borrow_usd,
    }
}

/// Legacy tokens encode `symbol()` as bytes32, which decodes to nothing.
pub const LEGACY_SYMBOL_OVERRIDE: &str = "MKR";

/// On-chain symbol, or the known override when it came back empty.
pub fn resolve_symbol(symbol: Option<String>) -> String {
    match symbol {
        Some(s) if !s.trim().is_empty() => s,
        _ => LEGACY_SYMBOL_OVERRIDE.to_string(),
    }
}

/// Final gate applied to every adaptor's output.
///
/// Drops records with a non-finite numeric field or an empty key, lowercases
/// keys and keeps only the first record for a given key. Dropped records are
/// never reported as errors, only logged.
pub fn finalize(project: &str, pools: Vec<YieldPool>) -> Vec<YieldPool> {
    let mut seen = HashSet::with_capacity(pools.len());
    let mut kept = Vec::with_capacity(pools.len());

    for mut pool in pools {
        if !pool.is_finite() {
            debug!(project, pool = %pool.pool, symbol = %pool.symbol, "dropping pool with non-finite values");
            metrics::increment_pools_dropped(project, "non_finite");
            continue;
        }
        pool.pool = pool.pool.trim().to_lowercase();
        if pool.pool.is_empty() {
            debug!(project, symbol = %pool.symbol, "dropping pool without a key");
            metrics::increment_pools_dropped(project, "empty_key");
            continue;
        }
        if !seen.insert(pool.pool.clone()) {
            debug!(project, pool = %pool.pool, "dropping duplicate pool key");
            metrics::increment_pools_dropped(project, "duplicate");
            continue;
        }
        kept.push(pool);
    }

    metrics::increment_pools_emitted(project, kept.len());
    kept
}
