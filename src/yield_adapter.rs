//! # Yield Adapter Trait
//!
//! This module defines the core abstraction for integrating lending and
//! liquidity protocols into the MIG Yield SDK. Each protocol implements
//! [`YieldAdapter`] and turns its on-chain or API data into uniform
//! [`YieldPool`] records.
//!
//! ## Adding a New Protocol
//!
//! 1. Register its deployments in `chain_registry.rs` (EVM protocols)
//! 2. Add the ABI surface it reads to `contracts/`
//! 3. Implement `YieldAdapter`, reading through [`StateReader`] and pricing
//!    through [`PriceOracle`] rather than talking to providers directly
//! 4. Register the adapter with the `Orchestrator`
//!
//! ## Example
//!
//! ```rust,no_run
//! use mig_yield_sdk::yield_adapter::YieldAdapter;
//! use mig_yield_sdk::pools::YieldPool;
//! use async_trait::async_trait;
//!
//! struct MyLendingAdapter;
//!
//! #[async_trait]
//! impl YieldAdapter for MyLendingAdapter {
//!     fn project(&self) -> &'static str {
//!         "my-lending"
//!     }
//!
//!     async fn apy(&self) -> anyhow::Result<Vec<YieldPool>> {
//!         // enumerate markets, batch-read state, join prices, assemble
//!         let pools = Vec::new();
//!         Ok(mig_yield_sdk::pool_assembler::finalize(self.project(), pools))
//!     }
//! }
//! ```
//!
//! [`StateReader`]: crate::multicall::StateReader
//! [`PriceOracle`]: crate::price_feeds::PriceOracle

use anyhow::Result;
use async_trait::async_trait;

use crate::pools::YieldPool;

/// The main trait for all protocol adapters.
///
/// # Failure semantics
///
/// `apy()` is all-or-nothing: a transport failure that the adapter does not
/// explicitly absorb fails the whole invocation, across all of its chains.
/// Per-market problems (reverted calls, missing prices, bad numbers) never
/// surface as errors; the affected record is zeroed or left out instead.
///
/// # Thread Safety
///
/// Adapters must be `Send + Sync` so the orchestrator can run them concurrently.
#[async_trait]
pub trait YieldAdapter: Send + Sync {
    /// Project slug stamped on every record (e.g. `"segment-finance"`).
    fn project(&self) -> &'static str;

    /// Fetches and assembles the current pool records.
    ///
    /// Every returned record has passed `pool_assembler::finalize`: finite
    /// numbers only, unique lowercase keys.
    async fn apy(&self) -> Result<Vec<YieldPool>>;
}
