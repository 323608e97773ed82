//! # MIG Yield SDK
//!
//! A Rust library that turns lending and liquidity protocols into uniform yield
//! pool records: TVL, base and reward APY, and borrow-side figures per market.
//!
//! ## Overview
//!
//! Each protocol adapter follows the same pipeline:
//!
//! - **Enumerate**: list the protocol's markets from its registry contract or API
//! - **Read**: batch contract state per market through Multicall3
//! - **Price**: join USD prices from the coins price service
//! - **Normalize**: convert fixed-point rates (ray, per-block mantissa) to APY
//! - **Assemble**: build records with protocol-specific TVL accounting, then
//!   pass them through a single final gate
//!
//! ## Architecture
//!
//! ### Data Access Layer
//! `StateReader` (batched contract reads with per-call success flags) and
//! `PriceOracle` (USD prices by `chain:address`) are the only I/O seams, so
//! adapters can be exercised against in-memory fakes.
//!
//! ### Normalization Layer
//! Rate models and token-unit scaling shared by every adapter.
//!
//! ### Adapter Layer
//! Ironclad Finance (Aave v2 fork on Mode and Base), Segment Finance (Compound
//! v2 fork on BOB) and ThalaSwap (Aptos, HTTP API).

// Core Types
/// Uniform pool record
pub mod pools;
/// Trait implemented by every protocol adapter
pub mod yield_adapter;
/// Common types and conversions
pub mod types;

// Protocol Adapters
/// Protocol-specific adapters (Ironclad, Segment, ThalaSwap)
pub mod adapters;
/// Runs the registered adapters
pub mod orchestrator;

// Data Access Layer
/// Chains and per-protocol contract deployments
pub mod chain_registry;
/// Smart contract ABIs (read-only)
pub mod contracts;
/// Multicall batch RPC utilities and the `StateReader` seam
pub mod multicall;
/// USD price lookups
pub mod price_feeds;
/// Run-scoped metadata caching
pub mod cache;

// Normalization & Assembly
/// Rate and fixed-point normalization
pub mod normalization;
/// TVL accounting models and the final record gate
pub mod pool_assembler;

// Infrastructure
/// Metrics and observability
pub mod metrics;
/// General utilities
pub mod utils;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use orchestrator::Orchestrator;
pub use pools::YieldPool;
pub use settings::Settings;
pub use yield_adapter::YieldAdapter;
