//! Integration tests for the Segment Finance adapter
//!
//! Three markets on BOB: an unpriced USD stablecoin, the native market (no
//! `underlying()`) and a paused market whose token has no price.

mod common;

use common::{addr, approx, scaled, uint, MockReader, Reply, StaticPriceOracle};
use ethers::abi::Token;
use ethers::types::Address;
use ethers::utils::to_checksum;
use mig_yield_sdk::adapters::segment::{SegmentAdapter, PROJECT};
use mig_yield_sdk::chain_registry::{segment_deployment, Chain, ContractRole};
use mig_yield_sdk::normalization::calculate_apy;
use mig_yield_sdk::yield_adapter::YieldAdapter;
use std::sync::Arc;

const USDT_MARKET: u8 = 0xa1;
const ETH_MARKET: u8 = 0xa2;
const FOO_MARKET: u8 = 0xa3;
const USDT: u8 = 0xb1;
const FOO: u8 = 0xb3;

fn comptroller() -> Address {
    segment_deployment()
        .expect("registry")
        .contract(ContractRole::Comptroller)
        .unwrap()
}

fn weth() -> Address {
    segment_deployment().expect("registry").native_token().unwrap().address
}

#[allow(clippy::too_many_arguments)]
fn market(
    reader: MockReader,
    market: u8,
    paused: Option<bool>,
    collateral_factor: Token,
    borrow_cap: Token,
    rates: (u64, u64),
    cash: Token,
    borrows: Token,
    reserves: Token,
) -> MockReader {
    let chain = Chain::Bob;
    let m = addr(market);
    let mut reader = reader
        .on(chain, "markets", comptroller(), Some(m), vec![Token::Bool(true), collateral_factor, Token::Bool(false)])
        .on(chain, "borrowCaps", comptroller(), Some(m), vec![borrow_cap])
        .on(chain, "supplyRatePerBlock", m, None, vec![uint(rates.0)])
        .on(chain, "borrowRatePerBlock", m, None, vec![uint(rates.1)])
        .on(chain, "getCash", m, None, vec![cash])
        .on(chain, "totalBorrows", m, None, vec![borrows])
        .on(chain, "totalReserves", m, None, vec![reserves]);
    if let Some(paused) = paused {
        reader = reader.on(chain, "mintGuardianPaused", comptroller(), Some(m), vec![Token::Bool(paused)]);
    }
    reader
}

fn bob_chain() -> MockReader {
    let chain = Chain::Bob;
    let markets = [USDT_MARKET, ETH_MARKET, FOO_MARKET]
        .iter()
        .map(|m| Token::Address(addr(*m)))
        .collect();

    let mut reader = MockReader::new().on(chain, "getAllMarkets", comptroller(), None, vec![Token::Array(markets)]);
    reader = market(
        reader,
        USDT_MARKET,
        Some(false),
        scaled(8, 17),
        scaled(500_000, 18),
        (1_000_000_000, 2_000_000_000),
        scaled(900_000, 6),
        scaled(100_000, 6),
        uint(0),
    );
    reader = market(
        reader,
        ETH_MARKET,
        Some(false),
        scaled(75, 16),
        uint(0),
        (0, 0),
        scaled(10, 18),
        uint(0),
        uint(0),
    );
    reader = market(
        reader,
        FOO_MARKET,
        Some(true),
        scaled(5, 17),
        uint(0),
        (0, 0),
        scaled(1_000, 18),
        uint(0),
        uint(0),
    );

    reader
        .on(chain, "underlying", addr(USDT_MARKET), None, vec![Token::Address(addr(USDT))])
        .on(chain, "underlying", addr(FOO_MARKET), None, vec![Token::Address(addr(FOO))])
        .on(chain, "symbol", addr(USDT), None, vec![Token::String("USDT".into())])
        .on(chain, "decimals", addr(USDT), None, vec![uint(6)])
        .on(chain, "symbol", addr(FOO), None, vec![Token::String("FOO".into())])
        .on(chain, "decimals", addr(FOO), None, vec![uint(18)])
}

fn prices() -> StaticPriceOracle {
    StaticPriceOracle::new().with_price(Chain::Bob, weth(), 3_000.0)
}

#[tokio::test]
async fn test_compound_accounting_and_fallback_prices() {
    let adapter = SegmentAdapter::new(Arc::new(bob_chain()), Arc::new(prices())).expect("adapter");
    let pools = adapter.apy().await.expect("apy");
    assert_eq!(pools.len(), 3);

    let usdt = &pools[0];
    assert_eq!(usdt.pool, format!("{:?}", addr(USDT_MARKET)));
    assert_eq!(usdt.chain, "Bob");
    assert_eq!(usdt.project, PROJECT);
    assert_eq!(usdt.symbol, "USDT");
    assert_eq!(usdt.underlying_tokens, vec![format!("{:?}", addr(USDT))]);
    assert_eq!(
        usdt.url,
        format!("https://app.segment.finance/#//market/{}", to_checksum(&addr(USDT_MARKET), None))
    );
    assert_eq!(usdt.reward_tokens, Some(Vec::new()));
    // Unpriced "USD" symbol is assumed pegged
    assert!(approx(usdt.total_supply_usd.unwrap(), 1_000_000.0));
    assert!(approx(usdt.total_borrow_usd.unwrap(), 100_000.0));
    assert!(approx(usdt.tvl_usd, 900_000.0));
    assert!(approx(usdt.apy_base, calculate_apy(1e-9, 43_200)));
    assert!(approx(usdt.apy_base_borrow.unwrap(), calculate_apy(2e-9, 43_200)));
    assert!(approx(usdt.ltv.unwrap(), 0.8));
    assert!(approx(usdt.debt_ceiling_usd.unwrap(), 500_000.0));
}

#[tokio::test]
async fn test_native_market_uses_wrapped_token() {
    let adapter = SegmentAdapter::new(Arc::new(bob_chain()), Arc::new(prices())).expect("adapter");
    let pools = adapter.apy().await.expect("apy");

    let eth = &pools[1];
    assert_eq!(eth.symbol, "WETH");
    assert_eq!(eth.underlying_tokens, vec![format!("{:?}", weth())]);
    assert!(approx(eth.tvl_usd, 30_000.0));
    assert_eq!(eth.apy_base, 0.0);
    assert!(approx(eth.ltv.unwrap(), 0.75));
}

#[tokio::test]
async fn test_paused_market_has_no_borrow_fields() {
    let adapter = SegmentAdapter::new(Arc::new(bob_chain()), Arc::new(prices())).expect("adapter");
    let pools = adapter.apy().await.expect("apy");

    let foo = &pools[2];
    assert_eq!(foo.symbol, "FOO");
    // Unpriced, non-USD symbol prices at zero and is still published
    assert_eq!(foo.tvl_usd, 0.0);
    assert!(!foo.has_borrow_fields());

    let json = serde_json::to_value(foo).unwrap();
    for key in ["totalSupplyUsd", "totalBorrowUsd", "apyBaseBorrow", "ltv", "debtCeilingUsd"] {
        assert!(json.get(key).is_none(), "{} must be absent", key);
    }
    assert_eq!(json["rewardTokens"], serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_pause_state_omits_borrow_fields() {
    let reader = bob_chain().reply(
        Chain::Bob,
        "mintGuardianPaused",
        comptroller(),
        Some(addr(USDT_MARKET)),
        Reply::Revert,
    );
    let adapter = SegmentAdapter::new(Arc::new(reader), Arc::new(prices())).expect("adapter");
    let pools = adapter.apy().await.expect("apy");

    assert!(!pools[0].has_borrow_fields());
    assert!(pools[1].has_borrow_fields());
}

#[tokio::test]
async fn test_reverted_market_reads_count_as_zero() {
    let chain = Chain::Bob;
    let reader = bob_chain()
        .reply(chain, "getCash", addr(USDT_MARKET), None, Reply::Revert)
        .reply(chain, "borrowCaps", comptroller(), Some(addr(USDT_MARKET)), Reply::Revert)
        .reply(chain, "supplyRatePerBlock", addr(ETH_MARKET), None, Reply::Revert);
    let adapter = SegmentAdapter::new(Arc::new(reader), Arc::new(prices())).expect("adapter");
    let pools = adapter.apy().await.expect("apy");
    assert_eq!(pools.len(), 3, "reverted slots must not drop markets");

    // USDT lost its cash: supply is borrows only, nothing left to lend
    let usdt = &pools[0];
    assert!(approx(usdt.total_supply_usd.unwrap(), 100_000.0));
    assert!(approx(usdt.total_borrow_usd.unwrap(), 100_000.0));
    assert!(approx(usdt.tvl_usd, 0.0));
    assert_eq!(usdt.debt_ceiling_usd, Some(0.0));
    assert!(approx(usdt.apy_base, calculate_apy(1e-9, 43_200)));

    let eth = &pools[1];
    assert_eq!(eth.apy_base, 0.0);
    assert!(approx(eth.tvl_usd, 30_000.0));

    let foo = &pools[2];
    assert_eq!(foo.symbol, "FOO");
    assert!(!foo.has_borrow_fields());
}

#[tokio::test]
async fn test_market_listing_failure_fails_the_run() {
    let reader = MockReader::new();
    let adapter = SegmentAdapter::new(Arc::new(reader), Arc::new(prices())).expect("adapter");
    assert!(adapter.apy().await.is_err());
}
