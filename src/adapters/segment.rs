use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use tracing::{debug, info};
use std::sync::Arc;

use crate::chain_registry::{segment_deployment, Chain, ChainConfig, ContractRole};
use crate::contracts::comptroller::MARKET_COLLATERAL_FACTOR;
use crate::contracts::{CTokenMethods, ComptrollerMethods, Erc20Methods};
use crate::multicall::{CallOutcome, MethodCall, StateReader};
use crate::normalization::{fixed_point, scale, RateModel};
use crate::pool_assembler::{cash_borrows_reserves_totals, finalize};
use crate::pools::{BorrowFields, YieldPool};
use crate::price_feeds::{PriceMap, PriceOracle};
use crate::types::conversions::{
    address_to_string, token_address, token_address_array, token_bool, token_string, token_u8, token_uint,
    u256_to_f64,
};
use crate::utils::format_chain;
use crate::yield_adapter::YieldAdapter;

pub const PROJECT: &str = "segment-finance";
const MARKET_URL: &str = "https://app.segment.finance/#//market/";

fn first_uint(outcomes: &[CallOutcome], i: usize) -> Option<U256> {
    outcomes.get(i).and_then(CallOutcome::tokens).and_then(|t| token_uint(t, 0))
}

// A reverted slot reads as zero
fn amount(outcomes: &[CallOutcome], i: usize) -> f64 {
    first_uint(outcomes, i).map(u256_to_f64).unwrap_or(0.0)
}

fn uint_or_zero(outcomes: &[CallOutcome], i: usize) -> U256 {
    first_uint(outcomes, i).unwrap_or_default()
}

/// Segment Finance, a Venus / Compound v2 fork on BOB.
///
/// Rates are quoted per block and compounded daily. Markets whose minting is
/// paused by the guardian, or whose pause state is unknown, are published
/// without borrow-side fields.
pub struct SegmentAdapter {
    config: ChainConfig,
    reader: Arc<dyn StateReader>,
    oracle: Arc<dyn PriceOracle>,
    comptroller: ComptrollerMethods,
    ctoken: CTokenMethods,
    erc20: Erc20Methods,
}

impl SegmentAdapter {
    pub fn new(reader: Arc<dyn StateReader>, oracle: Arc<dyn PriceOracle>) -> Result<Self> {
        Self::with_config(segment_deployment()?, reader, oracle)
    }

    pub fn with_config(config: ChainConfig, reader: Arc<dyn StateReader>, oracle: Arc<dyn PriceOracle>) -> Result<Self> {
        Ok(Self {
            config,
            reader,
            oracle,
            comptroller: ComptrollerMethods::load()?,
            ctoken: CTokenMethods::load()?,
            erc20: Erc20Methods::load()?,
        })
    }

    pub fn chain(&self) -> Chain {
        self.config.chain
    }

    fn rate_model(&self) -> Result<RateModel> {
        let blocks_per_day = self
            .config
            .blocks_per_day
            .ok_or_else(|| anyhow!("No block rate registered for {}", self.config.chain))?;
        Ok(RateModel::PerBlockCompounded {
            blocks_per_day,
            decimals: scale::MANTISSA,
        })
    }

    async fn markets(&self) -> Result<Vec<YieldPool>> {
        let chain = self.config.chain;
        let comptroller = self.config.contract(ContractRole::Comptroller)?;
        let native = self.config.native_token()?.clone();
        let rate_model = self.rate_model()?;

        let listed = self
            .reader
            .call(chain, comptroller, &self.comptroller.get_all_markets, &[])
            .await?;
        let markets = token_address_array(&listed, 0)
            .ok_or_else(|| anyhow!("Malformed getAllMarkets response on {}", chain))?;
        if markets.is_empty() {
            info!("Comptroller lists no markets on {}", chain);
            return Ok(Vec::new());
        }

        let comptroller_calls: Vec<MethodCall> = markets
            .iter()
            .map(|m| MethodCall::new(comptroller, vec![Token::Address(*m)]))
            .collect();
        let market_calls: Vec<MethodCall> = markets.iter().map(|m| MethodCall::bare(*m)).collect();

        let reader = self.reader.as_ref();
        let (market_info, borrow_caps, paused, supply_rates, borrow_rates, cash, borrows, reserves, underlying) = tokio::try_join!(
            reader.multi_call(chain, &self.comptroller.markets, &comptroller_calls, true),
            reader.multi_call(chain, &self.comptroller.borrow_caps, &comptroller_calls, true),
            reader.multi_call(chain, &self.comptroller.mint_guardian_paused, &comptroller_calls, true),
            reader.multi_call(chain, &self.ctoken.supply_rate_per_block, &market_calls, true),
            reader.multi_call(chain, &self.ctoken.borrow_rate_per_block, &market_calls, true),
            reader.multi_call(chain, &self.ctoken.get_cash, &market_calls, true),
            reader.multi_call(chain, &self.ctoken.total_borrows, &market_calls, true),
            reader.multi_call(chain, &self.ctoken.total_reserves, &market_calls, true),
            reader.multi_call(chain, &self.ctoken.underlying, &market_calls, true),
        )?;

        // Native markets revert on underlying(); they are read as the wrapped native token
        let underlying: Vec<Option<Address>> = (0..markets.len())
            .map(|i| {
                underlying
                    .get(i)
                    .and_then(CallOutcome::tokens)
                    .and_then(|t| token_address(t, 0))
                    .filter(|a| !a.is_zero())
            })
            .collect();
        let token_calls: Vec<MethodCall> = underlying.iter().flatten().map(|a| MethodCall::bare(*a)).collect();

        let mut price_keys: Vec<String> = underlying.iter().flatten().map(|a| address_to_string(*a)).collect();
        price_keys.push(address_to_string(native.address));

        let (symbols, decimal_outcomes, prices) = tokio::try_join!(
            reader.multi_call(chain, &self.erc20.symbol, &token_calls, true),
            reader.multi_call(chain, &self.erc20.decimals, &token_calls, true),
            PriceMap::fetch(self.oracle.as_ref(), chain, &price_keys),
        )?;

        let mut pools = Vec::with_capacity(markets.len());
        let mut token_slot = 0;
        for (i, market) in markets.iter().enumerate() {
            let (token, symbol, token_decimals) = match underlying[i] {
                Some(address) => {
                    let slot = token_slot;
                    token_slot += 1;
                    let symbol = symbols
                        .get(slot)
                        .and_then(CallOutcome::tokens)
                        .and_then(|t| token_string(t, 0))
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| native.symbol.to_string());
                    let decimals = decimal_outcomes
                        .get(slot)
                        .and_then(CallOutcome::tokens)
                        .and_then(|t| token_u8(t, 0))
                        .filter(|d| *d > 0)
                        .unwrap_or(native.decimals);
                    (address, symbol, decimals)
                }
                None => (native.address, native.symbol.to_string(), native.decimals),
            };
            let token_key = address_to_string(token);
            let price = prices.price_or_symbol_fallback(&token_key, &symbol);

            let totals = cash_borrows_reserves_totals(
                amount(&cash, i),
                amount(&borrows, i),
                amount(&reserves, i),
                token_decimals as u32,
                price,
            );
            let apy_base = rate_model.apy(uint_or_zero(&supply_rates, i));

            let mut pool = YieldPool::new(
                address_to_string(*market),
                format_chain(chain.as_str()),
                PROJECT,
                symbol,
                totals.tvl_usd,
                apy_base,
            )
            .with_underlying(vec![token_key])
            .with_url(format!("{}{}", MARKET_URL, to_checksum(market, None)));
            pool.reward_tokens = Some(Vec::new());

            let is_paused = paused.get(i).and_then(CallOutcome::tokens).and_then(|t| token_bool(t, 0));
            if is_paused == Some(false) {
                let ltv = market_info
                    .get(i)
                    .and_then(CallOutcome::tokens)
                    .and_then(|t| token_uint(t, MARKET_COLLATERAL_FACTOR))
                    .map(|cf| fixed_point(cf, scale::MANTISSA));
                let debt_ceiling_usd = fixed_point(uint_or_zero(&borrow_caps, i), scale::MANTISSA) * price;
                pool = pool.with_borrow_fields(BorrowFields {
                    total_supply_usd: totals.total_supply_usd,
                    total_borrow_usd: totals.total_borrow_usd,
                    apy_base_borrow: rate_model.apy(uint_or_zero(&borrow_rates, i)),
                    ltv,
                    debt_ceiling_usd: Some(debt_ceiling_usd),
                });
            } else {
                debug!(chain = %chain, market = ?market, "mint paused or pause state unknown, omitting borrow fields");
            }
            pools.push(pool);
        }

        info!(project = PROJECT, chain = %chain, pools = pools.len(), "assembled pools");
        Ok(pools)
    }
}

#[async_trait]
impl YieldAdapter for SegmentAdapter {
    fn project(&self) -> &'static str {
        PROJECT
    }

    async fn apy(&self) -> Result<Vec<YieldPool>> {
        let pools = self.markets().await?;
        Ok(finalize(self.project(), pools))
    }
}
