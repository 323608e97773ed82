use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use std::sync::Arc;

use crate::chain_registry::{ironclad_deployments, Chain, ChainConfig, ContractRole};
use crate::contracts::lending_pool::{reserve_configuration, reserve_data};
use crate::contracts::{Erc20Methods, LendingPoolMethods, ProtocolDataProviderMethods, RewardsReaderMethods};
use crate::metrics;
use crate::multicall::{CallOutcome, MethodCall, StateReader};
use crate::normalization::{fixed_point, scale, RateModel};
use crate::pool_assembler::{available_liquidity_totals, finalize, resolve_symbol};
use crate::pools::{BorrowFields, YieldPool};
use crate::price_feeds::{PriceMap, PriceOracle};
use crate::types::conversions::{
    address_to_string, token_address, token_address_array, token_bool, token_string, token_u8, token_uint,
    u256_to_f64,
};
use crate::utils::format_chain;
use crate::yield_adapter::YieldAdapter;

pub const PROJECT: &str = "ironclad-finance";
const APP_URL: &str = "https://app.ironclad.finance/markets";

/// Reward APRs of one reserve, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewardApr {
    pub apy_reward: f64,
    pub apy_reward_borrow: f64,
}

/// Turns `getAssetRewardsAPR` outcomes into per-reserve reward APRs.
///
/// A slot only counts when it succeeded with exactly two values; anything else
/// is logged and contributes zero rewards. The result is aligned with `reserves`.
pub fn process_rewards(chain: Chain, reserves: &[Address], outcomes: &[CallOutcome]) -> Vec<RewardApr> {
    reserves
        .iter()
        .enumerate()
        .map(|(i, reserve)| {
            let parsed = outcomes
                .get(i)
                .filter(|o| o.success)
                .and_then(CallOutcome::tokens)
                .filter(|tokens| tokens.len() == 2)
                .and_then(|tokens| Some((token_uint(tokens, 0)?, token_uint(tokens, 1)?)));

            match parsed {
                Some((supply, borrow)) => RewardApr {
                    apy_reward: fixed_point(supply, scale::REWARD_APR),
                    apy_reward_borrow: fixed_point(borrow, scale::REWARD_APR),
                },
                None => {
                    warn!(chain = %chain, reserve = ?reserve, "failed to get rewards data");
                    RewardApr::default()
                }
            }
        })
        .collect()
}

/// Fields of `getReserveData` the adapter needs.
#[derive(Debug, Clone, Copy)]
struct ReserveState {
    liquidity_rate: U256,
    variable_borrow_rate: U256,
    a_token: Address,
    variable_debt_token: Address,
}

impl ReserveState {
    fn from_outcome(reserve: Address, outcome: &CallOutcome) -> Result<Self> {
        let tokens = outcome
            .tokens()
            .ok_or_else(|| anyhow!("Undecodable getReserveData for reserve {:?}", reserve))?;
        let field = |name: &str, value: Option<U256>| value.ok_or_else(|| anyhow!("getReserveData.{} missing for {:?}", name, reserve));
        Ok(Self {
            liquidity_rate: field("currentLiquidityRate", token_uint(tokens, reserve_data::CURRENT_LIQUIDITY_RATE))?,
            variable_borrow_rate: field(
                "currentVariableBorrowRate",
                token_uint(tokens, reserve_data::CURRENT_VARIABLE_BORROW_RATE),
            )?,
            a_token: token_address(tokens, reserve_data::A_TOKEN_ADDRESS)
                .ok_or_else(|| anyhow!("getReserveData.aTokenAddress missing for {:?}", reserve))?,
            variable_debt_token: token_address(tokens, reserve_data::VARIABLE_DEBT_TOKEN_ADDRESS)
                .ok_or_else(|| anyhow!("getReserveData.variableDebtTokenAddress missing for {:?}", reserve))?,
        })
    }
}

/// Ironclad Finance, an Aave v2 fork on Mode and Base.
///
/// Rates are ray-encoded; TVL is the liquidity held by each aToken.
pub struct IroncladAdapter {
    chains: Vec<ChainConfig>,
    reader: Arc<dyn StateReader>,
    oracle: Arc<dyn PriceOracle>,
    lending_pool: LendingPoolMethods,
    data_provider: ProtocolDataProviderMethods,
    rewards_reader: RewardsReaderMethods,
    erc20: Erc20Methods,
}

impl IroncladAdapter {
    /// Adapter over the registered Ironclad deployments.
    pub fn new(reader: Arc<dyn StateReader>, oracle: Arc<dyn PriceOracle>) -> Result<Self> {
        Self::with_chains(ironclad_deployments()?, reader, oracle)
    }

    pub fn with_chains(chains: Vec<ChainConfig>, reader: Arc<dyn StateReader>, oracle: Arc<dyn PriceOracle>) -> Result<Self> {
        Ok(Self {
            chains,
            reader,
            oracle,
            lending_pool: LendingPoolMethods::load()?,
            data_provider: ProtocolDataProviderMethods::load()?,
            rewards_reader: RewardsReaderMethods::load()?,
            erc20: Erc20Methods::load()?,
        })
    }

    pub fn chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.chains.iter().map(|c| c.chain)
    }

    async fn chain_pools(&self, config: &ChainConfig) -> Result<Vec<YieldPool>> {
        let chain = config.chain;
        let lending_pool = config.contract(ContractRole::LendingPool)?;
        let data_provider = config.contract(ContractRole::ProtocolDataProvider)?;
        let rewards_reader = config.contract(ContractRole::RewardsDataReader)?;

        let list = self
            .reader
            .call(chain, lending_pool, &self.lending_pool.get_reserves_list, &[])
            .await?;
        let reserves = token_address_array(&list, 0)
            .ok_or_else(|| anyhow!("Malformed getReservesList response on {}", chain))?;
        if reserves.is_empty() {
            info!("No reserves listed on {}", chain);
            return Ok(Vec::new());
        }
        debug!("{} reserves listed on {}", reserves.len(), chain);

        let per_reserve = |target: Address| -> Vec<MethodCall> {
            reserves
                .iter()
                .map(|r| MethodCall::new(target, vec![Token::Address(*r)]))
                .collect()
        };

        // Reward reads are allowed to fail wholesale, e.g. on overflow reverts
        let reward_outcomes = match self
            .reader
            .multi_call(chain, &self.rewards_reader.get_asset_rewards_apr, &per_reserve(rewards_reader), true)
            .await
        {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(chain = %chain, error = %e, "rewards batch failed, substituting zero rewards");
                CallOutcome::all_failed(reserves.len())
            }
        };
        let rewards = process_rewards(chain, &reserves, &reward_outcomes);

        let reserve_outcomes = self
            .reader
            .multi_call(chain, &self.lending_pool.get_reserve_data, &per_reserve(lending_pool), false)
            .await?;
        let states = reserves
            .iter()
            .zip(&reserve_outcomes)
            .map(|(reserve, outcome)| ReserveState::from_outcome(*reserve, outcome))
            .collect::<Result<Vec<_>>>()?;
        if states.len() != reserves.len() {
            return Err(anyhow!(
                "getReserveData returned {} results for {} reserves on {}",
                states.len(),
                reserves.len(),
                chain
            ));
        }

        let balance_calls: Vec<MethodCall> = reserves
            .iter()
            .zip(&states)
            .map(|(reserve, state)| MethodCall::new(*reserve, vec![Token::Address(state.a_token)]))
            .collect();
        let token_calls: Vec<MethodCall> = reserves.iter().map(|r| MethodCall::bare(*r)).collect();
        let debt_calls: Vec<MethodCall> = states.iter().map(|s| MethodCall::bare(s.variable_debt_token)).collect();
        let config_calls = per_reserve(data_provider);

        let keys: Vec<String> = reserves.iter().map(|r| address_to_string(*r)).collect();
        let (liquidity, decimal_outcomes, symbols, total_borrows, configurations, prices) = tokio::try_join!(
            self.reader.multi_call(chain, &self.erc20.balance_of, &balance_calls, false),
            self.reader.multi_call(chain, &self.erc20.decimals, &token_calls, false),
            self.reader.multi_call(chain, &self.erc20.symbol, &token_calls, false),
            self.reader.multi_call(chain, &self.erc20.total_supply, &debt_calls, false),
            self.reader
                .multi_call(chain, &self.data_provider.get_reserve_configuration_data, &config_calls, false),
            PriceMap::fetch(self.oracle.as_ref(), chain, &keys),
        )?;

        let mut pools = Vec::with_capacity(reserves.len());
        for (i, reserve) in reserves.iter().enumerate() {
            let Some(configuration) = configurations.get(i).and_then(CallOutcome::tokens) else {
                debug!(chain = %chain, reserve = ?reserve, "no reserve configuration");
                continue;
            };
            if !token_bool(configuration, reserve_configuration::IS_ACTIVE).unwrap_or(false) {
                debug!(chain = %chain, reserve = ?reserve, "skipping inactive reserve");
                continue;
            }
            let Some(decimals) = decimal_outcomes.get(i).and_then(CallOutcome::tokens).and_then(|t| token_u8(t, 0)) else {
                debug!(chain = %chain, reserve = ?reserve, "no decimals for reserve");
                continue;
            };

            let state = &states[i];
            let symbol = resolve_symbol(symbols.get(i).and_then(CallOutcome::tokens).and_then(|t| token_string(t, 0)));
            let amount = |outcomes: &[CallOutcome]| {
                outcomes
                    .get(i)
                    .and_then(CallOutcome::tokens)
                    .and_then(|t| token_uint(t, 0))
                    .map(u256_to_f64)
                    .unwrap_or(f64::NAN)
            };
            // Unpriced reserves turn non-finite and are dropped by finalize
            let price = match prices.get(&keys[i]) {
                Some(price) => price,
                None => {
                    debug!(chain = %chain, reserve = ?reserve, "no price for reserve");
                    metrics::increment_missing_price(chain.as_str());
                    f64::NAN
                }
            };
            let totals = available_liquidity_totals(amount(&liquidity), amount(&total_borrows), decimals as u32, price);

            let ltv = token_uint(configuration, reserve_configuration::LTV).map(|raw| fixed_point(raw, scale::BPS));
            let frozen = token_bool(configuration, reserve_configuration::IS_FROZEN).unwrap_or(false);
            let reward = rewards[i];
            debug!(
                chain = %chain,
                symbol = %symbol,
                apy_reward = reward.apy_reward,
                apy_reward_borrow = reward.apy_reward_borrow,
                "parsed reward data"
            );

            let mut pool = YieldPool::new(
                format!("{}-{}", address_to_string(state.a_token), chain),
                format_chain(chain.as_str()),
                PROJECT,
                symbol.clone(),
                totals.tvl_usd,
                RateModel::Ray.apy(state.liquidity_rate),
            )
            .with_underlying(vec![keys[i].clone()])
            .with_url(format!("{}/{}", APP_URL, symbol.to_lowercase()))
            .with_borrow_fields(BorrowFields {
                total_supply_usd: totals.total_supply_usd,
                total_borrow_usd: totals.total_borrow_usd,
                apy_base_borrow: RateModel::Ray.apy(state.variable_borrow_rate),
                ltv,
                debt_ceiling_usd: None,
            });
            pool.borrowable = token_bool(configuration, reserve_configuration::BORROWING_ENABLED);
            pool.pool_meta = frozen.then(|| "frozen".to_string());
            if config.rewards_enabled {
                pool.apy_reward = Some(reward.apy_reward);
                pool.apy_reward_borrow = Some(reward.apy_reward_borrow);
                pool.reward_tokens = Some(config.reward_tokens.iter().map(|t| address_to_string(*t)).collect());
            }
            pools.push(pool);
        }

        info!(project = PROJECT, chain = %chain, pools = pools.len(), "assembled pools");
        Ok(pools)
    }
}

#[async_trait]
impl YieldAdapter for IroncladAdapter {
    fn project(&self) -> &'static str {
        PROJECT
    }

    async fn apy(&self) -> Result<Vec<YieldPool>> {
        let per_chain = try_join_all(self.chains.iter().map(|config| self.chain_pools(config))).await?;
        let pools = per_chain.into_iter().flatten().collect();
        Ok(finalize(self.project(), pools))
    }
}
