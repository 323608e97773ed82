// ThalaSwap v1 pools on Aptos, read from the Thala dapp API rather than chain
// resources (too many pools to walk on-chain).

use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::CoinInfoCache;
use crate::chain_registry::Chain;
use crate::pool_assembler::finalize;
use crate::pools::YieldPool;
use crate::settings;
use crate::utils::format_chain;
use crate::yield_adapter::YieldAdapter;

pub const PROJECT: &str = "thalaswap";

const THALASWAP_ADDRESS: &str = "0x48271d39d0b05bd6efca2278f22277d6fcc375504f9839fd73f74ace240861af";
const THL_COIN: &str = "0x7fd500c11216f0fe3095d0c4b8aa4d64a4e2e04f83758462f2b127255643615::thl_coin::THL";
const THAPT_COIN: &str = "0xfaf4e633ae9eb31366c9ca24214231760926576c7b625313b3688b5e900731f6::staking::ThalaAPT";

const SWAP_FEES_SOURCE: &str = "Swap Fees";
const THL_SOURCE: &str = "THL";
const THAPT_SOURCE: &str = "thAPT";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

// The API sends `null` for unknown values; read them like absent keys
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiquidityPool {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tvl: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub apr: Vec<AprSource>,
    pub metadata: PoolMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AprSource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub apr: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMetadata {
    pub is_v2: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub coin_addresses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pool_type: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub pool_type_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinInfo {
    pub symbol: String,
}

impl LiquidityPool {
    /// APR reported for `source`, as a fraction.
    fn apr(&self, source: &str) -> Option<f64> {
        self.apr.iter().find(|a| a.source == source).map(|a| a.apr)
    }

    fn is_v1(&self) -> bool {
        self.metadata.is_v2 == Some(false)
    }
}

/// Move type prefix identifying the pool kind.
pub fn pool_type_prefix(pool_type: &str) -> String {
    match pool_type {
        "Stable" => format!("{}::stable_pool::StablePool<", THALASWAP_ADDRESS),
        _ => format!("{}::weighted_pool::WeightedPool<", THALASWAP_ADDRESS),
    }
}

/// Builds the record for one pool once its coin symbols are known.
pub fn build_pool(api_base_url: &str, pool: &LiquidityPool, symbols: &[String]) -> YieldPool {
    let thl = pool.apr(THL_SOURCE).unwrap_or(0.0);
    let thapt = pool.apr(THAPT_SOURCE).unwrap_or(0.0);

    let mut reward_tokens = Vec::new();
    if thl > 0.0 {
        reward_tokens.push(THL_COIN.to_string());
    }
    if thapt > 0.0 {
        reward_tokens.push(THAPT_COIN.to_string());
    }

    let coin_names = symbols.join("-");
    let mut record = YieldPool::new(
        format!("{}{}>", pool_type_prefix(&pool.metadata.pool_type), coin_names),
        format_chain(Chain::Aptos.as_str()),
        PROJECT,
        coin_names,
        pool.tvl,
        pool.apr(SWAP_FEES_SOURCE).unwrap_or(0.0) * 100.0,
    )
    .with_underlying(pool.metadata.coin_addresses.clone())
    .with_url(format!("{}/pools/{}", api_base_url, pool.metadata.pool_type_tag));
    record.apy_reward = Some((thl + thapt) * 100.0);
    record.reward_tokens = Some(reward_tokens);
    record
}

pub struct ThalaswapAdapter {
    client: reqwest::Client,
    api_base_url: String,
    min_tvl_usd: f64,
}

impl ThalaswapAdapter {
    pub fn new(settings: &settings::Thala) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, &settings.api_base_url, settings.min_tvl_usd))
    }

    pub fn with_client(client: reqwest::Client, api_base_url: &str, min_tvl_usd: f64) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            min_tvl_usd,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope<T>> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Thala API HTTP error for {}: {}", path, response.status()));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| anyhow::anyhow!("Thala API JSON parse failed for {}: {}", path, e))
    }

    pub async fn liquidity_pools(&self) -> Result<Vec<LiquidityPool>> {
        let envelope: Envelope<Vec<LiquidityPool>> = self.get_json("/api/liquidity-pools", &[]).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn coin_info(&self, cache: &CoinInfoCache<CoinInfo>, coin: &str) -> Result<Option<CoinInfo>> {
        cache
            .get_or_fetch(coin, move || async move {
                let envelope: Envelope<CoinInfo> = self.get_json("/api/coin-info", &[("coin", coin)]).await?;
                Ok::<_, anyhow::Error>(envelope.data)
            })
            .await
    }
}

#[async_trait]
impl YieldAdapter for ThalaswapAdapter {
    fn project(&self) -> &'static str {
        PROJECT
    }

    async fn apy(&self) -> Result<Vec<YieldPool>> {
        let listed = self.liquidity_pools().await?;
        if listed.is_empty() {
            info!(project = PROJECT, "Thala API returned no liquidity pools");
            return Ok(Vec::new());
        }

        let eligible: Vec<&LiquidityPool> = listed
            .iter()
            .filter(|p| p.tvl > self.min_tvl_usd && p.is_v1())
            .collect();
        debug!(project = PROJECT, eligible = eligible.len(), listed = listed.len(), "filtered Thala pools");

        let cache = CoinInfoCache::new();
        let mut pools = Vec::with_capacity(eligible.len());
        for pool in eligible {
            let infos = try_join_all(
                pool.metadata
                    .coin_addresses
                    .iter()
                    .map(|coin| self.coin_info(&cache, coin)),
            )
            .await?;

            let symbols: Option<Vec<String>> = infos.into_iter().map(|info| info.map(|i| i.symbol)).collect();
            match symbols {
                Some(symbols) => pools.push(build_pool(&self.api_base_url, pool, &symbols)),
                None => warn!(
                    project = PROJECT,
                    pool = %pool.metadata.pool_type_tag,
                    "skipping pool, coin info unavailable"
                ),
            }
        }

        info!(project = PROJECT, chain = %Chain::Aptos, pools = pools.len(), coins_cached = cache.len(), "assembled pools");
        Ok(finalize(self.project(), pools))
    }
}
