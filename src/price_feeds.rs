// src/price_feeds.rs

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::chain_registry::Chain;
use crate::metrics;

/// Source of current USD unit prices.
///
/// Keys are `"{chain}:{address}"` strings. Implementations return only the
/// keys they could price; absent keys mean "unpriced", never zero.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn current_prices(&self, keys: &[String]) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Deserialize)]
struct DefiLlamaPriceResponse {
    coins: HashMap<String, DefiLlamaCoin>,
}

#[derive(Debug, Deserialize)]
struct DefiLlamaCoin {
    price: f64,
}

/// HTTP client for the coins price service (`/prices/current/{keys}`).
#[derive(Debug, Clone)]
pub struct LlamaPriceClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaPriceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceOracle for LlamaPriceClient {
    async fn current_prices(&self, keys: &[String]) -> Result<HashMap<String, f64>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        // The service is case-sensitive on input and inconsistent on output keys
        let param = keys
            .iter()
            .map(|k| k.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/prices/current/{}", self.base_url, param);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Price service HTTP error: {}", response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Price service response read failed: {}", e))?;
        let price_data: DefiLlamaPriceResponse = serde_json::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("Price service JSON parse failed: {}", e))?;

        Ok(price_data
            .coins
            .into_iter()
            .map(|(key, coin)| (key.to_lowercase(), coin.price))
            .collect())
    }
}

/// Prices for one chain, keyed by lowercase token address.
#[derive(Debug, Clone, Default)]
pub struct PriceMap {
    chain: Option<Chain>,
    prices: HashMap<String, f64>,
}

impl PriceMap {
    /// Fetches prices for `addresses` on `chain` through `oracle`.
    pub async fn fetch(oracle: &dyn PriceOracle, chain: Chain, addresses: &[String]) -> Result<Self> {
        let mut keys: Vec<String> = addresses
            .iter()
            .map(|a| format!("{}:{}", chain, a.to_lowercase()))
            .collect();
        keys.sort();
        keys.dedup();

        let raw = oracle.current_prices(&keys).await?;
        Ok(Self::from_keyed(chain, raw))
    }

    /// Builds a map from `"{chain}:{address}"` keyed prices, ignoring other chains.
    pub fn from_keyed(chain: Chain, raw: HashMap<String, f64>) -> Self {
        let prefix = chain.as_str();
        let prices = raw
            .into_iter()
            .filter_map(|(key, price)| {
                let key = key.to_lowercase();
                let (key_chain, address) = key.split_once(':')?;
                (key_chain == prefix).then(|| (address.to_string(), price))
            })
            .collect();
        Self { chain: Some(chain), prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Price for `address`, case-insensitive. `None` when unpriced.
    pub fn get(&self, address: &str) -> Option<f64> {
        self.prices.get(&address.to_lowercase()).copied()
    }

    /// Price for `address`, falling back on the symbol when unpriced:
    /// symbols containing "usd" are assumed pegged at 1.0, anything else is 0.
    pub fn price_or_symbol_fallback(&self, address: &str, symbol: &str) -> f64 {
        if let Some(price) = self.get(address) {
            return price;
        }
        let chain = self.chain.map(|c| c.as_str()).unwrap_or("unknown");
        metrics::increment_missing_price(chain);
        let fallback = symbol_fallback_price(symbol);
        debug!(chain, token = address, symbol, fallback, "no price from service");
        fallback
    }
}

/// Missing-price heuristic: 1.0 for symbols mentioning "usd", otherwise 0.
pub fn symbol_fallback_price(symbol: &str) -> f64 {
    if symbol.to_lowercase().contains("usd") {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x4200000000000000000000000000000000000006";

    fn priced_map() -> PriceMap {
        let mut raw = HashMap::new();
        raw.insert(format!("BOB:{}", TOKEN.to_uppercase().replace("0X", "0x")), 3_000.0);
        raw.insert(format!("mode:{}", TOKEN), 1.0);
        PriceMap::from_keyed(Chain::Bob, raw)
    }

    #[test]
    fn lookups_are_case_insensitive_and_chain_scoped() {
        let map = priced_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(TOKEN), Some(3_000.0));
        assert_eq!(map.get(&TOKEN.to_uppercase().replace("0X", "0x")), Some(3_000.0));
    }

    #[test]
    fn unpriced_usd_symbol_defaults_to_one() {
        let map = PriceMap::default();
        assert_eq!(map.price_or_symbol_fallback("0x1111111111111111111111111111111111111111", "USDT"), 1.0);
        assert_eq!(map.price_or_symbol_fallback("0x1111111111111111111111111111111111111111", "crvUSD"), 1.0);
    }

    #[test]
    fn unpriced_other_symbol_defaults_to_zero() {
        let map = PriceMap::default();
        assert_eq!(map.price_or_symbol_fallback("0x1111111111111111111111111111111111111111", "FOO"), 0.0);
    }

    #[test]
    fn known_price_wins_over_fallback() {
        let map = priced_map();
        assert_eq!(map.price_or_symbol_fallback(TOKEN, "USDX"), 3_000.0);
    }
}
