use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::chain_registry::Chain;
use crate::types::conversions::string_to_address;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Rpc {
    /// Chain name -> HTTP RPC URL
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MulticallSettings {
    #[serde(default = "default_multicall_address")]
    pub address: String,
    #[serde(default = "default_multicall_batch_size")]
    pub batch_size: usize,
}

fn default_multicall_address() -> String {
    // Multicall3, same address on every EVM chain it is deployed to
    "0xcA11bde05977b3631167028862bE2a173976CA11".to_string()
}
fn default_multicall_batch_size() -> usize {
    200
}

impl Default for MulticallSettings {
    fn default() -> Self {
        Self {
            address: default_multicall_address(),
            batch_size: default_multicall_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceApi {
    #[serde(default = "default_price_api_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_price_api_url() -> String {
    "https://coins.llama.fi".to_string()
}
fn default_http_timeout_seconds() -> u64 {
    30
}

impl Default for PriceApi {
    fn default() -> Self {
        Self {
            base_url: default_price_api_url(),
            timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Thala {
    #[serde(default = "default_thala_api_url")]
    pub api_base_url: String,
    /// Pools at or below this TVL are not reported
    #[serde(default = "default_thala_min_tvl_usd")]
    pub min_tvl_usd: f64,
    #[serde(default = "default_http_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_thala_api_url() -> String {
    "https://app.thala.fi".to_string()
}
fn default_thala_min_tvl_usd() -> f64 {
    10_000.0
}

impl Default for Thala {
    fn default() -> Self {
        Self {
            api_base_url: default_thala_api_url(),
            min_tvl_usd: default_thala_min_tvl_usd(),
            timeout_seconds: default_http_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Runner {
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,
}

fn default_projects() -> Vec<String> {
    vec![
        "ironclad-finance".to_string(),
        "segment-finance".to_string(),
        "thalaswap".to_string(),
    ]
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            projects: default_projects(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub multicall: MulticallSettings,
    #[serde(default)]
    pub price_api: PriceApi,
    #[serde(default)]
    pub thala: Thala,
    #[serde(default)]
    pub runner: Runner,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("No RPC endpoint configured for chain {0}")]
    MissingRpcEndpoint(Chain),
    #[error("Invalid multicall address: {0}")]
    InvalidMulticallAddress(String),
}

impl Settings {
    /// Loads `Config.toml` from the working directory, then applies env overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(File::with_name("Config.toml"))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(File::from(path.as_ref()))
    }

    fn load<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let s = Config::builder().add_source(source).build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// `YIELD_RPC_<CHAIN>` replaces one endpoint, `YIELD_PRICE_API_URL` the price service.
    pub fn apply_env_overrides(&mut self) {
        for chain in [Chain::Mode, Chain::Base, Chain::Bob] {
            let key = format!("YIELD_RPC_{}", chain.as_str().to_uppercase());
            if let Ok(url) = env::var(&key) {
                let url = url.trim();
                if !url.is_empty() {
                    self.rpc.endpoints.insert(chain.as_str().to_string(), url.to_string());
                }
            }
        }
        if let Ok(url) = env::var("YIELD_PRICE_API_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.price_api.base_url = url.to_string();
            }
        }
    }

    pub fn rpc_url(&self, chain: Chain) -> Result<&str, SettingsError> {
        self.rpc
            .endpoints
            .get(chain.as_str())
            .map(String::as_str)
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingRpcEndpoint(chain))
    }

    pub fn multicall_address(&self) -> Result<Address, SettingsError> {
        string_to_address(&self.multicall.address)
            .map_err(|e| SettingsError::InvalidMulticallAddress(e.to_string()))
    }

    pub fn project_enabled(&self, project: &str) -> bool {
        self.runner.projects.iter().any(|p| p == project)
    }
}
