//! # Chain Registry
//!
//! Static, compiled-in deployments for every protocol the SDK serves. Each
//! deployment is an ordered list of [`ChainConfig`] entries; adaptors iterate
//! that list as-is, so the output order of a run is stable.
//!
//! Address literals are parsed when a deployment is loaded. A malformed
//! literal or a missing contract role is a [`RegistryError`], raised before
//! any network I/O happens.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::types::conversions::string_to_address;

/// Chains the shipped adaptors run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Mode,
    Base,
    Bob,
    Aptos,
}

impl Chain {
    /// Identifier used by RPC configuration and the price service key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Mode => "mode",
            Chain::Base => "base",
            Chain::Bob => "bob",
            Chain::Aptos => "aptos",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Chain {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mode" => Ok(Chain::Mode),
            "base" => Ok(Chain::Base),
            "bob" => Ok(Chain::Bob),
            "aptos" => Ok(Chain::Aptos),
            other => Err(RegistryError::UnknownChain(other.to_string())),
        }
    }
}

/// Role a contract plays inside a protocol deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    LendingPool,
    ProtocolDataProvider,
    RewardsDataReader,
    Comptroller,
}

/// The chain's wrapped native token, used when a market has no ERC20 underlying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeToken {
    pub address: Address,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// One protocol deployment on one chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain: Chain,
    contracts: HashMap<ContractRole, Address>,
    pub native_token: Option<NativeToken>,
    /// Only set for protocols quoting per-block rates.
    pub blocks_per_day: Option<u64>,
    pub reward_tokens: Vec<Address>,
    /// Whether reward APR fields are published for this deployment.
    pub rewards_enabled: bool,
}

impl ChainConfig {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            contracts: HashMap::new(),
            native_token: None,
            blocks_per_day: None,
            reward_tokens: Vec::new(),
            rewards_enabled: false,
        }
    }

    pub fn with_contract(mut self, role: ContractRole, address: &str) -> Result<Self, RegistryError> {
        let parsed = string_to_address(address).map_err(|e| RegistryError::InvalidAddress {
            chain: self.chain,
            role,
            reason: e.to_string(),
        })?;
        self.contracts.insert(role, parsed);
        Ok(self)
    }

    pub fn with_native_token(mut self, address: &str, symbol: &'static str, decimals: u8) -> Result<Self, RegistryError> {
        let address = string_to_address(address).map_err(|e| RegistryError::InvalidNativeToken {
            chain: self.chain,
            reason: e.to_string(),
        })?;
        self.native_token = Some(NativeToken { address, symbol, decimals });
        Ok(self)
    }

    pub fn with_blocks_per_day(mut self, blocks_per_day: u64) -> Self {
        self.blocks_per_day = Some(blocks_per_day);
        self
    }

    pub fn with_reward_tokens(mut self, tokens: &[&str], enabled: bool) -> Result<Self, RegistryError> {
        for token in tokens {
            let parsed = string_to_address(token).map_err(|e| RegistryError::InvalidAddress {
                chain: self.chain,
                role: ContractRole::RewardsDataReader,
                reason: e.to_string(),
            })?;
            self.reward_tokens.push(parsed);
        }
        self.rewards_enabled = enabled;
        Ok(self)
    }

    /// Address of the contract playing `role`, or a configuration error.
    pub fn contract(&self, role: ContractRole) -> Result<Address, RegistryError> {
        self.contracts
            .get(&role)
            .copied()
            .ok_or(RegistryError::MissingContract { chain: self.chain, role })
    }

    pub fn native_token(&self) -> Result<&NativeToken, RegistryError> {
        self.native_token
            .as_ref()
            .ok_or(RegistryError::MissingNativeToken(self.chain))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown chain: {0}")]
    UnknownChain(String),
    #[error("No {role:?} contract registered on {chain}")]
    MissingContract { chain: Chain, role: ContractRole },
    #[error("Invalid {role:?} address on {chain}: {reason}")]
    InvalidAddress {
        chain: Chain,
        role: ContractRole,
        reason: String,
    },
    #[error("No native token registered on {0}")]
    MissingNativeToken(Chain),
    #[error("Invalid native token on {chain}: {reason}")]
    InvalidNativeToken { chain: Chain, reason: String },
}

// Ironclad shares one LendingPool / reader address across chains
const IRONCLAD_LENDING_POOL: &str = "0xB702cE183b4E1Faa574834715E5D4a6378D0eEd3";
const IRONCLAD_REWARDS_READER: &str = "0x78d5439da3201F44ce9A642DB95D798e9249952F";
const IRONCLAD_REWARD_TOKEN: &str = "0x3b6ea0fa8a487c90007ce120a83920fd52b06f6d";

/// Ironclad Finance deployments, in processing order.
pub fn ironclad_deployments() -> Result<Vec<ChainConfig>, RegistryError> {
    Ok(vec![
        ChainConfig::new(Chain::Mode)
            .with_contract(ContractRole::LendingPool, IRONCLAD_LENDING_POOL)?
            .with_contract(
                ContractRole::ProtocolDataProvider,
                "0x29563f73De731Ae555093deb795ba4D1E584e42E",
            )?
            .with_contract(ContractRole::RewardsDataReader, IRONCLAD_REWARDS_READER)?
            .with_reward_tokens(&[IRONCLAD_REWARD_TOKEN], false)?,
        ChainConfig::new(Chain::Base)
            .with_contract(ContractRole::LendingPool, IRONCLAD_LENDING_POOL)?
            .with_contract(
                ContractRole::ProtocolDataProvider,
                "0xed984A0E9c12Ee27602314191Fc4487A702bB83f",
            )?
            .with_contract(ContractRole::RewardsDataReader, IRONCLAD_REWARDS_READER)?
            .with_reward_tokens(&[IRONCLAD_REWARD_TOKEN], false)?,
    ])
}

/// Segment Finance deployment on BOB (2s blocks).
pub fn segment_deployment() -> Result<ChainConfig, RegistryError> {
    Ok(ChainConfig::new(Chain::Bob)
        .with_contract(
            ContractRole::Comptroller,
            "0xcD7C4F508652f33295F0aEd075936Cd95A4D2911",
        )?
        .with_native_token("0x4200000000000000000000000000000000000006", "WETH", 18)?
        .with_blocks_per_day(86_400 / 2))
}
