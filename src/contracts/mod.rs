// Contracts Module - Public ABIs Only
//
// Human-readable ABIs are parsed once and resolved into typed method sets when
// an adaptor is built. A method name that is absent from its ABI is a
// configuration error, never a runtime lookup miss.

pub mod comptroller;
pub mod erc20;
pub mod lending_pool;

pub use comptroller::{ComptrollerMethods, CTokenMethods};
pub use erc20::Erc20Methods;
pub use lending_pool::{LendingPoolMethods, ProtocolDataProviderMethods, RewardsReaderMethods};

use ethers::abi::{Abi, Function};

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("Failed to parse {contract} ABI: {reason}")]
    Parse { contract: &'static str, reason: String },
    #[error("Method {method} is missing from the {contract} ABI")]
    MissingMethod {
        contract: &'static str,
        method: &'static str,
    },
}

/// Parses a human-readable ABI for `contract`.
pub(crate) fn parse_contract_abi(contract: &'static str, signatures: &[&str]) -> Result<Abi, AbiError> {
    ethers::abi::parse_abi(signatures).map_err(|e| AbiError::Parse {
        contract,
        reason: e.to_string(),
    })
}

/// Resolves one method descriptor out of a parsed ABI.
pub(crate) fn resolve(abi: &Abi, contract: &'static str, method: &'static str) -> Result<Function, AbiError> {
    abi.function(method)
        .cloned()
        .map_err(|_| AbiError::MissingMethod { contract, method })
}
