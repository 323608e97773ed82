// Aave v2 style lending pool surface used by the ray-rate adaptors.
//
// `getReserveData` returns a struct whose members are all static types, so its
// ABI encoding is identical to the flat return list declared here.

use ethers::abi::Function;

use super::{parse_contract_abi, resolve, AbiError};

const LENDING_POOL_ABI: &[&str] = &[
    "function getReservesList() external view returns (address[])",
    "function getReserveData(address asset) external view returns (uint256 configuration, uint128 liquidityIndex, uint128 variableBorrowIndex, uint128 currentLiquidityRate, uint128 currentVariableBorrowRate, uint128 currentStableBorrowRate, uint40 lastUpdateTimestamp, address aTokenAddress, address stableDebtTokenAddress, address variableDebtTokenAddress, address interestRateStrategyAddress, uint8 id)",
];

const PROTOCOL_DATA_PROVIDER_ABI: &[&str] = &[
    "function getReserveConfigurationData(address asset) external view returns (uint256 decimals, uint256 ltv, uint256 liquidationThreshold, uint256 liquidationBonus, uint256 reserveFactor, bool usageAsCollateralEnabled, bool borrowingEnabled, bool stableBorrowRateEnabled, bool isActive, bool isFrozen)",
];

const REWARDS_READER_ABI: &[&str] = &[
    "function getAssetRewardsAPR(address asset) external view returns (uint256 supplyRewardsAPR, uint256 borrowRewardsAPR)",
];

/// Output positions inside `getReserveData`.
pub mod reserve_data {
    pub const CURRENT_LIQUIDITY_RATE: usize = 3;
    pub const CURRENT_VARIABLE_BORROW_RATE: usize = 4;
    pub const A_TOKEN_ADDRESS: usize = 7;
    pub const VARIABLE_DEBT_TOKEN_ADDRESS: usize = 9;
}

/// Output positions inside `getReserveConfigurationData`.
pub mod reserve_configuration {
    pub const LTV: usize = 1;
    pub const BORROWING_ENABLED: usize = 6;
    pub const IS_ACTIVE: usize = 8;
    pub const IS_FROZEN: usize = 9;
}

#[derive(Debug, Clone)]
pub struct LendingPoolMethods {
    pub get_reserves_list: Function,
    pub get_reserve_data: Function,
}

impl LendingPoolMethods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("LendingPool", LENDING_POOL_ABI)?;
        Ok(Self {
            get_reserves_list: resolve(&abi, "LendingPool", "getReservesList")?,
            get_reserve_data: resolve(&abi, "LendingPool", "getReserveData")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolDataProviderMethods {
    pub get_reserve_configuration_data: Function,
}

impl ProtocolDataProviderMethods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("ProtocolDataProvider", PROTOCOL_DATA_PROVIDER_ABI)?;
        Ok(Self {
            get_reserve_configuration_data: resolve(
                &abi,
                "ProtocolDataProvider",
                "getReserveConfigurationData",
            )?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RewardsReaderMethods {
    pub get_asset_rewards_apr: Function,
}

impl RewardsReaderMethods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("SimplifiedProtocolDataReader", REWARDS_READER_ABI)?;
        Ok(Self {
            get_asset_rewards_apr: resolve(&abi, "SimplifiedProtocolDataReader", "getAssetRewardsAPR")?,
        })
    }
}
