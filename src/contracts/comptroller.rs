// Compound v2 / Venus style comptroller and market (cToken) surface.

use ethers::abi::Function;

use super::{parse_contract_abi, resolve, AbiError};

const COMPTROLLER_ABI: &[&str] = &[
    "function getAllMarkets() external view returns (address[])",
    "function markets(address market) external view returns (bool isListed, uint256 collateralFactorMantissa, bool isComped)",
    "function borrowCaps(address market) external view returns (uint256)",
    "function mintGuardianPaused(address market) external view returns (bool)",
];

const CTOKEN_ABI: &[&str] = &[
    "function supplyRatePerBlock() external view returns (uint256)",
    "function borrowRatePerBlock() external view returns (uint256)",
    "function getCash() external view returns (uint256)",
    "function totalBorrows() external view returns (uint256)",
    "function totalReserves() external view returns (uint256)",
    "function underlying() external view returns (address)",
];

/// Output position of the collateral factor inside `markets`.
pub const MARKET_COLLATERAL_FACTOR: usize = 1;

#[derive(Debug, Clone)]
pub struct ComptrollerMethods {
    pub get_all_markets: Function,
    pub markets: Function,
    pub borrow_caps: Function,
    pub mint_guardian_paused: Function,
}

impl ComptrollerMethods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("Comptroller", COMPTROLLER_ABI)?;
        Ok(Self {
            get_all_markets: resolve(&abi, "Comptroller", "getAllMarkets")?,
            markets: resolve(&abi, "Comptroller", "markets")?,
            borrow_caps: resolve(&abi, "Comptroller", "borrowCaps")?,
            mint_guardian_paused: resolve(&abi, "Comptroller", "mintGuardianPaused")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CTokenMethods {
    pub supply_rate_per_block: Function,
    pub borrow_rate_per_block: Function,
    pub get_cash: Function,
    pub total_borrows: Function,
    pub total_reserves: Function,
    pub underlying: Function,
}

impl CTokenMethods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("CToken", CTOKEN_ABI)?;
        Ok(Self {
            supply_rate_per_block: resolve(&abi, "CToken", "supplyRatePerBlock")?,
            borrow_rate_per_block: resolve(&abi, "CToken", "borrowRatePerBlock")?,
            get_cash: resolve(&abi, "CToken", "getCash")?,
            total_borrows: resolve(&abi, "CToken", "totalBorrows")?,
            total_reserves: resolve(&abi, "CToken", "totalReserves")?,
            underlying: resolve(&abi, "CToken", "underlying")?,
        })
    }
}
