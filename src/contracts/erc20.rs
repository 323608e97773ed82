use ethers::abi::Function;

use super::{parse_contract_abi, resolve, AbiError};

const ERC20_ABI: &[&str] = &[
    "function balanceOf(address account) external view returns (uint256)",
    "function decimals() external view returns (uint8)",
    "function symbol() external view returns (string)",
    "function totalSupply() external view returns (uint256)",
];

#[derive(Debug, Clone)]
pub struct Erc20Methods {
    pub balance_of: Function,
    pub decimals: Function,
    pub symbol: Function,
    pub total_supply: Function,
}

impl Erc20Methods {
    pub fn load() -> Result<Self, AbiError> {
        let abi = parse_contract_abi("ERC20", ERC20_ABI)?;
        Ok(Self {
            balance_of: resolve(&abi, "ERC20", "balanceOf")?,
            decimals: resolve(&abi, "ERC20", "decimals")?,
            symbol: resolve(&abi, "ERC20", "symbol")?,
            total_supply: resolve(&abi, "ERC20", "totalSupply")?,
        })
    }
}
