// src/normalization.rs
//
// Converts protocol-native fixed-point rate encodings into annualized
// percentages. Two models exist and they are not interchangeable:
//
// - Ray (Aave v2 style): `rate / 1e25`, a linear ray-to-percent scale.
// - Per-block compounded (Compound / Venus style): the per-block rate, scaled
//   1e18, is turned into a daily rate and compounded over 365 days.
//
// Every adaptor records which model applies to which raw field through
// `RateModel`; feeding a field to the wrong model yields a finite but wrong
// number and nothing downstream catches it.

use ethers::types::U256;

use crate::types::conversions::{u256_div_10_pow, u256_to_f64};

pub const DAYS_PER_YEAR: u32 = 365;

/// Ray = 1e27; dividing by 1e25 yields a percentage.
pub const RAY_TO_PERCENT_DIVISOR: f64 = 1e25;

/// Fixed-point scales used by the shipped adaptors.
pub mod scale {
    /// Aave style basis-point fields (LTV, liquidation threshold).
    pub const BPS: u32 = 4;
    /// Reward APR fields of the simplified data reader.
    pub const REWARD_APR: u32 = 8;
    /// Compound style mantissas (rates, collateral factors).
    pub const MANTISSA: u32 = 18;
}

/// How a protocol encodes an interest rate field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateModel {
    /// Per-second rate in ray units, converted linearly.
    Ray,
    /// Per-block rate scaled by `10^decimals`, compounded daily over a year.
    PerBlockCompounded { blocks_per_day: u64, decimals: u32 },
}

impl RateModel {
    /// Annualized percentage for a raw on-chain rate.
    pub fn apy(&self, raw: U256) -> f64 {
        match *self {
            RateModel::Ray => ray_to_apy(raw),
            RateModel::PerBlockCompounded { blocks_per_day, decimals } => {
                calculate_apy(u256_div_10_pow(raw, decimals), blocks_per_day)
            }
        }
    }
}

/// `((rate * blocks_per_day + 1) ^ 365 - 1) * 100`
pub fn calculate_apy(rate_per_block: f64, blocks_per_day: u64) -> f64 {
    let daily = rate_per_block * blocks_per_day as f64;
    ((daily + 1.0).powi(DAYS_PER_YEAR as i32) - 1.0) * 100.0
}

/// Linear ray-to-percent conversion, no compounding.
pub fn ray_to_apy(raw: U256) -> f64 {
    u256_to_f64(raw) / RAY_TO_PERCENT_DIVISOR
}

/// Raw fixed-point value divided by `10^decimals`.
pub fn fixed_point(raw: U256, decimals: u32) -> f64 {
    u256_div_10_pow(raw, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS_PER_DAY: u64 = 43_200;

    #[test]
    fn zero_rate_yields_zero_apy() {
        assert_eq!(calculate_apy(0.0, BLOCKS_PER_DAY), 0.0);
    }

    #[test]
    fn small_rate_matches_direct_substitution() {
        let r = 1e-8;
        let expected = ((r * 43_200.0 + 1.0_f64).powf(365.0) - 1.0) * 100.0;
        let apy = calculate_apy(r, BLOCKS_PER_DAY);
        assert!(apy > 0.0);
        assert!((apy - expected).abs() < 1e-9, "apy={} expected={}", apy, expected);
    }

    #[test]
    fn compounded_apy_is_monotonic_in_rate() {
        let rates = [-1e-6, -1e-9, 0.0, 1e-10, 1e-9, 5e-9, 1e-8, 1e-7];
        let apys: Vec<f64> = rates.iter().map(|r| calculate_apy(*r, BLOCKS_PER_DAY)).collect();
        for pair in apys.windows(2) {
            assert!(pair[0] < pair[1], "{:?}", apys);
        }
    }

    #[test]
    fn ray_rate_is_linear_percent() {
        let raw = U256::from(25u64) * U256::exp10(24);
        assert!((ray_to_apy(raw) - 2.5).abs() < 1e-12);
        assert!((RateModel::Ray.apy(raw) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn per_block_model_scales_before_compounding() {
        // 1e-8 per block encoded as a 1e18 mantissa
        let raw = U256::from(10_000_000_000u64);
        let model = RateModel::PerBlockCompounded {
            blocks_per_day: BLOCKS_PER_DAY,
            decimals: scale::MANTISSA,
        };
        let expected = calculate_apy(1e-8, BLOCKS_PER_DAY);
        assert!((model.apy(raw) - expected).abs() < 1e-9);
    }

    #[test]
    fn models_disagree_on_the_same_raw_value() {
        let raw = U256::exp10(16);
        let per_block = RateModel::PerBlockCompounded {
            blocks_per_day: BLOCKS_PER_DAY,
            decimals: scale::MANTISSA,
        };
        assert_ne!(RateModel::Ray.apy(raw), per_block.apy(raw));
    }

    #[test]
    fn fixed_point_scales() {
        assert!((fixed_point(U256::from(8_000u64), scale::BPS) - 0.8).abs() < 1e-12);
        assert!((fixed_point(U256::from(450_000_000u64), scale::REWARD_APR) - 4.5).abs() < 1e-12);
        let cf = U256::from(75u64) * U256::exp10(16);
        assert!((fixed_point(cf, scale::MANTISSA) - 0.75).abs() < 1e-12);
    }
}
