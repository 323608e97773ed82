use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::str::FromStr;

/// Lossy conversion of a raw on-chain integer into `f64`.
///
/// Goes through the decimal string so values above `u128::MAX` still land on the
/// nearest representable float instead of overflowing.
pub fn u256_to_f64(value: U256) -> f64 {
    if value.is_zero() {
        return 0.0;
    }
    value.to_string().parse::<f64>().unwrap_or(f64::NAN)
}

/// Divide a U256 by 10^decimals and return f64 without intermediate u128 casts.
pub fn u256_div_10_pow(value: U256, decimals: u32) -> f64 {
    if value.is_zero() {
        return 0.0;
    }
    let s = value.to_string();
    let len = s.len();
    let d = decimals as usize;
    let dec_str = if d == 0 {
        s
    } else if len <= d {
        let mut out = String::with_capacity(2 + d);
        out.push_str("0.");
        out.push_str(&"0".repeat(d - len));
        out.push_str(&s);
        out
    } else {
        let mut out = String::with_capacity(len + 1);
        out.push_str(&s[..len - d]);
        out.push('.');
        out.push_str(&s[len - d..]);
        out
    };
    dec_str.parse::<f64>().unwrap_or(f64::NAN)
}

// Lowercase 0x-prefixed hex, the key format used by the price service and pool ids
pub fn address_to_string(addr: Address) -> String {
    format!("{:?}", addr).to_lowercase()
}

pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s).map_err(|e| ConversionError::InvalidAddress(format!("{}: {}", s, e)))
}

pub fn token_uint(tokens: &[Token], index: usize) -> Option<U256> {
    tokens.get(index).cloned().and_then(Token::into_uint)
}

/// Small integers such as ERC20 `decimals()`; `None` when out of range.
pub fn token_u8(tokens: &[Token], index: usize) -> Option<u8> {
    token_uint(tokens, index).and_then(|u| u.try_into().ok())
}

pub fn token_address(tokens: &[Token], index: usize) -> Option<Address> {
    tokens.get(index).cloned().and_then(Token::into_address)
}

pub fn token_bool(tokens: &[Token], index: usize) -> Option<bool> {
    tokens.get(index).cloned().and_then(Token::into_bool)
}

pub fn token_string(tokens: &[Token], index: usize) -> Option<String> {
    tokens.get(index).cloned().and_then(Token::into_string)
}

pub fn token_address_array(tokens: &[Token], index: usize) -> Option<Vec<Address>> {
    tokens
        .get(index)
        .cloned()
        .and_then(Token::into_array)
        .map(|items| items.into_iter().filter_map(Token::into_address).collect())
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_token_decimals() {
        let raw = U256::from(1_500_000u64);
        assert!((u256_div_10_pow(raw, 6) - 1.5).abs() < 1e-12);

        let tiny = U256::from(5u64);
        assert!((u256_div_10_pow(tiny, 18) - 5e-18).abs() < 1e-30);
    }

    #[test]
    fn converts_values_beyond_u128() {
        let big = U256::exp10(40);
        assert!((u256_to_f64(big) / 1e40 - 1.0).abs() < 1e-12);
        assert_eq!(u256_to_f64(U256::zero()), 0.0);
    }

    #[test]
    fn addresses_render_lowercase() {
        let addr = string_to_address("0xB702cE183b4E1Faa574834715E5D4a6378D0eEd3").unwrap();
        assert_eq!(
            address_to_string(addr),
            "0xb702ce183b4e1faa574834715e5d4a6378d0eed3"
        );
        assert!(string_to_address("not-an-address").is_err());
    }

    #[test]
    fn token_accessors_tolerate_shape_mismatch() {
        let tokens = vec![Token::Uint(U256::from(7u64)), Token::Bool(true)];
        assert_eq!(token_uint(&tokens, 0), Some(U256::from(7u64)));
        assert_eq!(token_bool(&tokens, 1), Some(true));
        assert_eq!(token_uint(&tokens, 1), None);
        assert_eq!(token_u8(&tokens, 0), Some(7));
        assert_eq!(token_u8(&[Token::Uint(U256::from(300u64))], 0), None);
        assert_eq!(token_string(&tokens, 5), None);
    }
}
