// src/utils.rs
// Utility functions for MIG Yield SDK

/// Display name of a chain as published in pool records.
///
/// A handful of chains use a name that is not simply the capitalized id.
pub fn format_chain(chain: &str) -> String {
    let lower = chain.trim().to_lowercase();
    match lower.as_str() {
        "bsc" | "binance" => "Binance".to_string(),
        "avax" | "avalanche" => "Avalanche".to_string(),
        "xdai" | "gnosis" => "xDai".to_string(),
        "zksync" | "zksync era" => "zkSync Era".to_string(),
        "polygon_zkevm" => "Polygon zkEVM".to_string(),
        _ => {
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::format_chain;

    #[test]
    fn capitalizes_plain_chain_ids() {
        assert_eq!(format_chain("mode"), "Mode");
        assert_eq!(format_chain("base"), "Base");
        assert_eq!(format_chain("aptos"), "Aptos");
    }

    #[test]
    fn maps_special_names() {
        assert_eq!(format_chain("bsc"), "Binance");
        assert_eq!(format_chain("xdai"), "xDai");
        assert_eq!(format_chain(""), "");
    }
}
