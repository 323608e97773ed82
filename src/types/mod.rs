// Shared value conversions between ABI tokens, raw integers and floats

pub mod conversions;
