// Protocol adapters
// Each adapter turns one protocol's on-chain or API data into YieldPool records

pub mod ironclad;
pub mod segment;
pub mod thalaswap;

pub use ironclad::IroncladAdapter;
pub use segment::SegmentAdapter;
pub use thalaswap::ThalaswapAdapter;

// Re-export the trait
pub use crate::yield_adapter::YieldAdapter;
