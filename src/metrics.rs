// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

/// Initializes the descriptions for all the metrics in the SDK.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_histogram!(
        "multicall_batch_size",
        "Number of calls sent in a single aggregate3 request."
    );
    describe_counter!(
        "multicall_failed_slots_total",
        Unit::Count,
        "Total number of multicall slots that reverted, labeled by chain."
    );
    describe_counter!(
        "yield_pools_emitted_total",
        Unit::Count,
        "Total number of pool records returned to the caller, labeled by project."
    );
    describe_counter!(
        "yield_pools_dropped_total",
        Unit::Count,
        "Total number of pool records removed by the final gate, labeled by project and reason."
    );
    describe_counter!(
        "price_lookups_missing_total",
        Unit::Count,
        "Total number of token prices absent from the price service, labeled by chain."
    );
}

pub fn record_multicall_batch_size(size: usize) {
    histogram!("multicall_batch_size", size as f64);
}

pub fn increment_multicall_failed_slots(chain: &str, count: usize) {
    counter!(
        "multicall_failed_slots_total",
        count as u64,
        "chain" => chain.to_string()
    );
}

pub fn increment_pools_emitted(project: &str, count: usize) {
    counter!(
        "yield_pools_emitted_total",
        count as u64,
        "project" => project.to_string()
    );
}

pub fn increment_pools_dropped(project: &str, reason: &'static str) {
    counter!(
        "yield_pools_dropped_total",
        1,
        "project" => project.to_string(),
        "reason" => reason
    );
}

pub fn increment_missing_price(chain: &str) {
    counter!(
        "price_lookups_missing_total",
        1,
        "chain" => chain.to_string()
    );
}
