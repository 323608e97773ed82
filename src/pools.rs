// src/pools.rs

use serde::{Deserialize, Serialize};

/// Uniform pool record produced by every adaptor.
///
/// Optional fields are omitted from the serialized record when `None`; their
/// absence is meaningful downstream (e.g. a paused market carries no borrow
/// fields at all rather than zeros).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPool {
    /// Unique key within one run: market or vault id, lowercase.
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    pub tvl_usd: f64,
    pub apy_base: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy_reward: Option<f64>,
    pub underlying_tokens: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_borrow_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy_base_borrow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy_reward_borrow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_ceiling_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrowable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_meta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_tokens: Option<Vec<String>>,
}

/// Borrow-side fields of a lending market, attached or suppressed as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorrowFields {
    pub total_supply_usd: f64,
    pub total_borrow_usd: f64,
    pub apy_base_borrow: f64,
    pub ltv: Option<f64>,
    pub debt_ceiling_usd: Option<f64>,
}

impl YieldPool {
    pub fn new(
        pool: impl Into<String>,
        chain: impl Into<String>,
        project: impl Into<String>,
        symbol: impl Into<String>,
        tvl_usd: f64,
        apy_base: f64,
    ) -> Self {
        Self {
            pool: pool.into(),
            chain: chain.into(),
            project: project.into(),
            symbol: symbol.into(),
            tvl_usd,
            apy_base,
            apy_reward: None,
            underlying_tokens: Vec::new(),
            url: String::new(),
            total_supply_usd: None,
            total_borrow_usd: None,
            apy_base_borrow: None,
            apy_reward_borrow: None,
            ltv: None,
            debt_ceiling_usd: None,
            borrowable: None,
            pool_meta: None,
            reward_tokens: None,
        }
    }

    pub fn with_underlying(mut self, tokens: Vec<String>) -> Self {
        self.underlying_tokens = tokens;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_borrow_fields(mut self, fields: BorrowFields) -> Self {
        self.total_supply_usd = Some(fields.total_supply_usd);
        self.total_borrow_usd = Some(fields.total_borrow_usd);
        self.apy_base_borrow = Some(fields.apy_base_borrow);
        self.ltv = fields.ltv;
        self.debt_ceiling_usd = fields.debt_ceiling_usd;
        self
    }

    /// Removes every borrow-side field, used for administratively paused markets.
    pub fn without_borrow_fields(mut self) -> Self {
        self.total_supply_usd = None;
        self.total_borrow_usd = None;
        self.apy_base_borrow = None;
        self.ltv = None;
        self.debt_ceiling_usd = None;
        self
    }

    pub fn has_borrow_fields(&self) -> bool {
        self.total_supply_usd.is_some()
            || self.total_borrow_usd.is_some()
            || self.apy_base_borrow.is_some()
            || self.ltv.is_some()
            || self.debt_ceiling_usd.is_some()
    }

    fn numeric_fields(&self) -> [Option<f64>; 9] {
        [
            Some(self.tvl_usd),
            Some(self.apy_base),
            self.apy_reward,
            self.total_supply_usd,
            self.total_borrow_usd,
            self.apy_base_borrow,
            self.apy_reward_borrow,
            self.ltv,
            self.debt_ceiling_usd,
        ]
    }

    /// True when every present numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.numeric_fields()
            .iter()
            .flatten()
            .all(|value| value.is_finite())
    }
}
