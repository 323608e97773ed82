//! Shared in-memory fakes for adapter integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::types::{Address, U256};
use mig_yield_sdk::chain_registry::Chain;
use mig_yield_sdk::multicall::{CallOutcome, MethodCall, StateReader};
use mig_yield_sdk::price_feeds::PriceOracle;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// How the fake chain answers one call.
#[derive(Debug, Clone)]
pub enum Reply {
    Tokens(Vec<Token>),
    /// Call succeeded but its return data does not decode (bytes32 symbols)
    Undecodable,
    Revert,
}

type Key = (Chain, String, Address, Option<Address>);

/// `StateReader` answering from a table keyed by chain, method, target and
/// first address argument. Unknown calls revert.
#[derive(Default)]
pub struct MockReader {
    replies: HashMap<Key, Reply>,
    broken_batches: HashSet<String>,
    batches: Mutex<Vec<(String, usize)>>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, chain: Chain, method: &str, target: Address, arg: Option<Address>, tokens: Vec<Token>) -> Self {
        self.replies
            .insert((chain, method.to_string(), target, arg), Reply::Tokens(tokens));
        self
    }

    pub fn reply(mut self, chain: Chain, method: &str, target: Address, arg: Option<Address>, reply: Reply) -> Self {
        self.replies.insert((chain, method.to_string(), target, arg), reply);
        self
    }

    /// Every batch of `method` fails at the transport level.
    pub fn break_batches(mut self, method: &str) -> Self {
        self.broken_batches.insert(method.to_string());
        self
    }

    /// `(method, batch length)` for every `multi_call` seen so far.
    pub fn batches(&self) -> Vec<(String, usize)> {
        self.batches.lock().unwrap().clone()
    }

    fn lookup(&self, chain: Chain, method: &Function, target: Address, params: &[Token]) -> Reply {
        let arg = params.first().cloned().and_then(Token::into_address);
        self.replies
            .get(&(chain, method.name.clone(), target, arg))
            .cloned()
            .unwrap_or(Reply::Revert)
    }
}

#[async_trait]
impl StateReader for MockReader {
    async fn call(&self, chain: Chain, target: Address, method: &Function, params: &[Token]) -> Result<Vec<Token>> {
        match self.lookup(chain, method, target, params) {
            Reply::Tokens(tokens) => Ok(tokens),
            Reply::Undecodable => Err(anyhow!("undecodable {} output", method.name)),
            Reply::Revert => Err(anyhow!("{} reverted", method.name)),
        }
    }

    async fn multi_call(
        &self,
        chain: Chain,
        method: &Function,
        calls: &[MethodCall],
        permit_failure: bool,
    ) -> Result<Vec<CallOutcome>> {
        self.batches.lock().unwrap().push((method.name.clone(), calls.len()));
        if self.broken_batches.contains(&method.name) {
            return Err(anyhow!("transport error during {}", method.name));
        }

        let mut outcomes = Vec::with_capacity(calls.len());
        for (index, call) in calls.iter().enumerate() {
            let outcome = match self.lookup(chain, method, call.target, &call.params) {
                Reply::Tokens(tokens) => CallOutcome::ok(tokens),
                Reply::Undecodable => CallOutcome { success: true, output: None },
                Reply::Revert if permit_failure => CallOutcome::failed(),
                Reply::Revert => return Err(anyhow!("{} reverted at call {}", method.name, index)),
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

/// `PriceOracle` serving a fixed table and recording every requested key.
#[derive(Default)]
pub struct StaticPriceOracle {
    prices: HashMap<String, f64>,
    requested: Mutex<Vec<String>>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, chain: Chain, address: Address, price: f64) -> Self {
        self.prices.insert(format!("{}:{:?}", chain, address), price);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn current_prices(&self, keys: &[String]) -> Result<HashMap<String, f64>> {
        self.requested.lock().unwrap().extend(keys.iter().cloned());
        Ok(keys
            .iter()
            .filter_map(|k| self.prices.get(k).map(|p| (k.clone(), *p)))
            .collect())
    }
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn uint(value: u64) -> Token {
    Token::Uint(U256::from(value))
}

/// `mantissa * 10^exp` as a uint token
pub fn scaled(mantissa: u64, exp: usize) -> Token {
    Token::Uint(U256::from(mantissa) * U256::exp10(exp))
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
}
