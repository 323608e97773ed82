//! # Batched State Reader
//!
//! Contract reads go through the [`StateReader`] seam: a single `call` whose
//! failure always propagates, and a `multi_call` that returns one
//! [`CallOutcome`] per requested call, aligned positionally with the input.
//!
//! The production implementation, [`MulticallReader`], batches reads through
//! Multicall3 `aggregate3` with `allowFailure = true` on every slot, so an
//! individual revert never aborts the batch. Whether a revert is tolerated is
//! decided afterwards from the caller's `permit_failure` flag. Only transport
//! failures (RPC unreachable, malformed aggregate response) fail a batch that
//! permits failure.

use crate::chain_registry::Chain;
use crate::metrics;
pub use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::{Function, ParamType, Token};
use ethers::prelude::*;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// A single RPC call to be batched in a multicall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    /// Target contract address
    pub target: Address,
    /// Encoded function call data
    pub call_data: Bytes,
}

/// Raw result of one aggregate3 slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCallResult {
    pub success: bool,
    pub return_data: Bytes,
}

/// One logical read in a `multi_call`: a target plus the method arguments.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub target: Address,
    pub params: Vec<Token>,
}

impl MethodCall {
    pub fn new(target: Address, params: Vec<Token>) -> Self {
        Self { target, params }
    }

    /// Call without arguments (e.g. `decimals()`, `getCash()`).
    pub fn bare(target: Address) -> Self {
        Self { target, params: Vec::new() }
    }
}

/// Outcome of one call inside a batch.
///
/// `success: false` always carries `output: None`. A successful call whose
/// return data does not decode against the method descriptor (e.g. a
/// bytes32 `symbol()`) is reported as `success: true, output: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub success: bool,
    pub output: Option<Vec<Token>>,
}

impl CallOutcome {
    pub fn ok(output: Vec<Token>) -> Self {
        Self { success: true, output: Some(output) }
    }

    pub fn failed() -> Self {
        Self { success: false, output: None }
    }

    /// Placeholder batch used when a whole batch had to be abandoned.
    pub fn all_failed(len: usize) -> Vec<Self> {
        vec![Self::failed(); len]
    }

    pub fn tokens(&self) -> Option<&[Token]> {
        self.output.as_deref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("No RPC endpoint configured for chain {0}")]
    UnknownChain(Chain),
    #[error("{method} reverted at call {index} (target {target:?})")]
    Reverted {
        method: String,
        index: usize,
        target: Address,
    },
    #[error("Multicall returned {got} results for {expected} calls")]
    LengthMismatch { expected: usize, got: usize },
    #[error("Invalid multicall response format")]
    InvalidResponse,
}

/// Batched contract state reads, keyed by chain.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Single read. Reverts and decode failures propagate to the caller.
    async fn call(&self, chain: Chain, target: Address, method: &Function, params: &[Token]) -> Result<Vec<Token>>;

    /// Batched read returning one outcome per call, in input order.
    ///
    /// With `permit_failure = false` any reverted call fails the whole batch.
    async fn multi_call(
        &self,
        chain: Chain,
        method: &Function,
        calls: &[MethodCall],
        permit_failure: bool,
    ) -> Result<Vec<CallOutcome>>;
}

/// Multicall batch executor for optimized RPC calls.
///
/// Batches multiple contract calls into Multicall3 `aggregate3` requests,
/// coalescing identical calls and chunking by `batch_size`.
///
/// ## Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use ethers::prelude::*;
/// # use mig_yield_sdk::multicall::{Call, Multicall};
/// # async fn example(
/// #     provider: Arc<Provider<Http>>,
/// #     multicall_address: Address,
/// #     market: Address,
/// #     get_cash_call: Bytes,
/// # ) -> anyhow::Result<()> {
/// let multicall = Multicall::new(provider, multicall_address, 100);
/// let calls = vec![
///     Call { target: market, call_data: get_cash_call },
///     // ... more calls
/// ];
/// let results = multicall.run(calls, None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Multicall<M: Middleware> {
    pub provider: Arc<M>,
    multicall_address: Address,
    batch_size: usize,
}

impl<M: Middleware + 'static> Multicall<M> {
    pub fn new(provider: Arc<M>, multicall_address: Address, batch_size: usize) -> Self {
        // Limit to at most 200 calls per batch; larger payloads get rejected by public RPCs
        let validated_batch_size = batch_size.clamp(1, 200);

        if batch_size > 200 {
            log::warn!(
                "Batch size {} exceeds recommended maximum (200), capping to 200",
                batch_size
            );
        }

        Self {
            provider,
            multicall_address,
            batch_size: validated_batch_size,
        }
    }

    /// Runs a batch of calls, optionally at a specific block.
    pub async fn run(&self, calls: Vec<Call>, block: Option<BlockId>) -> Result<Vec<RawCallResult>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls = indexmap::IndexMap::new();
        let mut original_indices = vec![0; calls.len()];
        for (i, call) in calls.iter().enumerate() {
            let (index, _) = unique_calls.insert_full((call.target, call.call_data.clone()), ());
            original_indices[i] = index;
        }

        let unique_call_vec: Vec<_> = unique_calls
            .into_keys()
            .map(|(target, call_data)| Call { target, call_data })
            .collect();
        debug!(
            "Multicall coalesced {} calls into {}",
            calls.len(),
            unique_call_vec.len()
        );

        let mut all_results_unique: Vec<RawCallResult> = Vec::with_capacity(unique_call_vec.len());

        for call_chunk in unique_call_vec.chunks(self.batch_size) {
            metrics::record_multicall_batch_size(call_chunk.len());

            let return_data = self.execute_multicall3(call_chunk, block).await?;
            if return_data.len() != call_chunk.len() {
                return Err(BatchError::LengthMismatch {
                    expected: call_chunk.len(),
                    got: return_data.len(),
                }
                .into());
            }
            all_results_unique.extend(return_data);
        }

        // Reconstruct the full result set in the original order
        let final_results = original_indices
            .into_iter()
            .map(|index| all_results_unique[index].clone())
            .collect();

        Ok(final_results)
    }

    /// Execute Multicall3 `aggregate3` with every slot allowed to fail.
    async fn execute_multicall3(&self, calls: &[Call], block: Option<BlockId>) -> Result<Vec<RawCallResult>> {
        // function aggregate3(Call3[] calldata calls) public payable returns (Result[] memory returnData)
        // Call3 struct: { target, allowFailure, callData }
        // Result struct: { success, returnData }
        let call_tokens: Vec<Token> = calls
            .iter()
            .map(|call| {
                Token::Tuple(vec![
                    Token::Address(call.target),
                    Token::Bool(true),
                    Token::Bytes(call.call_data.to_vec()),
                ])
            })
            .collect();

        let calldata = aggregate3_function().encode_input(&[Token::Array(call_tokens)])?;

        let tx_request = ethers::types::TransactionRequest::new()
            .to(self.multicall_address)
            .data(calldata);
        let typed_tx: ethers::types::transaction::eip2718::TypedTransaction = tx_request.into();

        // No timeout at this layer; the RPC endpoint enforces its own
        let response = self.provider.call(&typed_tx, block).await?;

        decode_aggregate3_response(&response)
    }
}

#[allow(deprecated)]
fn aggregate3_function() -> Function {
    Function {
        name: "aggregate3".to_string(),
        inputs: vec![ethers::abi::Param {
            name: "calls".to_string(),
            kind: ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Bool,
                ParamType::Bytes,
            ]))),
            internal_type: None,
        }],
        outputs: vec![ethers::abi::Param {
            name: "returnData".to_string(),
            kind: aggregate3_output_type(),
            internal_type: None,
        }],
        constant: None,
        state_mutability: ethers::abi::StateMutability::Payable,
    }
}

fn aggregate3_output_type() -> ParamType {
    ParamType::Array(Box::new(ParamType::Tuple(vec![ParamType::Bool, ParamType::Bytes])))
}

fn decode_aggregate3_response(response: &[u8]) -> Result<Vec<RawCallResult>> {
    let decoded = ethers::abi::decode(&[aggregate3_output_type()], response)?;

    let results_array = decoded
        .into_iter()
        .next()
        .and_then(|t| t.into_array())
        .ok_or(BatchError::InvalidResponse)?;

    let mut results = Vec::with_capacity(results_array.len());
    for result_token in results_array {
        let tuple = result_token.into_tuple().ok_or(BatchError::InvalidResponse)?;
        let mut fields = tuple.into_iter();
        let success = fields.next().and_then(Token::into_bool).ok_or(BatchError::InvalidResponse)?;
        let return_data = fields.next().and_then(Token::into_bytes).ok_or(BatchError::InvalidResponse)?;
        results.push(RawCallResult {
            success,
            return_data: Bytes::from(return_data),
        });
    }
    Ok(results)
}

/// Converts raw aggregate results into positional outcomes for `method`.
///
/// Reverted slots become [`CallOutcome::failed`]. With `permit_failure = false`
/// the first reverted slot is returned as an error instead.
pub fn decode_outcomes(
    method: &Function,
    calls: &[MethodCall],
    raw: Vec<RawCallResult>,
    permit_failure: bool,
) -> Result<Vec<CallOutcome>> {
    if raw.len() != calls.len() {
        return Err(BatchError::LengthMismatch {
            expected: calls.len(),
            got: raw.len(),
        }
        .into());
    }

    let mut outcomes = Vec::with_capacity(raw.len());
    for (index, result) in raw.into_iter().enumerate() {
        if !result.success {
            if !permit_failure {
                return Err(BatchError::Reverted {
                    method: method.name.clone(),
                    index,
                    target: calls[index].target,
                }
                .into());
            }
            outcomes.push(CallOutcome::failed());
            continue;
        }
        match method.decode_output(&result.return_data) {
            Ok(tokens) => outcomes.push(CallOutcome::ok(tokens)),
            Err(e) => {
                debug!(
                    "Undecodable {} output from {:?}: {}",
                    method.name, calls[index].target, e
                );
                outcomes.push(CallOutcome { success: true, output: None });
            }
        }
    }
    Ok(outcomes)
}

/// [`StateReader`] backed by one Multicall3 executor per chain.
pub struct MulticallReader<M: Middleware> {
    multicalls: HashMap<Chain, Multicall<M>>,
}

impl<M: Middleware + 'static> MulticallReader<M> {
    pub fn new() -> Self {
        Self {
            multicalls: HashMap::new(),
        }
    }

    pub fn with_chain(mut self, chain: Chain, provider: Arc<M>, multicall_address: Address, batch_size: usize) -> Self {
        self.multicalls
            .insert(chain, Multicall::new(provider, multicall_address, batch_size));
        self
    }

    fn multicall(&self, chain: Chain) -> Result<&Multicall<M>> {
        self.multicalls
            .get(&chain)
            .ok_or_else(|| BatchError::UnknownChain(chain).into())
    }
}

impl<M: Middleware + 'static> Default for MulticallReader<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Middleware + 'static> StateReader for MulticallReader<M> {
    async fn call(&self, chain: Chain, target: Address, method: &Function, params: &[Token]) -> Result<Vec<Token>> {
        let multicall = self.multicall(chain)?;
        let calldata = method.encode_input(params)?;
        let tx_request = ethers::types::TransactionRequest::new().to(target).data(calldata);
        let typed_tx: ethers::types::transaction::eip2718::TypedTransaction = tx_request.into();

        let response = multicall.provider.call(&typed_tx, None).await?;
        let tokens = method.decode_output(&response)?;
        Ok(tokens)
    }

    async fn multi_call(
        &self,
        chain: Chain,
        method: &Function,
        calls: &[MethodCall],
        permit_failure: bool,
    ) -> Result<Vec<CallOutcome>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let multicall = self.multicall(chain)?;

        let encoded = calls
            .iter()
            .map(|call| {
                Ok(Call {
                    target: call.target,
                    call_data: Bytes::from(method.encode_input(&call.params)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let raw = multicall.run(encoded, None).await?;
        let failed = raw.iter().filter(|r| !r.success).count();
        if failed > 0 {
            metrics::increment_multicall_failed_slots(chain.as_str(), failed);
            warn!(
                "{} of {} {} calls reverted on {}",
                failed,
                calls.len(),
                method.name,
                chain
            );
        }

        decode_outcomes(method, calls, raw, permit_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Erc20Methods;
    use ethers::providers::Provider;

    fn encode_uint(value: u64) -> Bytes {
        Bytes::from(ethers::abi::encode(&[Token::Uint(U256::from(value))]))
    }

    fn aggregate_response(slots: Vec<(bool, Bytes)>) -> Bytes {
        let tokens = slots
            .into_iter()
            .map(|(success, data)| Token::Tuple(vec![Token::Bool(success), Token::Bytes(data.to_vec())]))
            .collect();
        Bytes::from(ethers::abi::encode(&[Token::Array(tokens)]))
    }

    fn targets(n: u64) -> Vec<MethodCall> {
        (1..=n)
            .map(|i| MethodCall::bare(Address::from_low_u64_be(i)))
            .collect()
    }

    #[test]
    fn failed_slot_does_not_shift_neighbours() {
        let erc20 = Erc20Methods::load().unwrap();
        let calls = targets(5);
        let raw = vec![
            RawCallResult { success: true, return_data: encode_uint(10) },
            RawCallResult { success: true, return_data: encode_uint(11) },
            RawCallResult { success: false, return_data: Bytes::new() },
            RawCallResult { success: true, return_data: encode_uint(13) },
            RawCallResult { success: true, return_data: encode_uint(14) },
        ];

        let outcomes = decode_outcomes(&erc20.total_supply, &calls, raw, true).unwrap();
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[2], CallOutcome::failed());
        for (i, expected) in [(0, 10u64), (1, 11), (3, 13), (4, 14)] {
            assert_eq!(outcomes[i], CallOutcome::ok(vec![Token::Uint(U256::from(expected))]));
        }
    }

    #[test]
    fn revert_fails_batch_without_permit_failure() {
        let erc20 = Erc20Methods::load().unwrap();
        let calls = targets(2);
        let raw = vec![
            RawCallResult { success: true, return_data: encode_uint(1) },
            RawCallResult { success: false, return_data: Bytes::new() },
        ];

        let err = decode_outcomes(&erc20.total_supply, &calls, raw, false).unwrap_err();
        match err.downcast_ref::<BatchError>() {
            Some(BatchError::Reverted { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn undecodable_success_keeps_success_flag() {
        let erc20 = Erc20Methods::load().unwrap();
        let calls = targets(1);
        // bytes32 symbol, as returned by legacy tokens
        let raw = vec![RawCallResult {
            success: true,
            return_data: Bytes::from(vec![0x4d, 0x4b, 0x52].into_iter().chain(std::iter::repeat(0).take(29)).collect::<Vec<u8>>()),
        }];

        let outcomes = decode_outcomes(&erc20.symbol, &calls, raw, false).unwrap();
        assert_eq!(outcomes[0], CallOutcome { success: true, output: None });
    }

    #[test]
    fn all_failed_placeholder_has_requested_length() {
        let placeholder = CallOutcome::all_failed(4);
        assert_eq!(placeholder.len(), 4);
        assert!(placeholder.iter().all(|o| !o.success && o.output.is_none()));
    }

    #[tokio::test]
    async fn reader_aligns_aggregate_results_with_calls() {
        let (provider, mock) = Provider::mocked();
        mock.push::<Bytes, _>(aggregate_response(vec![
            (true, encode_uint(100)),
            (false, Bytes::new()),
            (true, encode_uint(300)),
        ]))
        .unwrap();

        let reader = MulticallReader::new().with_chain(
            Chain::Bob,
            Arc::new(provider),
            Address::from_low_u64_be(0xca11),
            200,
        );
        let erc20 = Erc20Methods::load().unwrap();

        let outcomes = reader
            .multi_call(Chain::Bob, &erc20.total_supply, &targets(3), true)
            .await
            .unwrap();
        assert_eq!(outcomes[0], CallOutcome::ok(vec![Token::Uint(U256::from(100u64))]));
        assert_eq!(outcomes[1], CallOutcome::failed());
        assert_eq!(outcomes[2], CallOutcome::ok(vec![Token::Uint(U256::from(300u64))]));
    }

    #[tokio::test]
    async fn unknown_chain_is_rejected_before_io() {
        let reader: MulticallReader<Provider<ethers::providers::MockProvider>> = MulticallReader::new();
        let erc20 = Erc20Methods::load().unwrap();
        let err = reader
            .multi_call(Chain::Mode, &erc20.decimals, &targets(1), true)
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<BatchError>(), Some(BatchError::UnknownChain(Chain::Mode))));
    }

    #[tokio::test]
    async fn empty_batch_skips_io() {
        let reader: MulticallReader<Provider<ethers::providers::MockProvider>> = MulticallReader::new();
        let erc20 = Erc20Methods::load().unwrap();
        let outcomes = reader.multi_call(Chain::Mode, &erc20.decimals, &[], false).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
