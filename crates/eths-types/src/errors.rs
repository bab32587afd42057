//! Error taxonomy for transaction construction and submission.
//!
//! Every failure of the pipeline surfaces as a [`TxError`]. Node failures are
//! carried as a structured [`RpcError`]; [`classify_rpc_error`] turns them into
//! an [`EvmError`] whose predicates recognise the common node messages, or
//! into an [`InsufficientBalanceError`] when the node reports missing funds.

use alloy_primitives::{B256, U256};
use std::fmt;
use thiserror::Error;

use crate::envelope::Envelope;
use crate::utils::decode_hex;

/// JSON-RPC error code nodes use for reverted execution.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// An error returned by the node or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
	/// The node answered with a JSON-RPC error object.
	#[error("{message}")]
	JsonRpc {
		code: i64,
		message: String,
		/// The `data` member, unquoted when it was a JSON string.
		data: Option<String>,
	},
	/// The request never produced a JSON-RPC answer.
	#[error("transport error: {0}")]
	Transport(String),
	/// The node accepted a raw transaction under a different hash.
	#[error("node reported transaction hash {reported}, expected {expected}")]
	HashMismatch { expected: B256, reported: B256 },
}

impl RpcError {
	pub fn code(&self) -> Option<i64> {
		match self {
			Self::JsonRpc { code, .. } => Some(*code),
			Self::Transport(_) | Self::HashMismatch { .. } => None,
		}
	}

	pub fn data(&self) -> Option<&str> {
		match self {
			Self::JsonRpc { data, .. } => data.as_deref(),
			Self::Transport(_) | Self::HashMismatch { .. } => None,
		}
	}
}

/// A node error annotated with its JSON-RPC code and data.
///
/// Formats as `code=<code>, data=<data>, <cause>`, omitting the parts that
/// are absent. The predicates match substrings of that full text, which keeps
/// them stable across node vendors that only differ in wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmError {
	pub cause: RpcError,
	pub code: Option<i64>,
	pub data: Option<String>,
}

impl fmt::Display for EvmError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut parts = Vec::with_capacity(3);
		if let Some(code) = self.code.filter(|code| *code != 0) {
			parts.push(format!("code={}", code));
		}
		if let Some(data) = &self.data {
			parts.push(format!("data={}", data));
		}
		parts.push(self.cause.to_string());
		f.write_str(&parts.join(", "))
	}
}

impl std::error::Error for EvmError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.cause)
	}
}

impl From<RpcError> for EvmError {
	fn from(cause: RpcError) -> Self {
		Self {
			code: cause.code(),
			data: cause.data().map(str::to_string),
			cause,
		}
	}
}

impl EvmError {
	fn mentions(&self, needle: &str) -> bool {
		self.to_string().contains(needle)
	}

	/// Execution ran out of gas.
	pub fn is_out_of_gas(&self) -> bool {
		self.mentions("gas required exceeds")
	}

	/// The sender cannot pay for gas (testnet wording).
	pub fn is_insufficient_funds(&self) -> bool {
		self.mentions("insufficient funds for gas")
	}

	/// The sender cannot pay for the transfer (mainnet wording).
	pub fn is_insufficient_funds_for_transfer(&self) -> bool {
		self.mentions("insufficient funds for transfer")
	}

	/// The gas limit is below the intrinsic cost.
	pub fn is_gas_too_low(&self) -> bool {
		self.mentions("intrinsic gas too low")
	}

	/// The gas limit is above what the block or the node accepts.
	pub fn is_gas_too_high(&self) -> bool {
		let msg = self.to_string();
		msg.contains("exceeds block gas limit")
			|| msg.contains("exceeds max transaction gas limit")
			|| msg.contains("gas limit too high")
			|| msg.contains("intrinsic gas too high")
	}

	pub fn is_nonce_too_low(&self) -> bool {
		self.mentions("nonce too low")
	}

	pub fn is_nonce_too_high(&self) -> bool {
		self.mentions("nonce too high")
	}

	/// The node reported a revert through the structured error code.
	pub fn is_execution_reverted(&self) -> bool {
		self.code == Some(EXECUTION_REVERTED_CODE)
	}

	/// The raw revert payload, when the execution reverted with valid hex data.
	pub fn revert_data(&self) -> Option<Vec<u8>> {
		if !self.is_execution_reverted() {
			return None;
		}
		self.data.as_deref().and_then(|data| decode_hex(data).ok())
	}
}

/// The sender cannot afford the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientBalanceError {
	/// The balance observed during preflight.
	pub balance: Option<U256>,
	/// The node error, when the condition was reported by the node.
	pub evm: Option<EvmError>,
}

impl fmt::Display for InsufficientBalanceError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.balance, &self.evm) {
			(Some(balance), _) => write!(f, "[insufficient eth balance ({})]", balance),
			(None, Some(evm)) => write!(f, "[insufficient eth balance ({})]", evm),
			(None, None) => f.write_str("[insufficient eth balance]"),
		}
	}
}

impl std::error::Error for InsufficientBalanceError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.evm
			.as_ref()
			.map(|evm| evm as &(dyn std::error::Error + 'static))
	}
}

/// The node rejected a signed transaction.
///
/// Keeps the transaction that was sent for post-mortem inspection.
#[derive(Debug, Clone, Error)]
#[error("{cause}")]
pub struct SendTransactionError {
	pub tx: Envelope,
	#[source]
	pub cause: RpcError,
}

/// Errors raised while converting or decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
	#[error("transaction type not supported: {0}")]
	UnsupportedType(u64),
	#[error("failed to decode transaction: {0}")]
	Decode(String),
	#[error("{0} is out of range for the generic transaction")]
	FieldOverflow(&'static str),
	#[error("missing required transaction field: {0}")]
	MissingField(&'static str),
	#[error("invalid transaction json: {0}")]
	Json(String),
	#[error("invalid signature: {0}")]
	InvalidSignature(String),
}

/// Errors surfaced by transaction construction, submission and confirmation.
#[derive(Debug, Clone, Error)]
pub enum TxError {
	/// The node or the transport failed.
	#[error("ethereum rpc error: {0}")]
	Rpc(RpcError),
	/// A classified node error.
	#[error("ethereum rpc error: {0}")]
	Evm(EvmError),
	/// The gas quote cannot plausibly be included.
	#[error("invalid gas price: {0}")]
	InvalidGasPrice(String),
	/// A builder step ran before a field it depends on was set.
	#[error("missing required field: {0}")]
	MissingRequiredField(&'static str),
	/// The recipient has code but the call carries no data.
	#[error("contract call with empty data")]
	ContractCallEmptyData,
	/// The recipient must be a contract but has no code.
	#[error("no contract code at given address")]
	NoCode,
	/// Gas estimation failed.
	#[error("{0}")]
	EstimateGas(Box<TxError>),
	#[error("{0}")]
	InsufficientBalance(InsufficientBalanceError),
	#[error("{0}")]
	SendTransaction(Box<SendTransactionError>),
	/// The transaction was mined but did not succeed.
	#[error("receipt status not successful: {0}")]
	ReceiptFailed(B256),
	/// A successful receipt came back without a block number.
	#[error("receipt without block number: {0}")]
	ReceiptMissingBlock(B256),
	#[error("cancelled")]
	Cancelled,
	/// The pre-send hook rejected the signed transaction.
	#[error("before send hook failed: {0}")]
	BeforeSend(String),
	#[error("signing failed: {0}")]
	Signing(String),
	#[error(transparent)]
	Envelope(#[from] EnvelopeError),
	/// Adds a description of the step that failed.
	#[error("{context}: {source}")]
	Context {
		context: &'static str,
		#[source]
		source: Box<TxError>,
	},
}

impl TxError {
	/// Wraps the error with a description of the failed step.
	pub fn context(self, context: &'static str) -> Self {
		Self::Context {
			context,
			source: Box::new(self),
		}
	}

	/// Returns true when the failure originated at the node or the transport.
	pub fn is_rpc(&self) -> bool {
		match self {
			Self::Rpc(_) | Self::Evm(_) | Self::SendTransaction(_) => true,
			Self::InsufficientBalance(err) => err.evm.is_some(),
			Self::EstimateGas(inner) => inner.is_rpc(),
			Self::Context { source, .. } => source.is_rpc(),
			_ => false,
		}
	}

	/// Returns true for gas estimation failures.
	pub fn is_estimate_gas(&self) -> bool {
		match self {
			Self::EstimateGas(_) => true,
			Self::Context { source, .. } => source.is_estimate_gas(),
			_ => false,
		}
	}

	/// The insufficient balance failure inside this error, if any.
	///
	/// Looks through the estimation and context wrappers.
	pub fn insufficient_balance(&self) -> Option<&InsufficientBalanceError> {
		match self {
			Self::InsufficientBalance(err) => Some(err),
			Self::EstimateGas(inner) => inner.insufficient_balance(),
			Self::Context { source, .. } => source.insufficient_balance(),
			_ => None,
		}
	}

	/// The classified node error inside this error, if any.
	pub fn evm_error(&self) -> Option<&EvmError> {
		match self {
			Self::Evm(evm) => Some(evm),
			Self::InsufficientBalance(err) => err.evm.as_ref(),
			Self::EstimateGas(inner) => inner.evm_error(),
			Self::Context { source, .. } => source.evm_error(),
			_ => None,
		}
	}
}

impl From<RpcError> for TxError {
	fn from(err: RpcError) -> Self {
		Self::Rpc(err)
	}
}

/// Classifies a node error.
///
/// Messages reporting missing funds become [`TxError::InsufficientBalance`],
/// everything else a [`TxError::Evm`].
pub fn classify_rpc_error(err: RpcError) -> TxError {
	let evm = EvmError::from(err);
	if evm.is_insufficient_funds() || evm.is_insufficient_funds_for_transfer() {
		TxError::InsufficientBalance(InsufficientBalanceError {
			balance: None,
			evm: Some(evm),
		})
	} else {
		TxError::Evm(evm)
	}
}
