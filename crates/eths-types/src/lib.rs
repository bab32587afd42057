//! Common types for the eths transaction toolkit.
//!
//! This crate holds the data model shared by every other crate in the
//! workspace: the typed transaction envelope and its encodings, gas quotes and
//! call messages exchanged with the node, the error taxonomy surfaced by the
//! submission pipeline, the EVM revert parser and the intrinsic gas calculator.

/// Typed transaction envelope covering the five EVM transaction types.
pub mod envelope;
/// Error taxonomy and node error classification.
pub mod errors;
/// Gas quotes, call messages and the node responses the pipeline consumes.
pub mod gas;
/// Intrinsic gas computation for balance preflight.
pub mod intrinsic;
/// Decoding of EVM revert payloads into known errors.
pub mod revert;
/// Zeroizing string wrapper for private keys.
pub mod secret_string;
/// Formatting helpers for hex strings and identifiers.
pub mod utils;

pub use envelope::{
	compute_legacy_v, AccessList, AccessListItem, Envelope, RawSignature, SetCodeAuthorization,
	SignOutcome, TxType, TypedFields,
};
pub use errors::{
	classify_rpc_error, EnvelopeError, EvmError, InsufficientBalanceError, RpcError,
	SendTransactionError, TxError,
};
pub use gas::{CallMessage, GasQuote, HeaderInfo, ReceiptInfo};
pub use intrinsic::{intrinsic_gas, IntrinsicGasError, IntrinsicGasRules};
pub use revert::{parse_contract_error, parse_revert, KnownError};
pub use secret_string::SecretString;
pub use utils::{decode_hex, truncate_id, with_0x_prefix, without_0x_prefix};

// Primitive types used across every public signature.
pub use alloy_primitives::{Address, Bytes, Signature, B256, U256};
