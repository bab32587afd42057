//! Transaction delivery module for the eths toolkit.
//!
//! This module defines the node RPC surface the pipeline consumes, submits
//! signed envelopes and waits for their receipts and confirmations.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use eths_types::{
	CallMessage, Envelope, HeaderInfo, ReceiptInfo, RpcError, SendTransactionError, TxError,
};
use std::sync::Arc;
use std::time::Duration;

mod cancellation;
mod confirmation;

pub use cancellation::{cancellation, CancelHandle, Cancellation};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Default number of receipt lookups before the waiter gives up.
pub const DEFAULT_RETRY_TIMES: u32 = 10;
/// Default pause between receipt and block number polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Node RPC calls used by transaction construction and submission.
///
/// Every method maps to a single JSON-RPC request. `block` arguments select
/// a historical block by number and default to the latest block.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RpcInterface: Send + Sync {
	/// Header of the latest block.
	async fn latest_header(&self) -> Result<HeaderInfo, RpcError>;

	/// Legacy gas price suggested by the node.
	async fn suggest_gas_price(&self) -> Result<U256, RpcError>;

	/// Priority fee suggested by the node.
	async fn suggest_gas_tip_cap(&self) -> Result<U256, RpcError>;

	/// Code at `address` in the pending state.
	async fn pending_code_at(&self, address: Address) -> Result<Bytes, RpcError>;

	async fn code_at(&self, address: Address, block: Option<u64>) -> Result<Bytes, RpcError>;

	async fn balance_at(&self, address: Address, block: Option<u64>) -> Result<U256, RpcError>;

	async fn nonce_at(&self, address: Address, block: Option<u64>) -> Result<u64, RpcError>;

	/// Next nonce including transactions still in the pool.
	async fn pending_nonce_at(&self, address: Address) -> Result<u64, RpcError>;

	async fn estimate_gas(&self, msg: &CallMessage) -> Result<u64, RpcError>;

	/// Broadcasts a wire encoded transaction.
	async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError>;

	/// Receipt of a mined transaction, `None` when the node does not know it yet.
	async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, RpcError>;

	async fn block_number(&self) -> Result<u64, RpcError>;

	/// Executes a call without creating a transaction.
	async fn call_contract(&self, msg: &CallMessage, block: Option<u64>)
		-> Result<Bytes, RpcError>;
}

/// Service that submits transactions and waits for them to be mined.
///
/// Cloning is cheap; clones share the same RPC connection.
#[derive(Clone)]
pub struct DeliveryService {
	/// The underlying RPC implementation.
	rpc: Arc<dyn RpcInterface>,
	/// Receipt lookups before the waiter gives up.
	retry_times: u32,
	/// Pause between polls.
	poll_interval: Duration,
}

impl DeliveryService {
	/// Creates a new DeliveryService with the default polling budget.
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self {
			rpc,
			retry_times: DEFAULT_RETRY_TIMES,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	/// Overrides the polling budget of the confirmation waiter.
	pub fn with_polling(mut self, retry_times: u32, poll_interval: Duration) -> Self {
		self.retry_times = retry_times;
		self.poll_interval = poll_interval;
		self
	}

	/// The RPC implementation used by this service.
	pub fn rpc(&self) -> &Arc<dyn RpcInterface> {
		&self.rpc
	}

	pub fn retry_times(&self) -> u32 {
		self.retry_times
	}

	pub fn poll_interval(&self) -> Duration {
		self.poll_interval
	}

	/// Broadcasts a signed envelope and returns its transaction hash.
	///
	/// A node rejection comes back as [`TxError::SendTransaction`] carrying
	/// the envelope that was sent.
	pub async fn submit(&self, envelope: &Envelope) -> Result<B256, TxError> {
		let raw = Bytes::from(envelope.to_wire());
		let tx_hash = envelope.tx_hash();

		let sent = match self.rpc.send_raw_transaction(raw).await {
			Ok(reported) if reported == tx_hash => Ok(()),
			Ok(reported) => Err(RpcError::HashMismatch {
				expected: tx_hash,
				reported,
			}),
			Err(cause) => Err(cause),
		};
		if let Err(cause) = sent {
			tracing::warn!(tx_hash = %tx_hash, error = %cause, "Failed to submit transaction");
			return Err(TxError::SendTransaction(Box::new(SendTransactionError {
				tx: envelope.clone(),
				cause,
			})));
		}

		tracing::info!(
			tx_hash = %tx_hash,
			chain_id = %envelope.chain_id(),
			nonce = envelope.nonce(),
			"Submitted transaction"
		);
		Ok(tx_hash)
	}
}
