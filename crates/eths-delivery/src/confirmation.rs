//! Receipt and confirmation waiter.
//!
//! The waiter polls for the receipt a bounded number of times and stops at
//! the first receipt it sees. Once mined, it polls the block number until the
//! requested depth is reached. Every poll and every pause races the caller's
//! [`Cancellation`].

use crate::{Cancellation, DeliveryService};
use alloy_primitives::B256;
use eths_types::{truncate_id, ReceiptInfo, RpcError, TxError};
use std::future::Future;

impl DeliveryService {
	/// Waits until `hash` is mined successfully and buried under
	/// `confirmations` blocks.
	///
	/// Uses the configured retry budget. A receipt that never shows up is not
	/// an error.
	pub async fn wait(
		&self,
		hash: B256,
		confirmations: u64,
		cancel: &Cancellation,
	) -> Result<(), TxError> {
		self.wait_retry(hash, self.retry_times, confirmations, cancel)
			.await
			.map(|_| ())
	}

	/// Like [`DeliveryService::wait`] with an explicit retry budget.
	///
	/// Returns the receipt that was observed, or `None` when the budget ran
	/// out before the node reported one.
	pub async fn wait_retry(
		&self,
		hash: B256,
		retry_times: u32,
		confirmations: u64,
		cancel: &Cancellation,
	) -> Result<Option<ReceiptInfo>, TxError> {
		let tx_id = truncate_id(&hash.to_string());
		let mut receipt = None;
		for attempt in 1..=retry_times {
			match self.race(cancel, self.rpc.transaction_receipt(hash)).await? {
				Some(found) => {
					receipt = Some(found);
					break;
				}
				None => {
					tracing::debug!(tx_hash = %tx_id, attempt, "Receipt not found yet");
					if attempt < retry_times {
						self.pause(cancel).await?;
					}
				}
			}
		}

		let Some(receipt) = receipt else {
			tracing::warn!(
				tx_hash = %tx_id,
				retry_times,
				"Receipt not found, giving up without confirmations"
			);
			return Ok(None);
		};

		if !receipt.status {
			return Err(TxError::ReceiptFailed(hash));
		}
		if confirmations == 0 {
			return Ok(Some(receipt));
		}

		let mined_at = receipt
			.block_number
			.ok_or(TxError::ReceiptMissingBlock(hash))?;
		loop {
			let current = self.race(cancel, self.rpc.block_number()).await?;
			let depth = current.saturating_sub(mined_at);
			if depth >= confirmations {
				tracing::debug!(tx_hash = %tx_id, block = mined_at, depth, "Transaction confirmed");
				return Ok(Some(receipt));
			}
			tracing::debug!(
				tx_hash = %tx_id,
				block = mined_at,
				depth,
				confirmations,
				"Waiting for confirmations"
			);
			self.pause(cancel).await?;
		}
	}

	/// Runs an RPC call unless the caller cancels first.
	async fn race<T>(
		&self,
		cancel: &Cancellation,
		call: impl Future<Output = Result<T, RpcError>>,
	) -> Result<T, TxError> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(TxError::Cancelled),
			result = call => result.map_err(TxError::Rpc),
		}
	}

	/// Sleeps for one poll interval unless the caller cancels first.
	async fn pause(&self, cancel: &Cancellation) -> Result<(), TxError> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(TxError::Cancelled),
			_ = tokio::time::sleep(self.poll_interval) => Ok(()),
		}
	}
}
