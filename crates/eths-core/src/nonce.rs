//! Account nonce sources.

use async_trait::async_trait;
use eths_delivery::RpcInterface;
use eths_types::{Address, TxError};
use std::sync::Arc;

/// Yields the next usable nonce of an account.
#[async_trait]
pub trait NonceSource: Send + Sync {
	/// `pending` selects the pool-aware nonce over the latest state nonce.
	async fn next(&self, account: Address, pending: bool) -> Result<u64, TxError>;
}

/// Reads the nonce from the chain.
pub struct ChainNonceSource {
	rpc: Arc<dyn RpcInterface>,
}

impl ChainNonceSource {
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self { rpc }
	}
}

#[async_trait]
impl NonceSource for ChainNonceSource {
	async fn next(&self, account: Address, pending: bool) -> Result<u64, TxError> {
		let nonce = if pending {
			self.rpc.pending_nonce_at(account).await?
		} else {
			self.rpc.nonce_at(account, None).await?
		};
		Ok(nonce)
	}
}

/// Always yields the same nonce.
pub struct StaticNonceSource {
	nonce: u64,
}

impl StaticNonceSource {
	pub fn new(nonce: u64) -> Self {
		Self { nonce }
	}
}

#[async_trait]
impl NonceSource for StaticNonceSource {
	async fn next(&self, _account: Address, _pending: bool) -> Result<u64, TxError> {
		Ok(self.nonce)
	}
}
