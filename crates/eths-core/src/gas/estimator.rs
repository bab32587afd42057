//! Gas limit estimation.

use async_trait::async_trait;
use eths_delivery::RpcInterface;
use eths_types::{classify_rpc_error, CallMessage, TxError, U256};
use std::sync::Arc;

/// Estimates the gas a call message consumes.
#[async_trait]
pub trait GasEstimator: Send + Sync {
	async fn estimate(&self, chain_id: U256, msg: &CallMessage) -> Result<u64, TxError>;
}

/// Asks the node to simulate the call.
///
/// Node errors are classified, so out-of-gas and insufficient funds
/// failures can be matched without inspecting the message.
pub struct DefaultGasEstimator {
	rpc: Arc<dyn RpcInterface>,
}

impl DefaultGasEstimator {
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self { rpc }
	}
}

#[async_trait]
impl GasEstimator for DefaultGasEstimator {
	async fn estimate(&self, chain_id: U256, msg: &CallMessage) -> Result<u64, TxError> {
		tracing::debug!(
			%chain_id,
			from = %msg.from,
			to = ?msg.to,
			value = %msg.value,
			gas_price = ?msg.gas_price,
			tip_cap = ?msg.max_priority_fee_per_gas,
			fee_cap = ?msg.max_fee_per_gas,
			data_len = msg.data.len(),
			"Estimating gas"
		);
		self.rpc.estimate_gas(msg).await.map_err(classify_rpc_error)
	}
}

/// Returns a fixed gas limit without talking to the node.
pub struct StaticGasEstimator {
	gas_limit: u64,
}

impl StaticGasEstimator {
	pub fn new(gas_limit: u64) -> Self {
		Self { gas_limit }
	}
}

#[async_trait]
impl GasEstimator for StaticGasEstimator {
	async fn estimate(&self, _chain_id: U256, _msg: &CallMessage) -> Result<u64, TxError> {
		Ok(self.gas_limit)
	}
}
