//! Gas price quotes.
//!
//! On chains whose head carries a base fee the oracle quotes EIP-1559
//! pricing with a fee cap of `tip + multiplier * base_fee`. Other chains get
//! the node's legacy gas price suggestion.

use async_trait::async_trait;
use eths_delivery::RpcInterface;
use eths_types::{GasQuote, TxError, U256};
use std::sync::Arc;

/// Source of gas price quotes.
#[async_trait]
pub trait GasOracle: Send + Sync {
	async fn quote(&self, chain_id: U256) -> Result<GasQuote, TxError>;
}

/// Quotes from the node's head and fee suggestions.
pub struct DefaultGasOracle {
	rpc: Arc<dyn RpcInterface>,
	base_fee_wiggle_multiplier: u64,
}

impl DefaultGasOracle {
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self {
			rpc,
			base_fee_wiggle_multiplier: 2,
		}
	}

	/// Overrides the multiplier applied to the base fee in the fee cap.
	pub fn with_base_fee_wiggle_multiplier(mut self, multiplier: u64) -> Self {
		self.base_fee_wiggle_multiplier = multiplier;
		self
	}
}

#[async_trait]
impl GasOracle for DefaultGasOracle {
	async fn quote(&self, chain_id: U256) -> Result<GasQuote, TxError> {
		let head = self.rpc.latest_header().await?;

		let Some(base_fee) = head.base_fee_per_gas else {
			let gas_price = self.rpc.suggest_gas_price().await?;
			tracing::debug!(%chain_id, %gas_price, "Quoted legacy gas price");
			return Ok(GasQuote::legacy(gas_price));
		};

		let tip = self.rpc.suggest_gas_tip_cap().await?;
		let fee_cap = base_fee
			.saturating_mul(U256::from(self.base_fee_wiggle_multiplier))
			.saturating_add(tip);
		tracing::debug!(%chain_id, %base_fee, %tip, %fee_cap, "Quoted dynamic gas price");

		Ok(GasQuote::Dynamic {
			base_fee: Some(base_fee),
			max_priority_fee_per_gas: tip,
			max_fee_per_gas: fee_cap,
		})
	}
}

/// Returns the same quote every time.
pub struct StaticGasOracle {
	quote: GasQuote,
}

impl StaticGasOracle {
	pub fn new(quote: GasQuote) -> Self {
		Self { quote }
	}
}

#[async_trait]
impl GasOracle for StaticGasOracle {
	async fn quote(&self, _chain_id: U256) -> Result<GasQuote, TxError> {
		Ok(self.quote.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use eths_delivery::MockRpcInterface;
	use eths_types::{HeaderInfo, RpcError};

	fn head(base_fee: Option<u64>) -> HeaderInfo {
		HeaderInfo {
			number: 1,
			base_fee_per_gas: base_fee.map(U256::from),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_dynamic_quote() {
		let mut rpc = MockRpcInterface::new();
		rpc.expect_latest_header()
			.returning(|| Ok(head(Some(10_000_000_000))));
		rpc.expect_suggest_gas_tip_cap()
			.returning(|| Ok(U256::from(1_000_000_000u64)));
		rpc.expect_suggest_gas_price().never();

		let oracle = DefaultGasOracle::new(Arc::new(rpc));
		let quote = oracle.quote(U256::from(1)).await.unwrap();
		assert_eq!(
			quote,
			GasQuote::Dynamic {
				base_fee: Some(U256::from(10_000_000_000u64)),
				max_priority_fee_per_gas: U256::from(1_000_000_000u64),
				max_fee_per_gas: U256::from(21_000_000_000u64),
			}
		);
	}

	#[tokio::test]
	async fn test_wiggle_multiplier() {
		let mut rpc = MockRpcInterface::new();
		rpc.expect_latest_header().returning(|| Ok(head(Some(100))));
		rpc.expect_suggest_gas_tip_cap().returning(|| Ok(U256::from(1)));

		let oracle = DefaultGasOracle::new(Arc::new(rpc)).with_base_fee_wiggle_multiplier(3);
		let quote = oracle.quote(U256::from(1)).await.unwrap();
		assert_eq!(quote.price_ceiling(), U256::from(301));
	}

	#[tokio::test]
	async fn test_legacy_quote_without_base_fee() {
		let mut rpc = MockRpcInterface::new();
		rpc.expect_latest_header().returning(|| Ok(head(None)));
		rpc.expect_suggest_gas_price()
			.returning(|| Ok(U256::from(5_000_000_000u64)));
		rpc.expect_suggest_gas_tip_cap().never();

		let oracle = DefaultGasOracle::new(Arc::new(rpc));
		let quote = oracle.quote(U256::from(56)).await.unwrap();
		assert_eq!(quote, GasQuote::legacy(U256::from(5_000_000_000u64)));
	}

	#[tokio::test]
	async fn test_rpc_failure_is_marked() {
		let mut rpc = MockRpcInterface::new();
		rpc.expect_latest_header()
			.returning(|| Err(RpcError::Transport("timeout".into())));

		let err = DefaultGasOracle::new(Arc::new(rpc))
			.quote(U256::from(1))
			.await
			.unwrap_err();
		assert!(err.is_rpc());
	}
}
