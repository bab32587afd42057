//! Rejects gas quotes that cannot plausibly be included.

use async_trait::async_trait;
use eths_delivery::RpcInterface;
use eths_types::{GasQuote, TxError, U256};
use std::sync::Arc;

/// Vets a gas quote against the chain's current base fee.
#[async_trait]
pub trait GasValidator: Send + Sync {
	async fn validate(&self, chain_id: U256, quote: &GasQuote) -> Result<(), TxError>;
}

/// Requires the quote's price ceiling to reach `ceil(base_fee * num / den)`.
pub struct DefaultGasValidator {
	rpc: Arc<dyn RpcInterface>,
	min_fee_numerator: u64,
	min_fee_denominator: u64,
}

impl DefaultGasValidator {
	/// Creates a validator with a floor of 1.2 times the base fee.
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self {
			rpc,
			min_fee_numerator: 6,
			min_fee_denominator: 5,
		}
	}

	/// Overrides the floor ratio. A zero denominator is treated as one.
	pub fn with_min_fee_ratio(mut self, numerator: u64, denominator: u64) -> Self {
		self.min_fee_numerator = numerator;
		self.min_fee_denominator = denominator.max(1);
		self
	}

	fn min_fee(&self, base_fee: U256) -> U256 {
		let denominator = U256::from(self.min_fee_denominator);
		base_fee
			.saturating_mul(U256::from(self.min_fee_numerator))
			.div_ceil(denominator)
	}
}

#[async_trait]
impl GasValidator for DefaultGasValidator {
	async fn validate(&self, chain_id: U256, quote: &GasQuote) -> Result<(), TxError> {
		let head = self.rpc.latest_header().await?;
		let min_fee = head.base_fee_per_gas.map(|base_fee| self.min_fee(base_fee));

		match (quote, min_fee) {
			(GasQuote::Legacy { gas_price }, Some(min_fee)) if *gas_price < min_fee => {
				tracing::debug!(%chain_id, %gas_price, %min_fee, "Rejected legacy gas price");
				Err(TxError::InvalidGasPrice(
					"legacy gas price is lower than base fee".into(),
				))
			}
			(GasQuote::Legacy { .. }, _) => Ok(()),
			(GasQuote::Dynamic { .. }, None) => Err(TxError::InvalidGasPrice(
				"chain does not support EIP-1559".into(),
			)),
			(GasQuote::Dynamic { max_fee_per_gas, .. }, Some(min_fee))
				if *max_fee_per_gas < min_fee =>
			{
				tracing::debug!(%chain_id, %max_fee_per_gas, %min_fee, "Rejected fee cap");
				Err(TxError::InvalidGasPrice("max fee per gas is too low".into()))
			}
			(GasQuote::Dynamic { .. }, Some(_)) => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use eths_delivery::MockRpcInterface;
	use eths_types::HeaderInfo;

	fn validator(base_fee: Option<u64>) -> DefaultGasValidator {
		let mut rpc = MockRpcInterface::new();
		rpc.expect_latest_header().returning(move || {
			Ok(HeaderInfo {
				base_fee_per_gas: base_fee.map(U256::from),
				..Default::default()
			})
		});
		DefaultGasValidator::new(Arc::new(rpc))
	}

	fn dynamic(fee_cap: u64) -> GasQuote {
		GasQuote::dynamic(U256::from(1), U256::from(fee_cap))
	}

	#[tokio::test]
	async fn test_fee_cap_boundary() {
		// ceil(1_000_000_001 * 1.2) = 1_200_000_002
		let validator = validator(Some(1_000_000_001));
		let chain = U256::from(1);

		assert!(validator.validate(chain, &dynamic(1_200_000_002)).await.is_ok());
		let err = validator
			.validate(chain, &dynamic(1_200_000_001))
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"invalid gas price: max fee per gas is too low"
		);
	}

	#[tokio::test]
	async fn test_legacy_on_dynamic_chain() {
		let validator = validator(Some(100));
		let chain = U256::from(1);

		assert!(validator
			.validate(chain, &GasQuote::legacy(U256::from(120)))
			.await
			.is_ok());
		let err = validator
			.validate(chain, &GasQuote::legacy(U256::from(119)))
			.await
			.unwrap_err();
		assert!(matches!(err, TxError::InvalidGasPrice(msg) if msg.contains("lower than base fee")));
	}

	#[tokio::test]
	async fn test_chain_without_base_fee() {
		let validator = validator(None);
		let chain = U256::from(56);

		assert!(validator
			.validate(chain, &GasQuote::legacy(U256::from(1)))
			.await
			.is_ok());
		let err = validator.validate(chain, &dynamic(1_000)).await.unwrap_err();
		assert!(matches!(err, TxError::InvalidGasPrice(msg) if msg.contains("EIP-1559")));
	}

	#[tokio::test]
	async fn test_custom_ratio() {
		let validator = validator(Some(100)).with_min_fee_ratio(3, 2);
		let chain = U256::from(1);
		assert!(validator.validate(chain, &dynamic(150)).await.is_ok());
		assert!(validator.validate(chain, &dynamic(149)).await.is_err());
	}
}
