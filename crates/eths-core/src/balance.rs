//! Balance preflight.
//!
//! Before signing, the sender must hold a non-zero balance that covers the
//! intrinsic gas of the transaction at the quoted price ceiling. Without a
//! quote only the non-zero balance is required. Execution gas is not
//! covered; the node's own check rejects that later.

use async_trait::async_trait;
use eths_delivery::RpcInterface;
use eths_types::{
	intrinsic_gas, Address, Bytes, GasQuote, InsufficientBalanceError, IntrinsicGasRules,
	TxError, U256,
};
use std::sync::Arc;

/// Verifies that a sender can pay for a transaction.
#[async_trait]
pub trait BalanceChecker: Send + Sync {
	/// `to` is `None` for contract creation. Without a `quote` the intrinsic
	/// gas ceiling is not checked.
	async fn check_balance(
		&self,
		from: Address,
		data: &Bytes,
		to: Option<Address>,
		quote: Option<&GasQuote>,
	) -> Result<(), TxError>;
}

/// Compares the latest balance with `intrinsic_gas * price_ceiling`.
pub struct DefaultBalanceChecker {
	rpc: Arc<dyn RpcInterface>,
	rules: IntrinsicGasRules,
}

impl DefaultBalanceChecker {
	/// Creates a checker with every intrinsic gas rule enabled.
	pub fn new(rpc: Arc<dyn RpcInterface>) -> Self {
		Self {
			rpc,
			rules: IntrinsicGasRules::default(),
		}
	}

	pub fn with_rules(mut self, rules: IntrinsicGasRules) -> Self {
		self.rules = rules;
		self
	}
}

#[async_trait]
impl BalanceChecker for DefaultBalanceChecker {
	async fn check_balance(
		&self,
		from: Address,
		data: &Bytes,
		to: Option<Address>,
		quote: Option<&GasQuote>,
	) -> Result<(), TxError> {
		let balance = self.rpc.balance_at(from, None).await?;
		let insufficient = || {
			TxError::InsufficientBalance(InsufficientBalanceError {
				balance: Some(balance),
				evm: None,
			})
		};
		if balance.is_zero() {
			return Err(insufficient());
		}
		let Some(quote) = quote else {
			return Ok(());
		};

		let gas = match intrinsic_gas(data, None, None, to.is_none(), self.rules) {
			Ok(gas) => gas,
			Err(e) => {
				tracing::debug!(%from, error = %e, "Skipping balance ceiling check");
				return Ok(());
			}
		};
		let Some(cost) = U256::from(gas).checked_mul(quote.price_ceiling()) else {
			tracing::debug!(%from, gas, "Skipping balance ceiling check on overflow");
			return Ok(());
		};
		if cost > balance {
			tracing::debug!(%from, %balance, %cost, "Balance does not cover intrinsic gas");
			return Err(insufficient());
		}
		Ok(())
	}
}
