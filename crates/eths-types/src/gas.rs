//! Gas pricing and node exchange types.
//!
//! These are the values the gas oracle, the estimator and the confirmation
//! waiter pass around: a pricing quote for the next transaction, the call
//! message sent to `eth_estimateGas`, and trimmed views of block headers and
//! receipts.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A gas pricing quote for a transaction.
///
/// A legacy quote prices gas with a single `gas_price`. A dynamic quote
/// follows EIP-1559 and carries the base fee it was derived from when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GasQuote {
	/// Single price per gas unit.
	Legacy { gas_price: U256 },
	/// EIP-1559 pricing.
	Dynamic {
		base_fee: Option<U256>,
		max_priority_fee_per_gas: U256,
		max_fee_per_gas: U256,
	},
}

impl GasQuote {
	/// Creates a legacy quote.
	pub fn legacy(gas_price: U256) -> Self {
		Self::Legacy { gas_price }
	}

	/// Creates a dynamic quote without a base fee reference.
	pub fn dynamic(max_priority_fee_per_gas: U256, max_fee_per_gas: U256) -> Self {
		Self::Dynamic {
			base_fee: None,
			max_priority_fee_per_gas,
			max_fee_per_gas,
		}
	}

	/// Returns true for EIP-1559 quotes.
	pub fn is_dynamic(&self) -> bool {
		matches!(self, Self::Dynamic { .. })
	}

	/// The most the sender can pay per gas unit under this quote.
	///
	/// This is `gas_price` for legacy quotes and `max_fee_per_gas` for
	/// dynamic ones.
	pub fn price_ceiling(&self) -> U256 {
		match self {
			Self::Legacy { gas_price } => *gas_price,
			Self::Dynamic {
				max_fee_per_gas, ..
			} => *max_fee_per_gas,
		}
	}
}

/// A message used to ask the node for a gas estimate.
///
/// Exactly one pricing form is set: `gas_price` for legacy quotes, or the
/// tip and fee caps for dynamic quotes. All three may be absent when the
/// estimate is requested without pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMessage {
	pub from: Address,
	pub to: Option<Address>,
	pub data: Bytes,
	pub value: U256,
	pub gas_price: Option<U256>,
	pub max_priority_fee_per_gas: Option<U256>,
	pub max_fee_per_gas: Option<U256>,
}

impl CallMessage {
	/// Creates an unpriced call message.
	pub fn new(from: Address, to: Option<Address>, data: Bytes, value: U256) -> Self {
		Self {
			from,
			to,
			data,
			value,
			..Default::default()
		}
	}

	/// Sets the pricing fields from a quote.
	pub fn with_quote(mut self, quote: &GasQuote) -> Self {
		match quote {
			GasQuote::Legacy { gas_price } => {
				self.gas_price = Some(*gas_price);
				self.max_priority_fee_per_gas = None;
				self.max_fee_per_gas = None;
			}
			GasQuote::Dynamic {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				..
			} => {
				self.gas_price = None;
				self.max_priority_fee_per_gas = Some(*max_priority_fee_per_gas);
				self.max_fee_per_gas = Some(*max_fee_per_gas);
			}
		}
		self
	}
}

/// The parts of a block header the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
	pub number: u64,
	pub hash: B256,
	/// Present on chains that activated EIP-1559.
	pub base_fee_per_gas: Option<U256>,
}

/// The parts of a transaction receipt the confirmation waiter reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptInfo {
	pub transaction_hash: B256,
	pub block_number: Option<u64>,
	/// True when the transaction executed successfully.
	pub status: bool,
	pub gas_used: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_call_message_pricing_is_exclusive() {
		let msg = CallMessage::new(Address::ZERO, None, Bytes::new(), U256::ZERO)
			.with_quote(&GasQuote::legacy(U256::from(7)))
			.with_quote(&GasQuote::dynamic(U256::from(1), U256::from(3)));

		assert_eq!(msg.gas_price, None);
		assert_eq!(msg.max_priority_fee_per_gas, Some(U256::from(1)));
		assert_eq!(msg.max_fee_per_gas, Some(U256::from(3)));
	}

	#[test]
	fn test_price_ceiling() {
		assert_eq!(
			GasQuote::legacy(U256::from(5)).price_ceiling(),
			U256::from(5)
		);
		assert_eq!(
			GasQuote::dynamic(U256::from(1), U256::from(9)).price_ceiling(),
			U256::from(9)
		);
	}
}
