//! Intrinsic gas of a transaction.
//!
//! The intrinsic gas is charged before any execution: a base cost, a price
//! per calldata byte, initcode metering for contract creation and the cost of
//! declared access list entries and set code authorizations.

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::{AccessList, SetCodeAuthorization};

/// Base cost of every transaction.
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract creation after Homestead.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Cost of a zero calldata byte.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Cost of a non-zero calldata byte before Istanbul.
pub const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;
/// EIP-2028: cost of a non-zero calldata byte.
pub const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;
/// EIP-3860: cost per 32-byte word of initcode.
pub const INITCODE_WORD_GAS: u64 = 2;
/// EIP-2930: cost per access list address.
pub const ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;
/// EIP-2930: cost per access list storage key.
pub const ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;
/// EIP-7702: cost per authorization tuple.
pub const PER_AUTHORIZATION_GAS: u64 = 25_000;

/// Protocol rules that change the intrinsic gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrinsicGasRules {
	/// Contract creation pays the higher base cost.
	pub homestead: bool,
	/// Non-zero calldata bytes cost 16 instead of 68.
	pub istanbul: bool,
	/// Initcode is metered per word.
	pub shanghai: bool,
}

impl Default for IntrinsicGasRules {
	fn default() -> Self {
		Self {
			homestead: true,
			istanbul: true,
			shanghai: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrinsicGasError {
	#[error("gas uint64 overflow")]
	Overflow,
}

fn checked_add_mul(gas: u64, count: u64, price: u64) -> Result<u64, IntrinsicGasError> {
	count
		.checked_mul(price)
		.and_then(|cost| gas.checked_add(cost))
		.ok_or(IntrinsicGasError::Overflow)
}

/// Computes the intrinsic gas of a transaction.
pub fn intrinsic_gas(
	data: &Bytes,
	access_list: Option<&AccessList>,
	authorization_list: Option<&[SetCodeAuthorization]>,
	is_create: bool,
	rules: IntrinsicGasRules,
) -> Result<u64, IntrinsicGasError> {
	let mut gas = if is_create && rules.homestead {
		TX_GAS_CONTRACT_CREATION
	} else {
		TX_GAS
	};

	if !data.is_empty() {
		let len = data.len() as u64;
		let zeros = data.iter().filter(|byte| **byte == 0).count() as u64;
		let non_zero_gas = if rules.istanbul {
			TX_DATA_NON_ZERO_GAS_EIP2028
		} else {
			TX_DATA_NON_ZERO_GAS_FRONTIER
		};
		gas = checked_add_mul(gas, len - zeros, non_zero_gas)?;
		gas = checked_add_mul(gas, zeros, TX_DATA_ZERO_GAS)?;

		if is_create && rules.shanghai {
			gas = checked_add_mul(gas, len.div_ceil(32), INITCODE_WORD_GAS)?;
		}
	}

	if let Some(list) = access_list {
		let keys: usize = list.iter().map(|item| item.storage_keys.len()).sum();
		gas = checked_add_mul(gas, list.len() as u64, ACCESS_LIST_ADDRESS_GAS)?;
		gas = checked_add_mul(gas, keys as u64, ACCESS_LIST_STORAGE_KEY_GAS)?;
	}

	if let Some(list) = authorization_list {
		gas = checked_add_mul(gas, list.len() as u64, PER_AUTHORIZATION_GAS)?;
	}

	Ok(gas)
}
