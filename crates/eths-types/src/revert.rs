//! Decoding of EVM revert payloads.
//!
//! A revert payload is a 4-byte selector followed by ABI encoded arguments.
//! `Error(string)` and `Panic(uint256)` are recognised without any ABI; custom
//! errors are looked up in the ABIs supplied by the caller.

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::JsonAbi;
use serde::{Deserialize, Serialize};

use crate::errors::EvmError;
use crate::utils::decode_hex;

/// Selector of `Error(string)`.
pub const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Selector of `Panic(uint256)`.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// A revert payload matched against a known error definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownError {
	/// Error name, e.g. `ERC20InsufficientBalance`.
	pub name: String,
	/// Canonical signature, e.g. `ERC20InsufficientBalance(address,uint256,uint256)`.
	pub signature: String,
	/// Decoded arguments in declaration order.
	pub arguments: Vec<String>,
	/// Declaration with parameter names, e.g. `Error(string reason)`.
	pub definition: String,
	/// Name applied to the decoded arguments, e.g. `Panic(17)`.
	pub formatted: String,
}

impl KnownError {
	fn new(name: &str, signature: String, definition: String, values: &[DynSolValue]) -> Self {
		let arguments: Vec<String> = values.iter().map(format_value).collect();
		let formatted = format!("{}({})", name, arguments.join(", "));
		Self {
			name: name.to_string(),
			signature,
			arguments,
			definition,
			formatted,
		}
	}
}

/// Renders a decoded value the way block explorers show it.
fn format_value(value: &DynSolValue) -> String {
	match value {
		DynSolValue::Address(address) => address.to_checksum(None),
		DynSolValue::Uint(number, _) => number.to_string(),
		DynSolValue::Int(number, _) => number.to_string(),
		DynSolValue::Bool(flag) => flag.to_string(),
		DynSolValue::String(text) => text.clone(),
		DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
		DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
		DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
			let inner: Vec<String> = items.iter().map(format_value).collect();
			format!("[{}]", inner.join(", "))
		}
		DynSolValue::Tuple(items) => {
			let inner: Vec<String> = items.iter().map(format_value).collect();
			format!("({})", inner.join(", "))
		}
		other => format!("{:?}", other),
	}
}

fn decode_params(types: Vec<DynSolType>, body: &[u8]) -> Option<Vec<DynSolValue>> {
	match DynSolType::Tuple(types).abi_decode_params(body).ok()? {
		DynSolValue::Tuple(values) => Some(values),
		_ => None,
	}
}

fn decode_builtin(selector: &[u8], body: &[u8]) -> Option<KnownError> {
	if selector == ERROR_SELECTOR {
		let values = decode_params(vec![DynSolType::String], body)?;
		return Some(KnownError::new(
			"Error",
			"Error(string)".to_string(),
			"Error(string reason)".to_string(),
			&values,
		));
	}
	if selector == PANIC_SELECTOR {
		let values = decode_params(vec![DynSolType::Uint(256)], body)?;
		return Some(KnownError::new(
			"Panic",
			"Panic(uint256)".to_string(),
			"Panic(uint256 code)".to_string(),
			&values,
		));
	}
	None
}

/// Matches a revert payload against the built-in errors and the errors
/// declared in `abis`.
///
/// Returns `None` when the payload is shorter than a selector, no definition
/// has its selector, or the arguments do not decode.
pub fn parse_revert(data: &[u8], abis: &[JsonAbi]) -> Option<KnownError> {
	if data.len() < 4 {
		return None;
	}
	let (selector, body) = data.split_at(4);
	if let Some(known) = decode_builtin(selector, body) {
		return Some(known);
	}

	for abi in abis {
		for error in abi.errors() {
			if error.selector().as_slice() != selector {
				continue;
			}
			let Ok(types) = error
				.inputs
				.iter()
				.map(|param| param.resolve())
				.collect::<Result<Vec<DynSolType>, _>>()
			else {
				continue;
			};
			let Some(values) = decode_params(types, body) else {
				continue;
			};
			let params: Vec<String> = error
				.inputs
				.iter()
				.map(|param| {
					if param.name.is_empty() {
						param.selector_type().into_owned()
					} else {
						format!("{} {}", param.selector_type(), param.name)
					}
				})
				.collect();
			let definition = format!("{}({})", error.name, params.join(", "));
			return Some(KnownError::new(
				&error.name,
				error.signature(),
				definition,
				&values,
			));
		}
	}
	None
}

/// Decodes the revert payload carried in a node error's `data`.
pub fn parse_contract_error(abis: &[JsonAbi], err: &EvmError) -> Option<KnownError> {
	let data = decode_hex(err.data.as_deref()?).ok()?;
	parse_revert(&data, abis)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::errors::RpcError;
	use alloy_primitives::{address, U256};
	use alloy_sol_types::{sol, SolError};

	sol! {
		error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
		error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
		error ERC20InvalidReceiver(address receiver);
	}

	fn erc20_abi() -> JsonAbi {
		JsonAbi::parse([
			"error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed)",
			"error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed)",
			"error ERC20InvalidReceiver(address receiver)",
		])
		.unwrap()
	}

	fn reverted(data: &str) -> EvmError {
		EvmError::from(RpcError::JsonRpc {
			code: 3,
			message: "execution reverted".into(),
			data: Some(data.into()),
		})
	}

	#[test]
	fn test_erc20_custom_errors() {
		let payload = ERC20InsufficientBalance {
			sender: address!("0x1234567890abcdef1234567890abcdef12345678"),
			balance: U256::from(100),
			needed: U256::from(1000),
		}
		.abi_encode();

		let known = parse_revert(&payload, &[erc20_abi()]).unwrap();
		assert_eq!(known.name, "ERC20InsufficientBalance");
		assert_eq!(
			known.signature,
			"ERC20InsufficientBalance(address,uint256,uint256)"
		);
		assert_eq!(
			known.arguments,
			vec!["0x1234567890AbcdEF1234567890aBcdef12345678", "100", "1000"]
		);
		assert_eq!(
			known.definition,
			"ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed)"
		);
		assert_eq!(
			known.formatted,
			"ERC20InsufficientBalance(0x1234567890AbcdEF1234567890aBcdef12345678, 100, 1000)"
		);

		let payload = ERC20InsufficientAllowance {
			spender: address!("0xabcdef1234567890abcdef1234567890abcdef12"),
			allowance: U256::from(50),
			needed: U256::from(200),
		}
		.abi_encode();
		let known = parse_revert(&payload, &[erc20_abi()]).unwrap();
		assert_eq!(
			known.arguments,
			vec!["0xabCDEF1234567890ABcDEF1234567890aBCDeF12", "50", "200"]
		);

		let payload = ERC20InvalidReceiver {
			receiver: alloy_primitives::Address::ZERO,
		}
		.abi_encode();
		let known = parse_revert(&payload, &[erc20_abi()]).unwrap();
		assert_eq!(known.signature, "ERC20InvalidReceiver(address)");
		assert_eq!(
			known.arguments,
			vec!["0x0000000000000000000000000000000000000000"]
		);
	}

	#[test]
	fn test_standard_error_string() {
		let err = reverted(concat!(
			"0x08c379a0",
			"0000000000000000000000000000000000000000000000000000000000000020",
			"0000000000000000000000000000000000000000000000000000000000000012",
			"54657374206572726f72206d6573736167650000000000000000000000000000"
		));
		let known = parse_contract_error(&[], &err).unwrap();
		assert_eq!(known.name, "Error");
		assert_eq!(known.arguments, vec!["Test error message"]);
		assert_eq!(known.formatted, "Error(Test error message)");
	}

	#[test]
	fn test_panic_codes() {
		for (code, expected) in [("11", "17"), ("12", "18"), ("01", "1")] {
			let err = reverted(&format!("0x4e487b71{:0>64}", code));
			let known = parse_contract_error(&[], &err).unwrap();
			assert_eq!(known.name, "Panic");
			assert_eq!(known.signature, "Panic(uint256)");
			assert_eq!(known.arguments, vec![expected]);
		}
	}

	#[test]
	fn test_unknown_or_short_payloads() {
		assert_eq!(parse_revert(&[0x08, 0xc3], &[]), None);
		assert_eq!(parse_revert(&[0xde, 0xad, 0xbe, 0xef], &[erc20_abi()]), None);
		// Known selector with a truncated body.
		assert_eq!(parse_revert(&PANIC_SELECTOR, &[]), None);

		let no_data = EvmError::from(RpcError::Transport("eof".into()));
		assert_eq!(parse_contract_error(&[erc20_abi()], &no_data), None);
	}
}
