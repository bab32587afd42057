//! Hex string formatting utilities.
//!
//! Provides prefix management for hex strings returned by nodes, a lenient
//! hex decoder for revert payloads and identifier truncation for log fields.

/// Truncates a hex identifier for display in log fields.
///
/// Keeps the first 10 characters (the `0x` prefix plus 4 bytes) followed by "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Decodes a hex string as returned in JSON-RPC error data.
///
/// The prefix is optional and an odd number of digits is left-padded with a
/// zero nibble, so "0x1" decodes to `[0x01]`. Empty input decodes to an empty
/// vector.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
	let digits = without_0x_prefix(input);
	if digits.len() % 2 == 1 {
		hex::decode(format!("0{}", digits))
	} else {
		hex::decode(digits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefix_helpers() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
		assert_eq!(without_0x_prefix("0Xabcd"), "abcd");
		assert_eq!(without_0x_prefix("abcd"), "abcd");
	}

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x1234"), "0x1234");
		assert_eq!(
			truncate_id("0x33469b22e9f636356c4160a87eb19df52b7412e8"),
			"0x33469b22.."
		);
	}

	#[test]
	fn test_decode_hex() {
		assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
		assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
		assert_eq!(decode_hex("0X").unwrap(), Vec::<u8>::new());
		assert_eq!(decode_hex("0x48656c6c6f").unwrap(), b"Hello".to_vec());
		assert_eq!(decode_hex("48656c6c6f").unwrap(), b"Hello".to_vec());
		assert_eq!(decode_hex("1").unwrap(), vec![0x01]);
		assert_eq!(decode_hex("0x1").unwrap(), vec![0x01]);
		assert!(decode_hex("0xZZ").is_err());
	}
}
