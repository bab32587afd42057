//! JSON representation of an envelope.
//!
//! Follows the node's transaction object: quantities as hex strings,
//! `input` for calldata, `yParity` next to `v` on typed transactions and the
//! computed `hash`. Blob sidecars appear as `blobs`, `commitments` and
//! `proofs`.

use alloy_eips::eip4844::{Blob, BlobTransactionSidecar, Bytes48};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

use super::{AccessList, Envelope, RawSignature, SetCodeAuthorization, TxType, TypedFields};
use crate::errors::EnvelopeError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxJson {
	#[serde(rename = "type")]
	tx_type: U64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	chain_id: Option<U256>,
	nonce: U64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	to: Option<Address>,
	gas: U64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	gas_price: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	max_priority_fee_per_gas: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	max_fee_per_gas: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	max_fee_per_blob_gas: Option<U256>,
	value: U256,
	input: Bytes,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access_list: Option<AccessList>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	blob_versioned_hashes: Option<Vec<B256>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	authorization_list: Option<Vec<SetCodeAuthorization>>,
	#[serde(default)]
	v: U256,
	#[serde(default)]
	r: U256,
	#[serde(default)]
	s: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	y_parity: Option<U64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	blobs: Option<Vec<Blob>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	commitments: Option<Vec<Bytes48>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	proofs: Option<Vec<Bytes48>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	hash: Option<B256>,
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, EnvelopeError> {
	value.ok_or(EnvelopeError::MissingField(field))
}

impl Envelope {
	/// Serializes the envelope as a JSON transaction object.
	pub fn to_json(&self) -> Result<String, EnvelopeError> {
		let sidecar = self.sidecar();
		let json = TxJson {
			tx_type: U64::from(u8::from(self.tx_type())),
			chain_id: Some(self.chain_id),
			nonce: U64::from(self.nonce),
			to: self.to,
			gas: U64::from(self.gas),
			gas_price: self.gas_price(),
			max_priority_fee_per_gas: self.max_priority_fee_per_gas(),
			max_fee_per_gas: self.max_fee_per_gas(),
			max_fee_per_blob_gas: self.max_fee_per_blob_gas(),
			value: self.value,
			input: self.data.clone(),
			access_list: self.access_list().cloned(),
			blob_versioned_hashes: self.blob_versioned_hashes().map(<[B256]>::to_vec),
			authorization_list: self.authorization_list().map(<[SetCodeAuthorization]>::to_vec),
			v: self.signature.v,
			r: self.signature.r,
			s: self.signature.s,
			y_parity: match self.tx_type() {
				TxType::Legacy => None,
				_ => self.y_parity().ok().map(|parity| U64::from(parity as u8)),
			},
			blobs: sidecar.map(|s| s.blobs.clone()),
			commitments: sidecar.map(|s| s.commitments.clone()),
			proofs: sidecar.map(|s| s.proofs.clone()),
			hash: Some(self.tx_hash()),
		};
		serde_json::to_string(&json).map_err(|e| EnvelopeError::Json(e.to_string()))
	}

	/// Parses a JSON transaction object.
	///
	/// A legacy object without `chainId` takes it from an EIP-155 `v`. The
	/// `hash` field, when present, is ignored.
	pub fn from_json(input: &str) -> Result<Self, EnvelopeError> {
		let json: TxJson =
			serde_json::from_str(input).map_err(|e| EnvelopeError::Json(e.to_string()))?;
		let raw_type = json.tx_type.to::<u64>();
		let tx_type = u8::try_from(raw_type)
			.map_err(|_| EnvelopeError::UnsupportedType(raw_type))
			.and_then(TxType::try_from)?;

		let chain_id = match (json.chain_id, tx_type) {
			(Some(chain_id), _) => chain_id,
			(None, TxType::Legacy) if json.v >= U256::from(35) => {
				(json.v - U256::from(35)) / U256::from(2)
			}
			(None, TxType::Legacy) => U256::ZERO,
			(None, _) => return Err(EnvelopeError::MissingField("chainId")),
		};

		let access_list = json.access_list.unwrap_or_default();
		let fields = match tx_type {
			TxType::Legacy => TypedFields::Legacy {
				gas_price: required(json.gas_price, "gasPrice")?,
			},
			TxType::AccessList => TypedFields::AccessList {
				gas_price: required(json.gas_price, "gasPrice")?,
				access_list,
			},
			TxType::DynamicFee => TypedFields::DynamicFee {
				max_priority_fee_per_gas: required(
					json.max_priority_fee_per_gas,
					"maxPriorityFeePerGas",
				)?,
				max_fee_per_gas: required(json.max_fee_per_gas, "maxFeePerGas")?,
				access_list,
			},
			TxType::Blob => {
				let sidecar = match (json.blobs, json.commitments, json.proofs) {
					(Some(blobs), Some(commitments), Some(proofs)) => Some(BlobTransactionSidecar {
						blobs,
						commitments,
						proofs,
					}),
					(None, None, None) => None,
					_ => return Err(EnvelopeError::MissingField("blobs, commitments and proofs")),
				};
				TypedFields::Blob {
					max_priority_fee_per_gas: required(
						json.max_priority_fee_per_gas,
						"maxPriorityFeePerGas",
					)?,
					max_fee_per_gas: required(json.max_fee_per_gas, "maxFeePerGas")?,
					access_list,
					max_fee_per_blob_gas: required(json.max_fee_per_blob_gas, "maxFeePerBlobGas")?,
					blob_versioned_hashes: required(
						json.blob_versioned_hashes,
						"blobVersionedHashes",
					)?,
					sidecar,
				}
			}
			TxType::SetCode => TypedFields::SetCode {
				max_priority_fee_per_gas: required(
					json.max_priority_fee_per_gas,
					"maxPriorityFeePerGas",
				)?,
				max_fee_per_gas: required(json.max_fee_per_gas, "maxFeePerGas")?,
				access_list,
				authorization_list: required(json.authorization_list, "authorizationList")?,
			},
		};

		let v = match (tx_type.is_typed(), json.y_parity) {
			(true, Some(parity)) if json.v.is_zero() => U256::from(parity.to::<u64>()),
			_ => json.v,
		};

		let mut envelope = Self::with_fields(chain_id, fields);
		envelope.nonce = json.nonce.to::<u64>();
		envelope.gas = json.gas.to::<u64>();
		envelope.set_to(json.to);
		envelope.value = json.value;
		envelope.data = json.input;
		envelope.signature = RawSignature {
			v,
			r: json.r,
			s: json.s,
		};
		Ok(envelope)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::envelope::{AccessListItem, SignOutcome};
	use alloy_primitives::{address, Signature};

	fn dynamic() -> Envelope {
		let mut envelope = Envelope::new(TxType::DynamicFee, U256::from(137));
		envelope.set_nonce(4);
		envelope.set_gas(52_000);
		envelope.set_to(Some(address!("0x2222222222222222222222222222222222222222")));
		envelope.set_max_priority_fee_per_gas(U256::from(1_000_000_000u64));
		envelope.set_max_fee_per_gas(U256::from(3_000_000_000u64));
		envelope.set_access_list(AccessList(vec![AccessListItem {
			address: Address::repeat_byte(0x33),
			storage_keys: vec![B256::ZERO],
		}]));
		envelope.apply_signature(SignOutcome::Signature(Signature::new(
			U256::from(100),
			U256::from(200),
			true,
		)));
		envelope
	}

	#[test]
	fn test_dynamic_fee_json_fields() {
		let envelope = dynamic();
		let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

		assert_eq!(json["type"], "0x2");
		assert_eq!(json["chainId"], "0x89");
		assert_eq!(json["gas"], "0xcb20");
		assert_eq!(json["maxFeePerGas"], "0xb2d05e00");
		assert_eq!(json["yParity"], "0x1");
		assert_eq!(json["v"], "0x1");
		assert!(json.get("gasPrice").is_none());
		assert!(json.get("blobs").is_none());
		assert_eq!(
			json["hash"].as_str().unwrap(),
			envelope.tx_hash().to_string()
		);
	}

	#[test]
	fn test_json_round_trip() {
		let envelope = dynamic();
		let back = Envelope::from_json(&envelope.to_json().unwrap()).unwrap();
		assert_eq!(back, envelope);

		let mut legacy = Envelope::new(TxType::Legacy, U256::from(5));
		legacy.set_gas_price(U256::from(9));
		legacy.apply_signature(SignOutcome::NoSignature);
		let back = Envelope::from_json(&legacy.to_json().unwrap()).unwrap();
		assert_eq!(back, legacy);
	}

	#[test]
	fn test_legacy_json_has_no_y_parity() {
		let mut legacy = Envelope::new(TxType::Legacy, U256::from(1));
		legacy.set_gas_price(U256::from(9));
		let json: serde_json::Value = serde_json::from_str(&legacy.to_json().unwrap()).unwrap();
		assert!(json.get("yParity").is_none());
		assert!(json.get("accessList").is_none());
	}

	#[test]
	fn test_legacy_chain_id_from_v() {
		let input = r#"{
			"type": "0x0",
			"nonce": "0x9",
			"to": "0x3535353535353535353535353535353535353535",
			"gas": "0x5208",
			"gasPrice": "0x4a817c800",
			"value": "0xde0b6b3a7640000",
			"input": "0x",
			"v": "0x25",
			"r": "0x28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
			"s": "0x67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
		}"#;
		let envelope = Envelope::from_json(input).unwrap();
		assert_eq!(envelope.chain_id(), U256::from(1));
		assert_eq!(
			envelope.tx_hash().to_string(),
			"0x33469b22e9f636356c4160a87eb19df52b7412e8eac32a4a55ffe88ea8350788"
		);
	}

	#[test]
	fn test_missing_pricing_is_rejected() {
		let input = r#"{"type":"0x2","chainId":"0x1","nonce":"0x0","gas":"0x0","value":"0x0","input":"0x","maxFeePerGas":"0x1"}"#;
		assert!(matches!(
			Envelope::from_json(input),
			Err(EnvelopeError::MissingField("maxPriorityFeePerGas"))
		));

		let input = r#"{"type":"0x7","chainId":"0x1","nonce":"0x0","gas":"0x0","value":"0x0","input":"0x"}"#;
		assert!(matches!(
			Envelope::from_json(input),
			Err(EnvelopeError::UnsupportedType(7))
		));

		let input = r#"{"type":"0x1f4","chainId":"0x1","nonce":"0x0","gas":"0x0","value":"0x0","input":"0x"}"#;
		let err = Envelope::from_json(input).unwrap_err();
		assert_eq!(err, EnvelopeError::UnsupportedType(500));
		assert_eq!(err.to_string(), "transaction type not supported: 500");
	}
}
