//! Conversion between [`Envelope`] and `alloy_consensus::TxEnvelope`.
//!
//! The generic container drops the chain id of an unsigned legacy
//! transaction, so unsigned legacy envelopes cross the boundary carrying the
//! `(35 + 2 * chain_id, 1, 1)` marker signature, which is stripped again on
//! the way back.

use alloy_consensus::{
	SignableTransaction, TxEip1559, TxEip2930, TxEip4844, TxEip4844Variant, TxEip7702, TxEnvelope,
	TxLegacy,
};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Address, Signature, TxKind, U256};

use super::{compute_legacy_v, Envelope, RawSignature, TxType, TypedFields};
use crate::errors::EnvelopeError;

fn narrow_u128(value: U256, field: &'static str) -> Result<u128, EnvelopeError> {
	u128::try_from(value).map_err(|_| EnvelopeError::FieldOverflow(field))
}

fn typed_signature(parity: bool, signature: &Signature) -> RawSignature {
	RawSignature {
		v: U256::from(parity as u8),
		r: signature.r(),
		s: signature.s(),
	}
}

impl Envelope {
	/// Decodes the canonical EIP-2718 encoding of a signed transaction.
	pub fn from_wire(bytes: &[u8]) -> Result<Self, EnvelopeError> {
		let mut buf = bytes;
		let tx = TxEnvelope::decode_2718(&mut buf).map_err(|e| EnvelopeError::Decode(e.to_string()))?;
		if !buf.is_empty() {
			return Err(EnvelopeError::Decode(format!(
				"{} trailing bytes after transaction",
				buf.len()
			)));
		}
		Self::from_generic(&tx, None)
	}

	/// Converts a generic transaction into an envelope.
	///
	/// Legacy transactions without a chain id take `fallback_chain_id`, or
	/// zero when none is given. A legacy marker signature `(v, 1, 1)` is
	/// stripped back to all zero.
	pub fn from_generic(
		tx: &TxEnvelope,
		fallback_chain_id: Option<U256>,
	) -> Result<Self, EnvelopeError> {
		#[allow(unreachable_patterns)]
		let envelope = match tx {
			TxEnvelope::Legacy(signed) => {
				let inner = signed.tx();
				let signature = signed.signature();
				let chain_id = inner
					.chain_id
					.map(U256::from)
					.or(fallback_chain_id)
					.unwrap_or_default();

				let mut envelope = Self::with_fields(
					chain_id,
					TypedFields::Legacy {
						gas_price: U256::from(inner.gas_price),
					},
				);
				envelope.fill_common(inner.nonce, inner.gas_limit, inner.to.to().copied());
				envelope.value = inner.value;
				envelope.data = inner.input.clone();

				let raw = RawSignature {
					v: U256::ZERO,
					r: signature.r(),
					s: signature.s(),
				};
				envelope.signature = if raw.r == U256::from(1) && raw.s == U256::from(1) {
					RawSignature::default()
				} else if inner.chain_id.is_some() {
					RawSignature {
						v: compute_legacy_v(signature.v() as u64, chain_id, true),
						..raw
					}
				} else {
					RawSignature {
						v: U256::from(27 + signature.v() as u64),
						..raw
					}
				};
				envelope
			}
			TxEnvelope::Eip2930(signed) => {
				let inner = signed.tx();
				let mut envelope = Self::with_fields(
					U256::from(inner.chain_id),
					TypedFields::AccessList {
						gas_price: U256::from(inner.gas_price),
						access_list: inner.access_list.clone(),
					},
				);
				envelope.fill_common(inner.nonce, inner.gas_limit, inner.to.to().copied());
				envelope.value = inner.value;
				envelope.data = inner.input.clone();
				envelope.signature =
					typed_signature(signed.signature().v(), signed.signature());
				envelope
			}
			TxEnvelope::Eip1559(signed) => {
				let inner = signed.tx();
				let mut envelope = Self::with_fields(
					U256::from(inner.chain_id),
					TypedFields::DynamicFee {
						max_priority_fee_per_gas: U256::from(inner.max_priority_fee_per_gas),
						max_fee_per_gas: U256::from(inner.max_fee_per_gas),
						access_list: inner.access_list.clone(),
					},
				);
				envelope.fill_common(inner.nonce, inner.gas_limit, inner.to.to().copied());
				envelope.value = inner.value;
				envelope.data = inner.input.clone();
				envelope.signature =
					typed_signature(signed.signature().v(), signed.signature());
				envelope
			}
			TxEnvelope::Eip4844(signed) => {
				let inner = signed.tx().tx();
				let mut envelope = Self::with_fields(
					U256::from(inner.chain_id),
					TypedFields::Blob {
						max_priority_fee_per_gas: U256::from(inner.max_priority_fee_per_gas),
						max_fee_per_gas: U256::from(inner.max_fee_per_gas),
						access_list: inner.access_list.clone(),
						max_fee_per_blob_gas: U256::from(inner.max_fee_per_blob_gas),
						blob_versioned_hashes: inner.blob_versioned_hashes.clone(),
						sidecar: None,
					},
				);
				envelope.fill_common(inner.nonce, inner.gas_limit, Some(inner.to));
				envelope.value = inner.value;
				envelope.data = inner.input.clone();
				envelope.signature =
					typed_signature(signed.signature().v(), signed.signature());
				envelope
			}
			TxEnvelope::Eip7702(signed) => {
				let inner = signed.tx();
				let mut envelope = Self::with_fields(
					U256::from(inner.chain_id),
					TypedFields::SetCode {
						max_priority_fee_per_gas: U256::from(inner.max_priority_fee_per_gas),
						max_fee_per_gas: U256::from(inner.max_fee_per_gas),
						access_list: inner.access_list.clone(),
						authorization_list: inner.authorization_list.clone(),
					},
				);
				envelope.fill_common(inner.nonce, inner.gas_limit, Some(inner.to));
				envelope.value = inner.value;
				envelope.data = inner.input.clone();
				envelope.signature =
					typed_signature(signed.signature().v(), signed.signature());
				envelope
			}
			other => return Err(EnvelopeError::UnsupportedType(u8::from(other.tx_type()).into())),
		};
		Ok(envelope)
	}

	/// Converts the envelope into a generic signed transaction.
	///
	/// Unsigned legacy envelopes get the `(v, 1, 1)` marker so the chain id
	/// is kept. Fee fields above `u128::MAX` and chain ids above `u64::MAX`
	/// cannot be represented and fail.
	pub fn to_generic(&self) -> Result<TxEnvelope, EnvelopeError> {
		let chain_id =
			u64::try_from(self.chain_id).map_err(|_| EnvelopeError::FieldOverflow("chain_id"))?;
		let kind = match self.to {
			Some(address) => TxKind::Call(address),
			None => TxKind::Create,
		};
		let to = self.to.unwrap_or(Address::ZERO);

		let mut marked = self.clone();
		if self.tx_type() == TxType::Legacy && self.signature.is_empty() {
			marked.signature = RawSignature {
				v: compute_legacy_v(27, self.chain_id, true),
				r: U256::from(1),
				s: U256::from(1),
			};
		}
		let signature = Signature::new(
			marked.signature.r,
			marked.signature.s,
			marked.y_parity()?,
		);

		let tx = match &self.fields {
			TypedFields::Legacy { gas_price } => {
				let legacy_chain_id = marked.is_eip155().then_some(chain_id);
				TxEnvelope::Legacy(
					TxLegacy {
						chain_id: legacy_chain_id,
						nonce: self.nonce,
						gas_price: narrow_u128(*gas_price, "gas_price")?,
						gas_limit: self.gas,
						to: kind,
						value: self.value,
						input: self.data.clone(),
					}
					.into_signed(signature),
				)
			}
			TypedFields::AccessList {
				gas_price,
				access_list,
			} => TxEnvelope::Eip2930(
				TxEip2930 {
					chain_id,
					nonce: self.nonce,
					gas_price: narrow_u128(*gas_price, "gas_price")?,
					gas_limit: self.gas,
					to: kind,
					value: self.value,
					access_list: access_list.clone(),
					input: self.data.clone(),
				}
				.into_signed(signature),
			),
			TypedFields::DynamicFee {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
			} => TxEnvelope::Eip1559(
				TxEip1559 {
					chain_id,
					nonce: self.nonce,
					gas_limit: self.gas,
					max_fee_per_gas: narrow_u128(*max_fee_per_gas, "max_fee_per_gas")?,
					max_priority_fee_per_gas: narrow_u128(
						*max_priority_fee_per_gas,
						"max_priority_fee_per_gas",
					)?,
					to: kind,
					value: self.value,
					access_list: access_list.clone(),
					input: self.data.clone(),
				}
				.into_signed(signature),
			),
			TypedFields::Blob {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
				max_fee_per_blob_gas,
				blob_versioned_hashes,
				..
			} => {
				let inner = TxEip4844 {
					chain_id,
					nonce: self.nonce,
					gas_limit: self.gas,
					max_fee_per_gas: narrow_u128(*max_fee_per_gas, "max_fee_per_gas")?,
					max_priority_fee_per_gas: narrow_u128(
						*max_priority_fee_per_gas,
						"max_priority_fee_per_gas",
					)?,
					to,
					value: self.value,
					access_list: access_list.clone(),
					blob_versioned_hashes: blob_versioned_hashes.clone(),
					max_fee_per_blob_gas: narrow_u128(
						*max_fee_per_blob_gas,
						"max_fee_per_blob_gas",
					)?,
					input: self.data.clone(),
				};
				TxEnvelope::Eip4844(TxEip4844Variant::TxEip4844(inner).into_signed(signature))
			}
			TypedFields::SetCode {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
				authorization_list,
			} => TxEnvelope::Eip7702(
				TxEip7702 {
					chain_id,
					nonce: self.nonce,
					gas_limit: self.gas,
					max_fee_per_gas: narrow_u128(*max_fee_per_gas, "max_fee_per_gas")?,
					max_priority_fee_per_gas: narrow_u128(
						*max_priority_fee_per_gas,
						"max_priority_fee_per_gas",
					)?,
					to,
					value: self.value,
					access_list: access_list.clone(),
					authorization_list: authorization_list.clone(),
					input: self.data.clone(),
				}
				.into_signed(signature),
			),
		};
		Ok(tx)
	}

	fn fill_common(&mut self, nonce: u64, gas: u64, to: Option<Address>) {
		self.nonce = nonce;
		self.gas = gas;
		self.set_to(to);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::envelope::SignOutcome;
	use alloy_eips::eip2718::Encodable2718;
	use alloy_primitives::{address, b256, Bytes};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	const RAW_EIP155: &str = concat!(
		"f86c098504a817c800825208943535353535353535353535353535353535353535880de0",
		"b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590",
		"620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
	);

	fn signer() -> PrivateKeySigner {
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
			.parse()
			.unwrap()
	}

	fn sample(tx_type: TxType, chain_id: u64) -> Envelope {
		let mut envelope = Envelope::new(tx_type, U256::from(chain_id));
		envelope.set_nonce(3);
		envelope.set_gas(60_000);
		envelope.set_to(Some(address!("0x2222222222222222222222222222222222222222")));
		envelope.set_value(U256::from(1_000));
		envelope.set_data(Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]));
		envelope.set_gas_price(U256::from(7_000_000_000u64));
		envelope.set_max_priority_fee_per_gas(U256::from(1_000_000_000u64));
		envelope.set_max_fee_per_gas(U256::from(3_000_000_000u64));
		envelope.set_max_fee_per_blob_gas(U256::from(1_000_000u64));
		envelope.set_blob_versioned_hashes(vec![b256!(
			"0x0100000000000000000000000000000000000000000000000000000000000001"
		)]);
		envelope
	}

	#[test]
	fn test_known_eip155_transaction() {
		let raw = hex::decode(RAW_EIP155).unwrap();
		let envelope = Envelope::from_wire(&raw).unwrap();

		assert_eq!(envelope.tx_type(), TxType::Legacy);
		assert_eq!(envelope.chain_id(), U256::from(1));
		assert_eq!(envelope.nonce(), 9);
		assert_eq!(envelope.signature().v, U256::from(0x25));
		assert_eq!(
			envelope.tx_hash(),
			b256!("0x33469b22e9f636356c4160a87eb19df52b7412e8eac32a4a55ffe88ea8350788")
		);
		assert_eq!(
			envelope.recover_sender().unwrap(),
			address!("0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F")
		);
		assert_eq!(envelope.to_wire(), raw);
	}

	#[test]
	fn test_unsigned_legacy_marker_round_trip() {
		for chain_id in [1u64, 5, 137, 42161, 11155111] {
			let mut envelope = sample(TxType::Legacy, chain_id);
			envelope.set_signature(
				compute_legacy_v(27, U256::from(chain_id), true),
				U256::from(1),
				U256::from(1),
			);

			let generic = envelope.to_generic().unwrap();
			let back = Envelope::from_generic(&generic, None).unwrap();

			assert_eq!(back.chain_id(), U256::from(chain_id));
			assert!(back.signature().is_empty());
		}
	}

	#[test]
	fn test_unsigned_legacy_gets_marker_in_generic_form() {
		let envelope = sample(TxType::Legacy, 137);
		let TxEnvelope::Legacy(signed) = envelope.to_generic().unwrap() else {
			panic!("expected legacy");
		};
		assert_eq!(signed.tx().chain_id, Some(137));
		assert_eq!(signed.signature().r(), U256::from(1));
		assert_eq!(signed.signature().s(), U256::from(1));

		let back = Envelope::from_generic(&TxEnvelope::Legacy(signed), None).unwrap();
		assert_eq!(back, envelope);
	}

	#[test]
	fn test_signed_round_trip_through_wire() {
		for tx_type in [
			TxType::Legacy,
			TxType::AccessList,
			TxType::DynamicFee,
			TxType::Blob,
			TxType::SetCode,
		] {
			let mut envelope = sample(tx_type, 11155111);
			let signature = signer().sign_hash_sync(&envelope.signing_digest()).unwrap();
			envelope.apply_signature(SignOutcome::Signature(signature));

			let generic = envelope.to_generic().unwrap();
			assert_eq!(generic.encoded_2718(), envelope.to_wire(), "{:?}", tx_type);
			assert_eq!(*generic.tx_hash(), envelope.tx_hash(), "{:?}", tx_type);

			let decoded = Envelope::from_wire(&envelope.to_wire()).unwrap();
			assert_eq!(decoded, envelope, "{:?}", tx_type);
		}
	}

	#[test]
	fn test_fallback_chain_id_for_pre_eip155_legacy() {
		let tx = TxLegacy {
			chain_id: None,
			nonce: 1,
			gas_price: 10,
			gas_limit: 21_000,
			to: TxKind::Create,
			value: U256::ZERO,
			input: Bytes::new(),
		};
		let signed = tx.into_signed(Signature::new(U256::from(5), U256::from(6), true));
		let envelope =
			Envelope::from_generic(&TxEnvelope::Legacy(signed), Some(U256::from(10))).unwrap();

		assert_eq!(envelope.chain_id(), U256::from(10));
		assert_eq!(envelope.signature().v, U256::from(28));
		assert!(!envelope.is_eip155());
	}

	#[test]
	fn test_fee_overflow_is_reported() {
		let mut envelope = sample(TxType::DynamicFee, 1);
		envelope.set_max_fee_per_gas(U256::MAX);
		assert!(matches!(
			envelope.to_generic(),
			Err(EnvelopeError::FieldOverflow("max_fee_per_gas"))
		));
	}

	#[test]
	fn test_from_wire_rejects_garbage() {
		assert!(matches!(
			Envelope::from_wire(&[0x01, 0x02, 0x03]),
			Err(EnvelopeError::Decode(_))
		));
		let mut raw = hex::decode(RAW_EIP155).unwrap();
		raw.push(0);
		assert!(Envelope::from_wire(&raw).is_err());
	}
}
