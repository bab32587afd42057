//! Canonical RLP encodings of an envelope.
//!
//! Every typed transaction is `type || rlp(fields)`, legacy transactions are
//! the bare RLP list. The signing pre-image uses the unsigned field list
//! (legacy appends `chain_id, 0, 0` under EIP-155), the canonical encoding
//! appends `v, r, s`. Blob transactions with a sidecar travel on the network
//! as `0x03 || rlp([fields, blobs, commitments, proofs])`.

use alloy_primitives::{keccak256, Address, TxKind, B256};
use alloy_rlp::{Encodable, Header};

use super::{Envelope, TxType, TypedFields};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Form {
	Signing,
	Signed,
}

fn encode_all(fields: &[&dyn Encodable], out: &mut Vec<u8>) {
	for field in fields {
		field.encode(out);
	}
}

fn wrap_list(payload: &[u8], out: &mut Vec<u8>) {
	Header {
		list: true,
		payload_length: payload.len(),
	}
	.encode(out);
	out.extend_from_slice(payload);
}

impl Envelope {
	/// The hash a signer signs for this envelope.
	pub fn signing_digest(&self) -> B256 {
		keccak256(self.encode_form(Form::Signing))
	}

	/// The transaction hash, as the node computes it.
	///
	/// The blob sidecar never contributes to the hash.
	pub fn tx_hash(&self) -> B256 {
		keccak256(self.encode_form(Form::Signed))
	}

	/// The canonical EIP-2718 encoding including the signature.
	pub fn encoded_2718(&self) -> Vec<u8> {
		self.encode_form(Form::Signed)
	}

	/// The bytes submitted through `eth_sendRawTransaction`.
	///
	/// Identical to [`Envelope::encoded_2718`] unless a blob sidecar is
	/// attached, in which case the network form is produced.
	pub fn to_wire(&self) -> Vec<u8> {
		let TypedFields::Blob {
			sidecar: Some(sidecar),
			..
		} = &self.fields
		else {
			return self.encoded_2718();
		};

		let mut inner = Vec::new();
		wrap_list(&self.payload(Form::Signed), &mut inner);

		let rest: [&dyn Encodable; 3] = [&sidecar.blobs, &sidecar.commitments, &sidecar.proofs];
		let mut payload = inner;
		encode_all(&rest, &mut payload);

		let mut out = vec![u8::from(TxType::Blob)];
		wrap_list(&payload, &mut out);
		out
	}

	fn encode_form(&self, form: Form) -> Vec<u8> {
		let mut out = Vec::new();
		let tx_type = self.tx_type();
		if tx_type.is_typed() {
			out.push(u8::from(tx_type));
		}
		wrap_list(&self.payload(form), &mut out);
		out
	}

	fn tx_kind(&self) -> TxKind {
		match self.to {
			Some(address) => TxKind::Call(address),
			None => TxKind::Create,
		}
	}

	fn payload(&self, form: Form) -> Vec<u8> {
		let mut out = Vec::new();
		let kind = self.tx_kind();
		let to = self.to.unwrap_or(Address::ZERO);

		match &self.fields {
			TypedFields::Legacy { gas_price } => {
				let fields: [&dyn Encodable; 6] = [
					&self.nonce,
					gas_price,
					&self.gas,
					&kind,
					&self.value,
					&self.data,
				];
				encode_all(&fields, &mut out);
				if form == Form::Signing {
					if self.is_eip155() {
						let replay: [&dyn Encodable; 3] = [&self.chain_id, &0u8, &0u8];
						encode_all(&replay, &mut out);
					}
					return out;
				}
			}
			TypedFields::AccessList {
				gas_price,
				access_list,
			} => {
				let fields: [&dyn Encodable; 8] = [
					&self.chain_id,
					&self.nonce,
					gas_price,
					&self.gas,
					&kind,
					&self.value,
					&self.data,
					access_list,
				];
				encode_all(&fields, &mut out);
			}
			TypedFields::DynamicFee {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
			} => {
				let fields: [&dyn Encodable; 9] = [
					&self.chain_id,
					&self.nonce,
					max_priority_fee_per_gas,
					max_fee_per_gas,
					&self.gas,
					&kind,
					&self.value,
					&self.data,
					access_list,
				];
				encode_all(&fields, &mut out);
			}
			TypedFields::Blob {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
				max_fee_per_blob_gas,
				blob_versioned_hashes,
				..
			} => {
				let fields: [&dyn Encodable; 11] = [
					&self.chain_id,
					&self.nonce,
					max_priority_fee_per_gas,
					max_fee_per_gas,
					&self.gas,
					&to,
					&self.value,
					&self.data,
					access_list,
					max_fee_per_blob_gas,
					blob_versioned_hashes,
				];
				encode_all(&fields, &mut out);
			}
			TypedFields::SetCode {
				max_priority_fee_per_gas,
				max_fee_per_gas,
				access_list,
				authorization_list,
			} => {
				let fields: [&dyn Encodable; 10] = [
					&self.chain_id,
					&self.nonce,
					max_priority_fee_per_gas,
					max_fee_per_gas,
					&self.gas,
					&to,
					&self.value,
					&self.data,
					access_list,
					authorization_list,
				];
				encode_all(&fields, &mut out);
			}
		}

		if form == Form::Signed {
			let signature: [&dyn Encodable; 3] =
				[&self.signature.v, &self.signature.r, &self.signature.s];
			encode_all(&signature, &mut out);
		}
		out
	}
}
