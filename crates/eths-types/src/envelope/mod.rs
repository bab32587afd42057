//! Typed transaction envelope.
//!
//! An [`Envelope`] holds one transaction of any of the five EVM transaction
//! types (legacy, EIP-2930 access list, EIP-1559 dynamic fee, EIP-4844 blob
//! and EIP-7702 set code). Fields shared by every type live on the envelope
//! itself, while pricing and type specific fields live in [`TypedFields`], so
//! a field can only exist on the types that define it.
//!
//! Setters for type specific fields return `false` and leave the envelope
//! untouched when the field does not apply to the envelope's type.

mod encoding;
mod generic;
mod json;

use alloy_eips::eip4844::BlobTransactionSidecar;
use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::EnvelopeError;

pub use alloy_eips::eip2930::{AccessList, AccessListItem};
/// A signed EIP-7702 authorization tuple.
pub use alloy_eips::eip7702::SignedAuthorization as SetCodeAuthorization;

/// The EIP-2718 transaction type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
	Legacy = 0,
	AccessList = 1,
	DynamicFee = 2,
	Blob = 3,
	SetCode = 4,
}

impl TxType {
	/// Returns true for types priced with a tip and a fee cap.
	pub fn is_dynamic_fee(&self) -> bool {
		matches!(self, Self::DynamicFee | Self::Blob | Self::SetCode)
	}

	/// Returns true for types encoded with an EIP-2718 type prefix.
	pub fn is_typed(&self) -> bool {
		!matches!(self, Self::Legacy)
	}
}

impl TryFrom<u8> for TxType {
	type Error = EnvelopeError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(Self::Legacy),
			1 => Ok(Self::AccessList),
			2 => Ok(Self::DynamicFee),
			3 => Ok(Self::Blob),
			4 => Ok(Self::SetCode),
			other => Err(EnvelopeError::UnsupportedType(u64::from(other))),
		}
	}
}

impl From<TxType> for u8 {
	fn from(value: TxType) -> Self {
		value as u8
	}
}

/// Pricing and type specific fields of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedFields {
	Legacy {
		gas_price: U256,
	},
	AccessList {
		gas_price: U256,
		access_list: AccessList,
	},
	DynamicFee {
		max_priority_fee_per_gas: U256,
		max_fee_per_gas: U256,
		access_list: AccessList,
	},
	Blob {
		max_priority_fee_per_gas: U256,
		max_fee_per_gas: U256,
		access_list: AccessList,
		max_fee_per_blob_gas: U256,
		blob_versioned_hashes: Vec<B256>,
		/// Blobs, commitments and proofs. Only carried on the network form.
		sidecar: Option<BlobTransactionSidecar>,
	},
	SetCode {
		max_priority_fee_per_gas: U256,
		max_fee_per_gas: U256,
		access_list: AccessList,
		authorization_list: Vec<SetCodeAuthorization>,
	},
}

impl TypedFields {
	/// Zero valued fields for the given type.
	pub fn empty(tx_type: TxType) -> Self {
		match tx_type {
			TxType::Legacy => Self::Legacy {
				gas_price: U256::ZERO,
			},
			TxType::AccessList => Self::AccessList {
				gas_price: U256::ZERO,
				access_list: AccessList::default(),
			},
			TxType::DynamicFee => Self::DynamicFee {
				max_priority_fee_per_gas: U256::ZERO,
				max_fee_per_gas: U256::ZERO,
				access_list: AccessList::default(),
			},
			TxType::Blob => Self::Blob {
				max_priority_fee_per_gas: U256::ZERO,
				max_fee_per_gas: U256::ZERO,
				access_list: AccessList::default(),
				max_fee_per_blob_gas: U256::ZERO,
				blob_versioned_hashes: Vec::new(),
				sidecar: None,
			},
			TxType::SetCode => Self::SetCode {
				max_priority_fee_per_gas: U256::ZERO,
				max_fee_per_gas: U256::ZERO,
				access_list: AccessList::default(),
				authorization_list: Vec::new(),
			},
		}
	}

	/// The type these fields belong to.
	pub fn tx_type(&self) -> TxType {
		match self {
			Self::Legacy { .. } => TxType::Legacy,
			Self::AccessList { .. } => TxType::AccessList,
			Self::DynamicFee { .. } => TxType::DynamicFee,
			Self::Blob { .. } => TxType::Blob,
			Self::SetCode { .. } => TxType::SetCode,
		}
	}
}

/// The raw `(v, r, s)` triple stored on an envelope.
///
/// For legacy transactions `v` carries the EIP-155 value
/// `parity + 35 + 2 * chain_id`. For typed transactions it is the y-parity.
/// All zero means unsigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
	pub v: U256,
	pub r: U256,
	pub s: U256,
}

impl RawSignature {
	/// Returns true if no signature has been applied.
	pub fn is_empty(&self) -> bool {
		self.v.is_zero() && self.r.is_zero() && self.s.is_zero()
	}

	/// Returns true for the marker carried by unsigned legacy transactions
	/// across a generic conversion.
	pub fn is_unsigned_legacy_marker(&self) -> bool {
		!self.v.is_zero() && self.r == U256::from(1) && self.s == U256::from(1)
	}
}

/// What a signer produced for a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutcome {
	/// A recoverable secp256k1 signature.
	Signature(Signature),
	/// The signer observed the digest without signing it.
	NoSignature,
}

/// Computes the `v` value stored on an envelope for a signature parity.
///
/// `v` may be given as `0`/`1` or in the `27`/`28` convention. Legacy
/// transactions get the EIP-155 value, typed transactions the bare parity.
pub fn compute_legacy_v(v: u64, chain_id: U256, is_legacy: bool) -> U256 {
	let parity = if v >= 27 { v - 27 } else { v };
	if is_legacy {
		U256::from(parity) + U256::from(35) + chain_id * U256::from(2)
	} else {
		U256::from(parity)
	}
}

/// A transaction of one of the five EVM transaction types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
	chain_id: U256,
	nonce: u64,
	gas: u64,
	to: Option<Address>,
	value: U256,
	data: Bytes,
	fields: TypedFields,
	signature: RawSignature,
}

impl Envelope {
	/// Creates an empty, unsigned envelope of the given type.
	///
	/// Blob and set code transactions cannot create contracts, so their
	/// recipient starts as the zero address.
	pub fn new(tx_type: TxType, chain_id: U256) -> Self {
		let to = match tx_type {
			TxType::Blob | TxType::SetCode => Some(Address::ZERO),
			_ => None,
		};
		Self {
			chain_id,
			nonce: 0,
			gas: 0,
			to,
			value: U256::ZERO,
			data: Bytes::new(),
			fields: TypedFields::empty(tx_type),
			signature: RawSignature::default(),
		}
	}

	/// Creates an unsigned envelope around already populated typed fields.
	pub fn with_fields(chain_id: U256, fields: TypedFields) -> Self {
		let mut envelope = Self::new(fields.tx_type(), chain_id);
		envelope.fields = fields;
		envelope
	}

	pub fn tx_type(&self) -> TxType {
		self.fields.tx_type()
	}

	pub fn chain_id(&self) -> U256 {
		self.chain_id
	}

	pub fn nonce(&self) -> u64 {
		self.nonce
	}

	/// The gas limit.
	pub fn gas(&self) -> u64 {
		self.gas
	}

	/// The recipient, `None` for contract creation.
	pub fn to(&self) -> Option<Address> {
		self.to
	}

	pub fn value(&self) -> U256 {
		self.value
	}

	pub fn data(&self) -> &Bytes {
		&self.data
	}

	pub fn fields(&self) -> &TypedFields {
		&self.fields
	}

	pub fn signature(&self) -> &RawSignature {
		&self.signature
	}

	pub fn gas_price(&self) -> Option<U256> {
		match &self.fields {
			TypedFields::Legacy { gas_price } | TypedFields::AccessList { gas_price, .. } => {
				Some(*gas_price)
			}
			_ => None,
		}
	}

	pub fn max_priority_fee_per_gas(&self) -> Option<U256> {
		match &self.fields {
			TypedFields::DynamicFee {
				max_priority_fee_per_gas,
				..
			}
			| TypedFields::Blob {
				max_priority_fee_per_gas,
				..
			}
			| TypedFields::SetCode {
				max_priority_fee_per_gas,
				..
			} => Some(*max_priority_fee_per_gas),
			_ => None,
		}
	}

	pub fn max_fee_per_gas(&self) -> Option<U256> {
		match &self.fields {
			TypedFields::DynamicFee {
				max_fee_per_gas, ..
			}
			| TypedFields::Blob {
				max_fee_per_gas, ..
			}
			| TypedFields::SetCode {
				max_fee_per_gas, ..
			} => Some(*max_fee_per_gas),
			_ => None,
		}
	}

	pub fn access_list(&self) -> Option<&AccessList> {
		match &self.fields {
			TypedFields::Legacy { .. } => None,
			TypedFields::AccessList { access_list, .. }
			| TypedFields::DynamicFee { access_list, .. }
			| TypedFields::Blob { access_list, .. }
			| TypedFields::SetCode { access_list, .. } => Some(access_list),
		}
	}

	pub fn max_fee_per_blob_gas(&self) -> Option<U256> {
		match &self.fields {
			TypedFields::Blob {
				max_fee_per_blob_gas,
				..
			} => Some(*max_fee_per_blob_gas),
			_ => None,
		}
	}

	pub fn blob_versioned_hashes(&self) -> Option<&[B256]> {
		match &self.fields {
			TypedFields::Blob {
				blob_versioned_hashes,
				..
			} => Some(blob_versioned_hashes),
			_ => None,
		}
	}

	pub fn sidecar(&self) -> Option<&BlobTransactionSidecar> {
		match &self.fields {
			TypedFields::Blob { sidecar, .. } => sidecar.as_ref(),
			_ => None,
		}
	}

	pub fn authorization_list(&self) -> Option<&[SetCodeAuthorization]> {
		match &self.fields {
			TypedFields::SetCode {
				authorization_list,
				..
			} => Some(authorization_list),
			_ => None,
		}
	}

	pub fn set_chain_id(&mut self, chain_id: U256) {
		self.chain_id = chain_id;
	}

	pub fn set_nonce(&mut self, nonce: u64) {
		self.nonce = nonce;
	}

	/// Sets the gas limit.
	pub fn set_gas(&mut self, gas: u64) {
		self.gas = gas;
	}

	/// Sets the recipient. `None` means contract creation, except on blob and
	/// set code transactions where it becomes the zero address.
	pub fn set_to(&mut self, to: Option<Address>) {
		self.to = match (to, self.tx_type()) {
			(None, TxType::Blob | TxType::SetCode) => Some(Address::ZERO),
			(to, _) => to,
		};
	}

	pub fn set_value(&mut self, value: U256) {
		self.value = value;
	}

	pub fn set_data(&mut self, data: Bytes) {
		self.data = data;
	}

	/// Sets the gas price. Returns false on dynamic fee types.
	pub fn set_gas_price(&mut self, price: U256) -> bool {
		match &mut self.fields {
			TypedFields::Legacy { gas_price } | TypedFields::AccessList { gas_price, .. } => {
				*gas_price = price;
				true
			}
			_ => false,
		}
	}

	/// Sets the tip cap. Returns false on gas price types.
	pub fn set_max_priority_fee_per_gas(&mut self, tip: U256) -> bool {
		match &mut self.fields {
			TypedFields::DynamicFee {
				max_priority_fee_per_gas,
				..
			}
			| TypedFields::Blob {
				max_priority_fee_per_gas,
				..
			}
			| TypedFields::SetCode {
				max_priority_fee_per_gas,
				..
			} => {
				*max_priority_fee_per_gas = tip;
				true
			}
			_ => false,
		}
	}

	/// Sets the fee cap. Returns false on gas price types.
	pub fn set_max_fee_per_gas(&mut self, fee_cap: U256) -> bool {
		match &mut self.fields {
			TypedFields::DynamicFee {
				max_fee_per_gas, ..
			}
			| TypedFields::Blob {
				max_fee_per_gas, ..
			}
			| TypedFields::SetCode {
				max_fee_per_gas, ..
			} => {
				*max_fee_per_gas = fee_cap;
				true
			}
			_ => false,
		}
	}

	/// Sets the access list. Returns false on legacy transactions.
	pub fn set_access_list(&mut self, list: AccessList) -> bool {
		match &mut self.fields {
			TypedFields::Legacy { .. } => false,
			TypedFields::AccessList { access_list, .. }
			| TypedFields::DynamicFee { access_list, .. }
			| TypedFields::Blob { access_list, .. }
			| TypedFields::SetCode { access_list, .. } => {
				*access_list = list;
				true
			}
		}
	}

	pub fn set_max_fee_per_blob_gas(&mut self, fee_cap: U256) -> bool {
		match &mut self.fields {
			TypedFields::Blob {
				max_fee_per_blob_gas,
				..
			} => {
				*max_fee_per_blob_gas = fee_cap;
				true
			}
			_ => false,
		}
	}

	pub fn set_blob_versioned_hashes(&mut self, hashes: Vec<B256>) -> bool {
		match &mut self.fields {
			TypedFields::Blob {
				blob_versioned_hashes,
				..
			} => {
				*blob_versioned_hashes = hashes;
				true
			}
			_ => false,
		}
	}

	/// Attaches blob data. The sidecar only changes the wire form, never the
	/// signing digest or the transaction hash.
	pub fn set_sidecar(&mut self, blobs: Option<BlobTransactionSidecar>) -> bool {
		match &mut self.fields {
			TypedFields::Blob { sidecar, .. } => {
				*sidecar = blobs;
				true
			}
			_ => false,
		}
	}

	pub fn set_authorization_list(&mut self, list: Vec<SetCodeAuthorization>) -> bool {
		match &mut self.fields {
			TypedFields::SetCode {
				authorization_list,
				..
			} => {
				*authorization_list = list;
				true
			}
			_ => false,
		}
	}

	/// Stores a raw `(v, r, s)` triple as is.
	pub fn set_signature(&mut self, v: U256, r: U256, s: U256) {
		self.signature = RawSignature { v, r, s };
	}

	/// Stores the result of signing [`Envelope::signing_digest`].
	///
	/// Legacy transactions store the EIP-155 `v`. When the signer produced no
	/// signature, a legacy envelope gets the `(v, 1, 1)` marker so its chain
	/// id survives a generic conversion, and typed envelopes stay unsigned.
	pub fn apply_signature(&mut self, outcome: SignOutcome) {
		let is_legacy = self.tx_type() == TxType::Legacy;
		self.signature = match outcome {
			SignOutcome::Signature(sig) => RawSignature {
				v: compute_legacy_v(sig.v() as u64, self.chain_id, is_legacy),
				r: sig.r(),
				s: sig.s(),
			},
			SignOutcome::NoSignature if is_legacy => RawSignature {
				v: compute_legacy_v(27, self.chain_id, true),
				r: U256::from(1),
				s: U256::from(1),
			},
			SignOutcome::NoSignature => RawSignature::default(),
		};
	}

	/// Recovers the address that signed this envelope.
	pub fn recover_sender(&self) -> Result<Address, EnvelopeError> {
		if self.signature.is_empty() {
			return Err(EnvelopeError::InvalidSignature(
				"transaction is not signed".into(),
			));
		}
		let parity = self.y_parity()?;
		let signature = Signature::new(self.signature.r, self.signature.s, parity);
		signature
			.recover_address_from_prehash(&self.signing_digest())
			.map_err(|e| EnvelopeError::InvalidSignature(e.to_string()))
	}

	/// The y-parity encoded in the stored `v`.
	pub(crate) fn y_parity(&self) -> Result<bool, EnvelopeError> {
		let v = self.signature.v;
		let parity = if self.tx_type() != TxType::Legacy {
			v
		} else if v.is_zero() {
			U256::ZERO
		} else if v == U256::from(27) || v == U256::from(28) {
			v - U256::from(27)
		} else {
			let offset = U256::from(35) + self.chain_id * U256::from(2);
			v.checked_sub(offset).ok_or_else(|| {
				EnvelopeError::InvalidSignature(format!(
					"v {} does not match chain id {}",
					v, self.chain_id
				))
			})?
		};
		match parity {
			p if p.is_zero() => Ok(false),
			p if p == U256::from(1) => Ok(true),
			_ => Err(EnvelopeError::InvalidSignature(format!(
				"v {} is not a valid parity",
				v
			))),
		}
	}

	/// Returns true when a legacy envelope is hashed with replay protection.
	///
	/// Only a `v` of 27 or 28 marks a pre-EIP-155 signature.
	pub(crate) fn is_eip155(&self) -> bool {
		let v = self.signature.v;
		!(v == U256::from(27) || v == U256::from(28))
	}
}
