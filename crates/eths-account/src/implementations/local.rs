//! Local private key account.
//!
//! Signs digests in process with a secp256k1 key held by an alloy
//! `PrivateKeySigner`.

use crate::{AccountError, AccountInterface, SignOutcome};
use alloy_primitives::{Address, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use eths_types::SecretString;
use k256::ecdsa::VerifyingKey;

/// Account backed by a private key held in memory.
pub struct LocalAccount {
	/// The underlying signer.
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Creates a new LocalAccount from a signer.
	pub fn new(signer: PrivateKeySigner) -> Self {
		Self { signer }
	}

	/// Creates a new LocalAccount from a hex encoded private key.
	///
	/// The key may carry a `0x` prefix.
	pub fn from_secret(private_key: &SecretString) -> Result<Self, AccountError> {
		if private_key.is_empty() {
			return Err(AccountError::InvalidKey("private key is empty".to_string()));
		}
		let signer = private_key.with_exposed(|key| {
			key.trim()
				.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(e.to_string()))
		})?;
		Ok(Self::new(signer))
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn public_key(&self) -> VerifyingKey {
		*self.signer.credential().verifying_key()
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_hash(&self, digest: &B256) -> Result<SignOutcome, AccountError> {
		let signature = self
			.signer
			.sign_hash(digest)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(SignOutcome::Signature(signature))
	}
}
