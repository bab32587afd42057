//! Account management for the eths transaction toolkit.
//!
//! This module defines the signing capability the submission pipeline relies
//! on. An account exposes its public key and signs 32-byte digests; the
//! no-op account observes digests without signing them so an external
//! co-signer can produce the signature.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use eths_types::Envelope;
use k256::ecdsa::VerifyingKey;
use thiserror::Error;

pub use eths_types::SignOutcome;

/// Re-export implementations
pub mod implementations {
	pub mod local;
	pub mod noop;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations must be safe to share across tasks; the pipeline performs
/// no locking around them.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the public key of the account.
	fn public_key(&self) -> VerifyingKey;

	/// Retrieves the address associated with this account.
	///
	/// Defaults to the address derived from [`AccountInterface::public_key`].
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(alloy_signer::utils::public_key_to_address(
			&self.public_key(),
		))
	}

	/// Signs a 32-byte digest.
	///
	/// Returns [`SignOutcome::NoSignature`] when the implementation only
	/// observes the digest.
	async fn sign_hash(&self, digest: &B256) -> Result<SignOutcome, AccountError>;
}

/// Service that manages account operations.
///
/// This struct provides a high-level interface for account management,
/// wrapping an underlying account implementation.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address associated with the managed account.
	pub async fn address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Returns the public key of the managed account.
	pub fn public_key(&self) -> VerifyingKey {
		self.implementation.public_key()
	}

	/// Signs a digest with the managed account.
	pub async fn sign_hash(&self, digest: &B256) -> Result<SignOutcome, AccountError> {
		self.implementation.sign_hash(digest).await
	}

	/// Signs the envelope's signing digest and stores the result on it.
	pub async fn sign_envelope(&self, envelope: &mut Envelope) -> Result<(), AccountError> {
		let digest = envelope.signing_digest();
		let outcome = self.implementation.sign_hash(&digest).await?;
		envelope.apply_signature(outcome);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::local::LocalAccount;
	use crate::implementations::noop::NoOpAccount;
	use eths_types::{SecretString, TxType, U256};

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn local() -> LocalAccount {
		LocalAccount::from_secret(&SecretString::from(TEST_KEY)).unwrap()
	}

	#[tokio::test]
	async fn test_sign_envelope_recovers_to_account() {
		let service = AccountService::new(Box::new(local()));
		let address = service.address().await.unwrap();

		for tx_type in [TxType::Legacy, TxType::DynamicFee, TxType::SetCode] {
			let mut envelope = Envelope::new(tx_type, U256::from(137));
			envelope.set_nonce(1);
			envelope.set_gas(21_000);
			service.sign_envelope(&mut envelope).await.unwrap();
			assert_eq!(envelope.recover_sender().unwrap(), address);
		}
	}

	#[tokio::test]
	async fn test_default_address_matches_signer() {
		let account = local();
		let service = AccountService::new(Box::new(NoOpAccount::new(account.public_key())));
		assert_eq!(
			service.address().await.unwrap(),
			account.address().await.unwrap()
		);
	}

	#[tokio::test]
	async fn test_noop_leaves_legacy_marker() {
		let account = local();
		let service = AccountService::new(Box::new(NoOpAccount::new(account.public_key())));

		let mut envelope = Envelope::new(TxType::Legacy, U256::from(1));
		service.sign_envelope(&mut envelope).await.unwrap();
		assert!(envelope.signature().is_unsigned_legacy_marker());
		assert_eq!(envelope.signature().v, U256::from(37));
	}

	#[test]
	fn test_error_kinds() {
		let kind = |err: &AccountError| match err {
			AccountError::SigningFailed(_) => "signing",
			AccountError::InvalidKey(_) => "key",
		};
		let err = LocalAccount::from_secret(&SecretString::from("")).err().unwrap();
		assert_eq!(kind(&err), "key");
		assert_eq!(err.to_string(), "Invalid key: private key is empty");
	}
}
