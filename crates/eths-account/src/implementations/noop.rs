//! Observe-only account.
//!
//! Never signs. Every digest it is asked to sign can be forwarded to a
//! channel, which lets an external signer pick up the pre-image of a
//! transaction built by the pipeline.

use crate::{AccountError, AccountInterface, SignOutcome};
use alloy_primitives::B256;
use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use tokio::sync::mpsc;

/// Account that returns [`SignOutcome::NoSignature`] for every digest.
pub struct NoOpAccount {
	public_key: VerifyingKey,
	digests: Option<mpsc::UnboundedSender<B256>>,
}

impl NoOpAccount {
	/// Creates an account for the holder of `public_key`.
	pub fn new(public_key: VerifyingKey) -> Self {
		Self {
			public_key,
			digests: None,
		}
	}

	/// Forwards every observed digest to `sink`.
	pub fn with_digest_sink(mut self, sink: mpsc::UnboundedSender<B256>) -> Self {
		self.digests = Some(sink);
		self
	}
}

#[async_trait]
impl AccountInterface for NoOpAccount {
	fn public_key(&self) -> VerifyingKey {
		self.public_key
	}

	async fn sign_hash(&self, digest: &B256) -> Result<SignOutcome, AccountError> {
		if let Some(sink) = &self.digests {
			if sink.send(*digest).is_err() {
				tracing::debug!(digest = %digest, "Digest receiver dropped");
			}
		}
		Ok(SignOutcome::NoSignature)
	}
}
