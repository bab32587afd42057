//! Transaction builder.
//!
//! The builder assembles an [`Envelope`] step by step. The first failing
//! step latches its error and every later step becomes a no-op, so a chain
//! of calls can be checked once at the end:
//!
//! ```ignore
//! let envelope = TxBuilder::new(chain_id)
//!     .set_from(from)
//!     .set_to(Some(token), true)
//!     .set_data(calldata)
//!     .set_nonce_by(&nonces).await
//!     .set_gas_price_by(&oracle).await
//!     .set_gas_limit_by(&estimator).await
//!     .check(rpc.as_ref(), Some(&validator), CheckOptions::default()).await
//!     .build()?;
//! ```

use crate::balance::BalanceChecker;
use crate::gas::{GasEstimator, GasOracle, GasValidator};
use crate::nonce::NonceSource;
use eths_delivery::RpcInterface;
use eths_types::{Address, Bytes, CallMessage, Envelope, GasQuote, TxError, TxType, U256};
use k256::ecdsa::VerifyingKey;

/// Options of [`TxBuilder::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
	/// Fetch the recipient's code even when it is not required to be a
	/// contract, and reject contract calls without calldata.
	pub strict: bool,
}

impl Default for CheckOptions {
	fn default() -> Self {
		Self { strict: true }
	}
}

/// First-error-wins transaction assembler.
#[derive(Debug, Clone)]
pub struct TxBuilder {
	chain_id: U256,
	from: Option<Address>,
	to: Option<Address>,
	must_be_contract: bool,
	data: Bytes,
	value: U256,
	nonce: Option<u64>,
	gas_quote: Option<GasQuote>,
	gas_limit: Option<u64>,
	err: Option<TxError>,
}

impl TxBuilder {
	pub fn new(chain_id: U256) -> Self {
		Self {
			chain_id,
			from: None,
			to: None,
			must_be_contract: false,
			data: Bytes::new(),
			value: U256::ZERO,
			nonce: None,
			gas_quote: None,
			gas_limit: None,
			err: None,
		}
	}

	/// The latched error, if any step failed.
	pub fn error(&self) -> Option<&TxError> {
		self.err.as_ref()
	}

	pub fn chain_id(&self) -> U256 {
		self.chain_id
	}

	pub fn from(&self) -> Option<Address> {
		self.from
	}

	pub fn nonce(&self) -> Option<u64> {
		self.nonce
	}

	pub fn gas_quote(&self) -> Option<&GasQuote> {
		self.gas_quote.as_ref()
	}

	pub fn gas_limit(&self) -> Option<u64> {
		self.gas_limit
	}

	fn update(mut self, f: impl FnOnce(&mut Self)) -> Self {
		if self.err.is_none() {
			f(&mut self);
		}
		self
	}

	fn fail(mut self, err: TxError) -> Self {
		self.err = Some(err);
		self
	}

	fn require_from(&self) -> Result<Address, TxError> {
		self.from
			.ok_or(TxError::MissingRequiredField("from is required"))
	}

	fn require_quote(&self) -> Result<&GasQuote, TxError> {
		self.require_from()?;
		self.gas_quote
			.as_ref()
			.ok_or(TxError::MissingRequiredField("gas price is required"))
	}

	/// Fields needed before gas can be estimated.
	fn require_priced(&self) -> Result<(), TxError> {
		self.require_quote()?;
		if self.nonce.is_none() {
			return Err(TxError::MissingRequiredField("nonce is required"));
		}
		Ok(())
	}

	pub fn set_from(self, from: Address) -> Self {
		self.update(|b| b.from = Some(from))
	}

	/// Sets the sender to the address of `key`.
	pub fn set_from_by_pubkey(self, key: &VerifyingKey) -> Self {
		let from = alloy_signer::utils::public_key_to_address(key);
		self.set_from(from)
	}

	/// Sets the recipient. `None` deploys a contract.
	///
	/// With `must_be_contract`, [`TxBuilder::check`] rejects a recipient
	/// without code.
	pub fn set_to(self, to: Option<Address>, must_be_contract: bool) -> Self {
		self.update(|b| {
			b.to = to;
			b.must_be_contract = must_be_contract;
		})
	}

	pub fn set_data(self, data: Bytes) -> Self {
		self.update(|b| b.data = data)
	}

	pub fn set_value(self, value: U256) -> Self {
		self.update(|b| b.value = value)
	}

	pub fn set_nonce(self, nonce: u64) -> Self {
		self.update(|b| b.nonce = Some(nonce))
	}

	/// Fetches the pending nonce of the sender.
	pub async fn set_nonce_by(self, source: &dyn NonceSource) -> Self {
		if self.err.is_some() {
			return self;
		}
		let from = match self.require_from() {
			Ok(from) => from,
			Err(e) => return self.fail(e),
		};
		match source.next(from, true).await {
			Ok(nonce) => self.set_nonce(nonce),
			Err(e) => self.fail(e.context("failed to get nonce from chain")),
		}
	}

	pub fn set_gas_price(self, quote: GasQuote) -> Self {
		self.update(|b| b.gas_quote = Some(quote))
	}

	pub async fn set_gas_price_by(self, oracle: &dyn GasOracle) -> Self {
		if self.err.is_some() {
			return self;
		}
		match oracle.quote(self.chain_id).await {
			Ok(quote) => self.set_gas_price(quote),
			Err(e) => self.fail(e),
		}
	}

	pub fn set_gas_limit(self, gas_limit: u64) -> Self {
		self.update(|b| b.gas_limit = Some(gas_limit))
	}

	/// Estimates the gas limit from the fields set so far.
	///
	/// Every estimation failure is wrapped in [`TxError::EstimateGas`];
	/// [`TxError::insufficient_balance`] finds missing funds inside it.
	pub async fn set_gas_limit_by(self, estimator: &dyn GasEstimator) -> Self {
		if self.err.is_some() {
			return self;
		}
		if let Err(e) = self.require_priced() {
			return self.fail(e);
		}
		let msg = self.call_message();
		match estimator.estimate(self.chain_id, &msg).await {
			Ok(gas_limit) => self.set_gas_limit(gas_limit),
			Err(e) => self.fail(TxError::EstimateGas(Box::new(e))),
		}
	}

	fn call_message(&self) -> CallMessage {
		let msg = CallMessage::new(
			self.from.unwrap_or_default(),
			self.to,
			self.data.clone(),
			self.value,
		);
		match &self.gas_quote {
			Some(quote) => msg.with_quote(quote),
			None => msg,
		}
	}

	/// Checks that the sender holds funds and, once a gas price is set, that
	/// they cover the intrinsic gas.
	pub async fn balance_check(self, checker: &dyn BalanceChecker) -> Self {
		if self.err.is_some() {
			return self;
		}
		let from = match self.require_from() {
			Ok(from) => from,
			Err(e) => return self.fail(e),
		};
		let checked = checker
			.check_balance(from, &self.data, self.to, self.gas_quote.as_ref())
			.await;
		match checked {
			Ok(()) => self,
			Err(e) => self.fail(e),
		}
	}

	/// Checks the recipient's code and, when given, the gas quote.
	pub async fn check(
		self,
		rpc: &dyn RpcInterface,
		validator: Option<&dyn GasValidator>,
		options: CheckOptions,
	) -> Self {
		if self.err.is_some() {
			return self;
		}

		if let Some(to) = self.to {
			if self.must_be_contract || options.strict {
				let code = match rpc.pending_code_at(to).await {
					Ok(code) => code,
					Err(e) => return self.fail(e.into()),
				};
				if self.must_be_contract && code.is_empty() {
					return self.fail(TxError::NoCode);
				}
				if options.strict && !code.is_empty() && self.data.is_empty() {
					return self.fail(TxError::ContractCallEmptyData);
				}
			}
		}

		if let Some(validator) = validator {
			let quote = match self.require_quote().cloned() {
				Ok(quote) => quote,
				Err(e) => return self.fail(e),
			};
			if let Err(e) = validator.validate(self.chain_id, &quote).await {
				return self.fail(e);
			}
		}
		self
	}

	/// Builds a legacy or dynamic fee envelope depending on the gas quote.
	pub fn build(&self) -> Result<Envelope, TxError> {
		let tx_type = match self.gas_quote {
			Some(GasQuote::Dynamic { .. }) => TxType::DynamicFee,
			_ => TxType::Legacy,
		};
		self.build_tx(tx_type)
	}

	/// Builds an envelope of `tx_type`.
	///
	/// Returns the latched error first, then the first missing field.
	pub fn build_tx(&self, tx_type: TxType) -> Result<Envelope, TxError> {
		if let Some(err) = &self.err {
			return Err(err.clone());
		}
		let quote = self.require_quote()?;
		let nonce = self
			.nonce
			.ok_or(TxError::MissingRequiredField("nonce is required"))?;
		let gas_limit = self
			.gas_limit
			.ok_or(TxError::MissingRequiredField("gas limit is required"))?;

		let mut envelope = Envelope::new(tx_type, self.chain_id);
		match (tx_type.is_dynamic_fee(), quote) {
			(
				true,
				GasQuote::Dynamic {
					max_priority_fee_per_gas,
					max_fee_per_gas,
					..
				},
			) => {
				envelope.set_max_priority_fee_per_gas(*max_priority_fee_per_gas);
				envelope.set_max_fee_per_gas(*max_fee_per_gas);
			}
			(true, _) => {
				return Err(TxError::MissingRequiredField(
					"dynamic gas price is required",
				))
			}
			(false, GasQuote::Legacy { gas_price }) => {
				envelope.set_gas_price(*gas_price);
			}
			(false, _) => {
				return Err(TxError::MissingRequiredField(
					"legacy gas price is required",
				))
			}
		}
		envelope.set_to(self.to);
		envelope.set_value(self.value);
		envelope.set_data(self.data.clone());
		envelope.set_nonce(nonce);
		envelope.set_gas(gas_limit);
		Ok(envelope)
	}
}

#[cfg(test)]
mod tests;
