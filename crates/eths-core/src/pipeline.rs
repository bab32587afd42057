//! Submission pipeline.
//!
//! [`CallManager`] bundles the gas, nonce and validation sources of a chain
//! and runs the builder, signs with the configured account, optionally hands
//! the signed envelope to a hook and broadcasts it.

use crate::balance::{BalanceChecker, DefaultBalanceChecker};
use crate::builder::{CheckOptions, TxBuilder};
use crate::gas::{
	DefaultGasEstimator, DefaultGasOracle, DefaultGasValidator, GasEstimator, GasOracle,
	GasValidator,
};
use crate::nonce::{ChainNonceSource, NonceSource};
use eths_account::AccountService;
use eths_config::Config;
use eths_delivery::{Cancellation, DeliveryService, RpcInterface};
use eths_types::{Address, Bytes, Envelope, GasQuote, TxError, U256};
use std::sync::Arc;
use tracing::instrument;

/// Hook run on the signed envelope before it is broadcast.
pub type BeforeSend<'a> = &'a (dyn Fn(&Envelope) -> Result<(), String> + Send + Sync);

/// Gas, nonce and validation sources used by the pipeline.
pub struct CallManager {
	chain_id: U256,
	delivery: DeliveryService,
	gas_oracle: Arc<dyn GasOracle>,
	gas_validator: Option<Arc<dyn GasValidator>>,
	gas_estimator: Arc<dyn GasEstimator>,
	nonce_source: Arc<dyn NonceSource>,
	balance_checker: Option<Arc<dyn BalanceChecker>>,
	check_options: CheckOptions,
}

impl CallManager {
	/// Creates a manager whose sources all query `rpc`.
	pub fn new_default(rpc: Arc<dyn RpcInterface>, chain_id: U256) -> Self {
		Self {
			chain_id,
			delivery: DeliveryService::new(rpc.clone()),
			gas_oracle: Arc::new(DefaultGasOracle::new(rpc.clone())),
			gas_validator: Some(Arc::new(DefaultGasValidator::new(rpc.clone()))),
			gas_estimator: Arc::new(DefaultGasEstimator::new(rpc.clone())),
			nonce_source: Arc::new(ChainNonceSource::new(rpc)),
			balance_checker: None,
			check_options: CheckOptions::default(),
		}
	}

	/// Creates a default manager tuned by `config`, with the balance
	/// preflight enabled under the configured intrinsic gas rules.
	pub fn from_config(rpc: Arc<dyn RpcInterface>, chain_id: U256, config: &Config) -> Self {
		let oracle = DefaultGasOracle::new(rpc.clone())
			.with_base_fee_wiggle_multiplier(config.gas.base_fee_wiggle_multiplier);
		let validator = DefaultGasValidator::new(rpc.clone())
			.with_min_fee_ratio(config.gas.min_fee_numerator, config.gas.min_fee_denominator);
		let delivery = DeliveryService::new(rpc.clone()).with_polling(
			config.confirmation.retry_times,
			config.confirmation.poll_interval(),
		);

		let balance =
			DefaultBalanceChecker::new(rpc.clone()).with_rules(config.intrinsic_gas_rules());

		Self {
			delivery,
			gas_oracle: Arc::new(oracle),
			gas_validator: Some(Arc::new(validator)),
			balance_checker: Some(Arc::new(balance)),
			check_options: CheckOptions {
				strict: config.preflight.strict,
			},
			..Self::new_default(rpc, chain_id)
		}
	}

	pub fn with_gas_oracle(mut self, oracle: Arc<dyn GasOracle>) -> Self {
		self.gas_oracle = oracle;
		self
	}

	/// Replaces the validator. `None` skips gas price validation.
	pub fn with_gas_validator(mut self, validator: Option<Arc<dyn GasValidator>>) -> Self {
		self.gas_validator = validator;
		self
	}

	pub fn with_gas_estimator(mut self, estimator: Arc<dyn GasEstimator>) -> Self {
		self.gas_estimator = estimator;
		self
	}

	pub fn with_nonce_source(mut self, source: Arc<dyn NonceSource>) -> Self {
		self.nonce_source = source;
		self
	}

	/// Runs a balance preflight before the recipient checks.
	pub fn with_balance_checker(mut self, checker: Arc<dyn BalanceChecker>) -> Self {
		self.balance_checker = Some(checker);
		self
	}

	pub fn with_check_options(mut self, options: CheckOptions) -> Self {
		self.check_options = options;
		self
	}

	pub fn chain_id(&self) -> U256 {
		self.chain_id
	}

	pub fn delivery(&self) -> &DeliveryService {
		&self.delivery
	}

	/// Runs every builder step up to and including the checks.
	async fn prepare(
		&self,
		builder: TxBuilder,
		to: Address,
		data: Bytes,
		value: U256,
		to_is_contract: bool,
		validate: bool,
	) -> TxBuilder {
		let mut builder = builder
			.set_to(Some(to), to_is_contract)
			.set_value(value)
			.set_data(data)
			.set_nonce_by(self.nonce_source.as_ref())
			.await
			.set_gas_price_by(self.gas_oracle.as_ref())
			.await
			.set_gas_limit_by(self.gas_estimator.as_ref())
			.await;
		if let Some(checker) = &self.balance_checker {
			builder = builder.balance_check(checker.as_ref()).await;
		}
		let validator = if validate {
			self.gas_validator.as_deref()
		} else {
			None
		};
		builder
			.check(self.delivery.rpc().as_ref(), validator, self.check_options)
			.await
	}

	/// Builds, signs and broadcasts a contract call.
	pub async fn send_tx(
		&self,
		account: &AccountService,
		to: Address,
		data: Bytes,
		before_send: Option<BeforeSend<'_>>,
	) -> Result<Envelope, TxError> {
		self.send_tx_e(account, to, data, U256::ZERO, true, before_send, false)
			.await
	}

	/// Builds and signs a contract call without broadcasting it.
	pub async fn no_send_tx(
		&self,
		account: &AccountService,
		to: Address,
		data: Bytes,
	) -> Result<Envelope, TxError> {
		self.send_tx_e(account, to, data, U256::ZERO, true, None, true)
			.await
	}

	/// Full form of [`CallManager::send_tx`].
	///
	/// `to_is_contract` rejects recipients without code. With `no_send` the
	/// signed envelope is returned without being broadcast.
	#[allow(clippy::too_many_arguments)]
	#[instrument(skip_all, fields(chain_id = %self.chain_id, to = %to, no_send = no_send))]
	pub async fn send_tx_e(
		&self,
		account: &AccountService,
		to: Address,
		data: Bytes,
		value: U256,
		to_is_contract: bool,
		before_send: Option<BeforeSend<'_>>,
		no_send: bool,
	) -> Result<Envelope, TxError> {
		let builder = TxBuilder::new(self.chain_id).set_from_by_pubkey(&account.public_key());
		let builder = self
			.prepare(builder, to, data, value, to_is_contract, true)
			.await;
		send_tx_builder(builder, account, &self.delivery, no_send, before_send).await
	}

	/// Runs the builder without validator and returns the gas quote and
	/// limit a transaction from `from` would use.
	#[instrument(skip_all, fields(chain_id = %self.chain_id, from = %from, to = %to))]
	pub async fn estimate_tx(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
		value: U256,
		to_is_contract: bool,
	) -> Result<(GasQuote, u64), TxError> {
		let builder = TxBuilder::new(self.chain_id).set_from(from);
		let builder = self
			.prepare(builder, to, data, value, to_is_contract, false)
			.await;
		if let Some(err) = builder.error() {
			return Err(err.clone());
		}
		match (builder.gas_quote(), builder.gas_limit()) {
			(Some(quote), Some(gas_limit)) => Ok((quote.clone(), gas_limit)),
			(None, _) => Err(TxError::MissingRequiredField("gas price is required")),
			(_, None) => Err(TxError::MissingRequiredField("gas limit is required")),
		}
	}

	/// Sends a contract call and waits for `confirmations` blocks on top of it.
	pub async fn send_tx_and_wait(
		&self,
		account: &AccountService,
		to: Address,
		data: Bytes,
		confirmations: u64,
		before_send: Option<BeforeSend<'_>>,
		cancel: &Cancellation,
	) -> Result<Envelope, TxError> {
		let envelope = self.send_tx(account, to, data, before_send).await?;
		self.delivery
			.wait(envelope.tx_hash(), confirmations, cancel)
			.await?;
		Ok(envelope)
	}
}

/// Builds the envelope from `builder`, signs it and broadcasts it.
///
/// The sender is set from the account's public key. The hook runs on the
/// signed envelope; a rejection aborts before anything is sent.
pub async fn send_tx_builder(
	builder: TxBuilder,
	account: &AccountService,
	delivery: &DeliveryService,
	no_send: bool,
	before_send: Option<BeforeSend<'_>>,
) -> Result<Envelope, TxError> {
	let mut envelope = builder.set_from_by_pubkey(&account.public_key()).build()?;
	account
		.sign_envelope(&mut envelope)
		.await
		.map_err(|e| TxError::Signing(e.to_string()))?;

	if let Some(hook) = before_send {
		hook(&envelope).map_err(TxError::BeforeSend)?;
	}
	if no_send {
		tracing::debug!(tx_hash = %envelope.tx_hash(), "Signed transaction without sending");
		return Ok(envelope);
	}
	delivery.submit(&envelope).await?;
	Ok(envelope)
}
