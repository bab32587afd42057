//! Configuration module for the eths transaction toolkit.
//!
//! This module provides the tunables of the submission pipeline: the gas
//! oracle wiggle, the validator's fee floor, the intrinsic gas rules used by
//! the balance preflight, the confirmation waiter budget and the local
//! signing key. Configuration is loaded from TOML and validated after
//! parsing. Values are taken as written; nothing is read from the process
//! environment.

use eths_types::{IntrinsicGasRules, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
///
/// Every section is optional in the TOML source and falls back to the
/// defaults used for Ethereum mainnet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
	/// Gas pricing policy.
	#[serde(default)]
	pub gas: GasConfig,
	/// Protocol rules for the intrinsic gas of the balance preflight.
	#[serde(default)]
	pub intrinsic_gas: IntrinsicGasConfig,
	/// Receipt polling budget.
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	/// Recipient checks run before signing.
	#[serde(default)]
	pub preflight: PreflightConfig,
	/// Local signing account.
	#[serde(default)]
	pub account: Option<AccountConfig>,
}

/// Gas pricing policy shared by the oracle and the validator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GasConfig {
	/// Fee cap is `tip + multiplier * base_fee`.
	#[serde(default = "default_base_fee_wiggle_multiplier")]
	pub base_fee_wiggle_multiplier: u64,
	/// Numerator of the minimum fee ratio applied to the base fee.
	#[serde(default = "default_min_fee_numerator")]
	pub min_fee_numerator: u64,
	/// Denominator of the minimum fee ratio applied to the base fee.
	#[serde(default = "default_min_fee_denominator")]
	pub min_fee_denominator: u64,
}

impl Default for GasConfig {
	fn default() -> Self {
		Self {
			base_fee_wiggle_multiplier: default_base_fee_wiggle_multiplier(),
			min_fee_numerator: default_min_fee_numerator(),
			min_fee_denominator: default_min_fee_denominator(),
		}
	}
}

fn default_base_fee_wiggle_multiplier() -> u64 {
	2
}

fn default_min_fee_numerator() -> u64 {
	6
}

fn default_min_fee_denominator() -> u64 {
	5
}

/// Protocol rules for intrinsic gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IntrinsicGasConfig {
	#[serde(default = "default_true")]
	pub homestead: bool,
	/// EIP-2028 calldata pricing.
	#[serde(default = "default_true")]
	pub istanbul: bool,
	/// EIP-3860 initcode metering.
	#[serde(default = "default_true")]
	pub shanghai: bool,
}

impl Default for IntrinsicGasConfig {
	fn default() -> Self {
		Self {
			homestead: true,
			istanbul: true,
			shanghai: true,
		}
	}
}

impl From<&IntrinsicGasConfig> for IntrinsicGasRules {
	fn from(config: &IntrinsicGasConfig) -> Self {
		Self {
			homestead: config.homestead,
			istanbul: config.istanbul,
			shanghai: config.shanghai,
		}
	}
}

fn default_true() -> bool {
	true
}

/// Receipt polling budget of the confirmation waiter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	/// Receipt lookups before giving up on a missing receipt.
	#[serde(default = "default_retry_times")]
	pub retry_times: u32,
	/// Seconds between receipt and block number polls.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

impl ConfirmationConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			retry_times: default_retry_times(),
			poll_interval_seconds: default_poll_interval_seconds(),
		}
	}
}

fn default_retry_times() -> u32 {
	10
}

fn default_poll_interval_seconds() -> u64 {
	3
}

/// Checks run against the recipient before signing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreflightConfig {
	/// Rejects calls with empty calldata to addresses that hold code.
	#[serde(default = "default_true")]
	pub strict: bool,
}

impl Default for PreflightConfig {
	fn default() -> Self {
		Self { strict: true }
	}
}

/// Local signing account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex encoded secp256k1 private key.
	pub private_key: SecretString,
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Validates the configuration.
	///
	/// Rejects a zero wiggle multiplier, a minimum fee ratio below one or
	/// with a zero denominator, a zero retry budget, a zero poll interval
	/// and an empty private key.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.gas.base_fee_wiggle_multiplier == 0 {
			return Err(ConfigError::Validation(
				"gas.base_fee_wiggle_multiplier must be greater than 0".into(),
			));
		}
		if self.gas.min_fee_denominator == 0 {
			return Err(ConfigError::Validation(
				"gas.min_fee_denominator must be greater than 0".into(),
			));
		}
		if self.gas.min_fee_numerator < self.gas.min_fee_denominator {
			return Err(ConfigError::Validation(format!(
				"gas.min_fee_numerator ({}) must not be lower than gas.min_fee_denominator ({})",
				self.gas.min_fee_numerator, self.gas.min_fee_denominator
			)));
		}
		if self.confirmation.retry_times == 0 {
			return Err(ConfigError::Validation(
				"confirmation.retry_times must be greater than 0".into(),
			));
		}
		if self.confirmation.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"confirmation.poll_interval_seconds must be greater than 0".into(),
			));
		}
		if let Some(account) = &self.account {
			if account.private_key.is_empty() {
				return Err(ConfigError::Validation(
					"account.private_key cannot be empty".into(),
				));
			}
		}
		Ok(())
	}

	/// Intrinsic gas rules for the balance preflight.
	pub fn intrinsic_gas_rules(&self) -> IntrinsicGasRules {
		IntrinsicGasRules::from(&self.intrinsic_gas)
	}
}

/// The configuration is validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}
