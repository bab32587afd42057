//! Transaction construction and submission for the eths toolkit.
//!
//! The builder turns a contract invocation into a complete envelope using
//! pluggable gas, nonce and preflight sources. [`CallManager`] wires the
//! default sources to a node and runs the whole pipeline: build, sign,
//! optional hook, broadcast and optional confirmation wait.

pub mod balance;
pub mod builder;
pub mod gas;
pub mod nonce;
pub mod pipeline;

pub use balance::{BalanceChecker, DefaultBalanceChecker};
pub use builder::{CheckOptions, TxBuilder};
pub use gas::{
	DefaultGasEstimator, DefaultGasOracle, DefaultGasValidator, GasEstimator, GasOracle,
	GasValidator, StaticGasEstimator, StaticGasOracle,
};
pub use nonce::{ChainNonceSource, NonceSource, StaticNonceSource};
pub use pipeline::{send_tx_builder, BeforeSend, CallManager};
