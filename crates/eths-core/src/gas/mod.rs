//! Gas pricing and gas limit sources.

pub mod estimator;
pub mod oracle;
pub mod validator;

pub use estimator::{DefaultGasEstimator, GasEstimator, StaticGasEstimator};
pub use oracle::{DefaultGasOracle, GasOracle, StaticGasOracle};
pub use validator::{DefaultGasValidator, GasValidator};
