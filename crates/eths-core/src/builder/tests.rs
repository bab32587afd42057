use super::*;
use crate::balance::DefaultBalanceChecker;
use crate::gas::{StaticGasEstimator, StaticGasOracle};
use crate::nonce::StaticNonceSource;
use async_trait::async_trait;
use eths_delivery::MockRpcInterface;
use eths_types::{HeaderInfo, RpcError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const FROM: Address = Address::repeat_byte(0x11);
const TOKEN: Address = Address::repeat_byte(0x22);

struct CountingOracle {
	calls: AtomicUsize,
}

#[async_trait]
impl GasOracle for CountingOracle {
	async fn quote(&self, _chain_id: U256) -> Result<GasQuote, TxError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(GasQuote::legacy(U256::from(1)))
	}
}

struct FailingNonces;

#[async_trait]
impl NonceSource for FailingNonces {
	async fn next(&self, _account: Address, _pending: bool) -> Result<u64, TxError> {
		Err(RpcError::Transport("connection refused".into()).into())
	}
}

struct FailingEstimator(TxError);

#[async_trait]
impl GasEstimator for FailingEstimator {
	async fn estimate(&self, _chain_id: U256, _msg: &CallMessage) -> Result<u64, TxError> {
		Err(self.0.clone())
	}
}

fn dynamic_quote() -> GasQuote {
	GasQuote::dynamic(U256::from(1_000_000_000u64), U256::from(3_000_000_000u64))
}

fn priced() -> TxBuilder {
	TxBuilder::new(U256::from(1))
		.set_from(FROM)
		.set_to(Some(TOKEN), false)
		.set_data(Bytes::from_static(&[0xa9, 0x05, 0x9c, 0xbb]))
		.set_nonce(3)
		.set_gas_price(dynamic_quote())
}

fn code_rpc(code: &'static [u8]) -> MockRpcInterface {
	let mut rpc = MockRpcInterface::new();
	rpc.expect_pending_code_at()
		.returning(move |_| Ok(Bytes::from_static(code)));
	rpc
}

#[tokio::test]
async fn test_nonce_before_from_latches() {
	let oracle = CountingOracle {
		calls: AtomicUsize::new(0),
	};
	let builder = TxBuilder::new(U256::from(1))
		.set_nonce_by(&StaticNonceSource::new(5))
		.await
		.set_gas_price_by(&oracle)
		.await
		.set_from(FROM);

	let err = builder.error().unwrap();
	assert!(matches!(err, TxError::MissingRequiredField("from is required")));
	assert_eq!(err.to_string(), "missing required field: from is required");
	assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
	assert_eq!(builder.gas_quote(), None);
	assert_eq!(builder.nonce(), None);
	assert_eq!(builder.from(), None);
	assert!(builder.build().is_err());
}

#[tokio::test]
async fn test_nonce_failure_has_context() {
	let builder = TxBuilder::new(U256::from(1))
		.set_from(FROM)
		.set_nonce_by(&FailingNonces)
		.await;
	let err = builder.error().unwrap();
	assert!(err.is_rpc());
	assert!(err
		.to_string()
		.starts_with("failed to get nonce from chain: ethereum rpc error"));
}

#[tokio::test]
async fn test_build_requires_fields() {
	let cases = [
		(TxBuilder::new(U256::from(1)), "from is required"),
		(
			TxBuilder::new(U256::from(1)).set_from(FROM),
			"gas price is required",
		),
		(
			TxBuilder::new(U256::from(1))
				.set_from(FROM)
				.set_gas_price(dynamic_quote()),
			"nonce is required",
		),
		(
			TxBuilder::new(U256::from(1))
				.set_from(FROM)
				.set_gas_price(dynamic_quote())
				.set_nonce(1),
			"gas limit is required",
		),
	];
	for (builder, expected) in cases {
		let err = builder.build().unwrap_err();
		assert!(
			matches!(err, TxError::MissingRequiredField(field) if field == expected),
			"{}",
			err
		);
	}
}

#[tokio::test]
async fn test_build_picks_envelope_type() {
	let dynamic = priced().set_gas_limit(52_000).build().unwrap();
	assert_eq!(dynamic.tx_type(), TxType::DynamicFee);
	assert_eq!(dynamic.max_fee_per_gas(), Some(U256::from(3_000_000_000u64)));
	assert_eq!(dynamic.nonce(), 3);
	assert_eq!(dynamic.gas(), 52_000);
	assert_eq!(dynamic.to(), Some(TOKEN));
	assert_eq!(dynamic.chain_id(), U256::from(1));

	let legacy = priced()
		.set_gas_price(GasQuote::legacy(U256::from(7)))
		.set_gas_limit(21_000)
		.build()
		.unwrap();
	assert_eq!(legacy.tx_type(), TxType::Legacy);
	assert_eq!(legacy.gas_price(), Some(U256::from(7)));

	let mismatched = priced().set_gas_limit(21_000).build_tx(TxType::Legacy);
	assert!(matches!(
		mismatched,
		Err(TxError::MissingRequiredField("legacy gas price is required"))
	));
}

#[tokio::test]
async fn test_contract_creation() {
	let envelope = priced()
		.set_to(None, false)
		.set_gas_limit(500_000)
		.build()
		.unwrap();
	assert_eq!(envelope.to(), None);
}

#[tokio::test]
async fn test_gas_limit_by_builds_call_message() {
	let mut rpc = MockRpcInterface::new();
	rpc.expect_estimate_gas()
		.withf(|msg| {
			msg.from == FROM
				&& msg.to == Some(TOKEN)
				&& msg.gas_price.is_none()
				&& msg.max_priority_fee_per_gas == Some(U256::from(1_000_000_000u64))
				&& msg.max_fee_per_gas == Some(U256::from(3_000_000_000u64))
		})
		.returning(|_| Ok(52_000));
	let estimator = crate::gas::DefaultGasEstimator::new(Arc::new(rpc));

	let builder = priced().set_gas_limit_by(&estimator).await;
	assert_eq!(builder.gas_limit(), Some(52_000));
}

#[tokio::test]
async fn test_gas_limit_by_requires_nonce() {
	let builder = TxBuilder::new(U256::from(1))
		.set_from(FROM)
		.set_gas_price(dynamic_quote())
		.set_gas_limit_by(&StaticGasEstimator::new(1))
		.await;
	assert!(matches!(
		builder.error(),
		Some(TxError::MissingRequiredField("nonce is required"))
	));
}

#[tokio::test]
async fn test_estimate_failures() {
	let reverted = TxError::Evm(
		RpcError::JsonRpc {
			code: 3,
			message: "execution reverted".into(),
			data: Some("0x".into()),
		}
		.into(),
	);
	let builder = priced()
		.set_gas_limit_by(&FailingEstimator(reverted))
		.await;
	let err = builder.error().unwrap();
	assert!(err.is_estimate_gas());
	assert!(err.evm_error().unwrap().is_execution_reverted());

	let broke = TxError::InsufficientBalance(eths_types::InsufficientBalanceError {
		balance: None,
		evm: None,
	});
	let builder = priced().set_gas_limit_by(&FailingEstimator(broke)).await;
	let err = builder.error().unwrap();
	assert!(err.is_estimate_gas());
	assert!(matches!(
		err,
		TxError::EstimateGas(inner) if matches!(**inner, TxError::InsufficientBalance(_))
	));
	assert!(err.insufficient_balance().is_some());
}

#[tokio::test]
async fn test_check_requires_code() {
	let rpc = code_rpc(&[]);
	let builder = priced()
		.set_to(Some(TOKEN), true)
		.check(&rpc, None, CheckOptions::default())
		.await;
	assert!(matches!(builder.error(), Some(TxError::NoCode)));
}

#[tokio::test]
async fn test_check_rejects_empty_calldata_to_contract() {
	let rpc = code_rpc(&[0x60, 0x80]);
	let builder = priced()
		.set_data(Bytes::new())
		.check(&rpc, None, CheckOptions::default())
		.await;
	assert!(matches!(
		builder.error(),
		Some(TxError::ContractCallEmptyData)
	));

	// Not strict and not required to be a contract: no code lookup at all.
	let mut rpc = MockRpcInterface::new();
	rpc.expect_pending_code_at().never();
	let builder = priced()
		.set_data(Bytes::new())
		.check(&rpc, None, CheckOptions { strict: false })
		.await;
	assert!(builder.error().is_none());
}

#[tokio::test]
async fn test_check_runs_validator() {
	let mut rpc = code_rpc(&[0x60]);
	rpc.expect_latest_header().returning(|| {
		Ok(HeaderInfo {
			base_fee_per_gas: Some(U256::from(10_000_000_000u64)),
			..Default::default()
		})
	});
	let rpc = Arc::new(rpc);
	let validator = crate::gas::DefaultGasValidator::new(rpc.clone());

	let builder = priced()
		.check(rpc.as_ref(), Some(&validator), CheckOptions::default())
		.await;
	assert!(matches!(
		builder.error(),
		Some(TxError::InvalidGasPrice(_))
	));
}

#[tokio::test]
async fn test_balance_check_latches() {
	let mut rpc = MockRpcInterface::new();
	rpc.expect_balance_at().returning(|_, _| Ok(U256::from(1)));
	let checker = DefaultBalanceChecker::new(Arc::new(rpc));

	let builder = priced()
		.balance_check(&checker)
		.await
		.set_gas_price_by(&StaticGasOracle::new(GasQuote::legacy(U256::from(1))))
		.await;
	assert!(matches!(
		builder.error(),
		Some(TxError::InsufficientBalance(_))
	));
	assert_eq!(builder.gas_quote(), Some(&dynamic_quote()));
}

#[tokio::test]
async fn test_balance_check_before_pricing() {
	let mut rpc = MockRpcInterface::new();
	rpc.expect_balance_at().returning(|_, _| Ok(U256::from(1)));
	let checker = DefaultBalanceChecker::new(Arc::new(rpc));

	let builder = TxBuilder::new(U256::from(1))
		.set_from(FROM)
		.set_to(Some(TOKEN), false)
		.balance_check(&checker)
		.await;
	assert!(builder.error().is_none());

	let builder = TxBuilder::new(U256::from(1)).balance_check(&checker).await;
	assert!(matches!(
		builder.error(),
		Some(TxError::MissingRequiredField("from is required"))
	));
}

#[tokio::test]
async fn test_from_by_pubkey() {
	let key = k256::ecdsa::SigningKey::from_slice(&[0x01; 32]).unwrap();
	let expected = alloy_signer::utils::public_key_to_address(key.verifying_key());
	let builder = TxBuilder::new(U256::from(1)).set_from_by_pubkey(key.verifying_key());
	assert_eq!(builder.from(), Some(expected));
}
