//! Alloy provider backed RPC implementation.
//!
//! Translates the [`RpcInterface`] calls into Ethereum JSON-RPC requests
//! through an alloy `DynProvider`. JSON-RPC error objects returned by the
//! node keep their code and data so callers can classify them.

use crate::RpcInterface;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{BlockId, BlockNumberOrTag, TransactionInput, TransactionRequest};
use alloy_transport::TransportError;
use async_trait::async_trait;
use eths_types::{with_0x_prefix, CallMessage, HeaderInfo, ReceiptInfo, RpcError};

/// RPC implementation over an alloy provider.
#[derive(Clone)]
pub struct AlloyRpc {
	provider: DynProvider,
}

impl AlloyRpc {
	/// Creates a new AlloyRpc from an existing provider.
	pub fn new(provider: DynProvider) -> Self {
		Self { provider }
	}

	/// Connects to a node by URL (`http(s)://`, `ws(s)://` or an IPC path).
	pub async fn connect(url: &str) -> Result<Self, RpcError> {
		let provider = ProviderBuilder::new()
			.connect(url)
			.await
			.map_err(|e| RpcError::Transport(format!("Failed to connect to {}: {}", url, e)))?;
		Ok(Self::new(provider.erased()))
	}
}

/// Keeps the JSON-RPC error object when the node returned one.
fn map_transport_error(err: TransportError) -> RpcError {
	match err.as_error_resp() {
		Some(payload) => RpcError::JsonRpc {
			code: payload.code,
			message: payload.message.to_string(),
			data: payload
				.data
				.as_ref()
				.map(|raw| with_0x_prefix(raw.get().trim_matches('"'))),
		},
		None => RpcError::Transport(err.to_string()),
	}
}

fn narrow_fee(value: Option<U256>, field: &str) -> Result<Option<u128>, RpcError> {
	value
		.map(|fee| {
			u128::try_from(fee)
				.map_err(|_| RpcError::Transport(format!("{} does not fit in 128 bits", field)))
		})
		.transpose()
}

fn to_request(msg: &CallMessage) -> Result<TransactionRequest, RpcError> {
	let mut request = TransactionRequest::default()
		.from(msg.from)
		.value(msg.value)
		.input(TransactionInput::new(msg.data.clone()));
	if let Some(to) = msg.to {
		request = request.to(to);
	}
	request.gas_price = narrow_fee(msg.gas_price, "gas price")?;
	request.max_priority_fee_per_gas =
		narrow_fee(msg.max_priority_fee_per_gas, "max priority fee per gas")?;
	request.max_fee_per_gas = narrow_fee(msg.max_fee_per_gas, "max fee per gas")?;
	Ok(request)
}

fn block_id(block: Option<u64>) -> BlockId {
	match block {
		Some(number) => BlockId::number(number),
		None => BlockId::latest(),
	}
}

#[async_trait]
impl RpcInterface for AlloyRpc {
	async fn latest_header(&self) -> Result<HeaderInfo, RpcError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(map_transport_error)?
			.ok_or_else(|| RpcError::Transport("Latest block not found".to_string()))?;

		Ok(HeaderInfo {
			number: block.header.number,
			hash: block.header.hash,
			base_fee_per_gas: block.header.base_fee_per_gas.map(U256::from),
		})
	}

	async fn suggest_gas_price(&self) -> Result<U256, RpcError> {
		let price = self
			.provider
			.get_gas_price()
			.await
			.map_err(map_transport_error)?;
		Ok(U256::from(price))
	}

	async fn suggest_gas_tip_cap(&self) -> Result<U256, RpcError> {
		let tip = self
			.provider
			.get_max_priority_fee_per_gas()
			.await
			.map_err(map_transport_error)?;
		Ok(U256::from(tip))
	}

	async fn pending_code_at(&self, address: Address) -> Result<Bytes, RpcError> {
		self.provider
			.get_code_at(address)
			.pending()
			.await
			.map_err(map_transport_error)
	}

	async fn code_at(&self, address: Address, block: Option<u64>) -> Result<Bytes, RpcError> {
		self.provider
			.get_code_at(address)
			.block_id(block_id(block))
			.await
			.map_err(map_transport_error)
	}

	async fn balance_at(&self, address: Address, block: Option<u64>) -> Result<U256, RpcError> {
		self.provider
			.get_balance(address)
			.block_id(block_id(block))
			.await
			.map_err(map_transport_error)
	}

	async fn nonce_at(&self, address: Address, block: Option<u64>) -> Result<u64, RpcError> {
		self.provider
			.get_transaction_count(address)
			.block_id(block_id(block))
			.await
			.map_err(map_transport_error)
	}

	async fn pending_nonce_at(&self, address: Address) -> Result<u64, RpcError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(map_transport_error)
	}

	async fn estimate_gas(&self, msg: &CallMessage) -> Result<u64, RpcError> {
		let request = to_request(msg)?;
		self.provider
			.estimate_gas(request)
			.await
			.map_err(map_transport_error)
	}

	async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
		let pending = self
			.provider
			.send_raw_transaction(&raw)
			.await
			.map_err(map_transport_error)?;
		Ok(*pending.tx_hash())
	}

	async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptInfo>, RpcError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(map_transport_error)?;

		Ok(receipt.map(|receipt| ReceiptInfo {
			transaction_hash: receipt.transaction_hash,
			block_number: receipt.block_number,
			status: receipt.status(),
			gas_used: receipt.gas_used,
		}))
	}

	async fn block_number(&self) -> Result<u64, RpcError> {
		self.provider
			.get_block_number()
			.await
			.map_err(map_transport_error)
	}

	async fn call_contract(
		&self,
		msg: &CallMessage,
		block: Option<u64>,
	) -> Result<Bytes, RpcError> {
		let request = to_request(msg)?;
		self.provider
			.call(request)
			.block(block_id(block))
			.await
			.map_err(map_transport_error)
	}
}
