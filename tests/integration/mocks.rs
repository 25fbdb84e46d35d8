//! Shared mock servers and collaborator stubs.

use std::sync::Arc;

use async_trait::async_trait;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use solana_chain_client::services::chain::{
	BalanceMonitor, ChainOpts, Keystore, TxManager, TxOptions,
};
use solana_chain_client::services::lifecycle::Service;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

/// A genesis hash that maps to no known network, i.e. `localnet`.
pub const UNKNOWN_GENESIS_HASH: &str = "GH7ome3EiwEr7tu9JuTh2dpYWBJK3z69Xm1ZE3MEE6JC";

/// Mounts a JSON-RPC result for `method`.
pub fn mock_rpc(server: &mut ServerGuard, method: &str, result: Value) -> Mock {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({ "method": method })))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }).to_string())
		.create()
}

/// Mounts a JSON-RPC result for `method`, matching on the request params too.
pub fn mock_rpc_with_params(
	server: &mut ServerGuard,
	method: &str,
	params: Value,
	result: Value,
) -> Mock {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(
			json!({ "method": method, "params": params }),
		))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }).to_string())
		.create()
}

/// Mounts a JSON-RPC error object for `method`.
pub fn mock_rpc_error(server: &mut ServerGuard, method: &str, code: i64, message: &str) -> Mock {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({ "method": method })))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(
			json!({
				"jsonrpc": "2.0",
				"error": { "code": code, "message": message },
				"id": 1
			})
			.to_string(),
		)
		.create()
}

/// Mounts a JSON-RPC result for `method` with an exact expected hit count.
pub fn mock_rpc_expect(
	server: &mut ServerGuard,
	method: &str,
	result: Value,
	hits: usize,
) -> Mock {
	server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({ "method": method })))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(json!({ "jsonrpc": "2.0", "result": result, "id": 1 }).to_string())
		.expect(hits)
		.create()
}

/// Mounts a `getGenesisHash` response.
pub fn mock_genesis(server: &mut ServerGuard, hash: &str) -> Mock {
	mock_rpc(server, "getGenesisHash", json!(hash))
}

/// Mounts a `getGenesisHash` response with an exact expected hit count.
pub fn mock_genesis_expect(server: &mut ServerGuard, hash: &str, hits: usize) -> Mock {
	mock_rpc_expect(server, "getGenesisHash", json!(hash), hits)
}

/// A signed-shape transfer transaction for broadcast tests; the mock servers
/// never verify signatures.
pub fn transfer_tx(from: &Pubkey, to: &Pubkey, amount: u64) -> Transaction {
	let instruction = system_instruction::transfer(from, to, amount);
	let mut message = Message::new(&[instruction], Some(from));
	message.recent_blockhash = Hash::new_unique();
	Transaction::new_unsigned(message)
}

mockall::mock! {
	pub Txm {}

	#[async_trait]
	impl Service for Txm {
		fn name(&self) -> String;
		async fn start(&self) -> anyhow::Result<()>;
		async fn close(&self) -> anyhow::Result<()>;
		fn ready(&self) -> anyhow::Result<()>;
	}

	#[async_trait]
	impl TxManager for Txm {
		async fn enqueue(
			&self,
			id: &str,
			tx: Transaction,
			opts: TxOptions,
		) -> anyhow::Result<()>;
	}
}

mockall::mock! {
	pub Monitor {}

	#[async_trait]
	impl Service for Monitor {
		fn name(&self) -> String;
		async fn start(&self) -> anyhow::Result<()>;
		async fn close(&self) -> anyhow::Result<()>;
		fn ready(&self) -> anyhow::Result<()>;
	}

	impl BalanceMonitor for Monitor {}
}

pub struct NoopKeystore;

#[async_trait]
impl Keystore for NoopKeystore {
	async fn sign(&self, _account: &Pubkey, _message: &[u8]) -> anyhow::Result<Signature> {
		Ok(Signature::default())
	}
}

/// Chain options wiring the given collaborator mocks.
pub fn chain_opts(txm: MockTxm, monitor: MockMonitor) -> ChainOpts {
	ChainOpts {
		keystore: Arc::new(NoopKeystore),
		tx_manager: Box::new(move |_| Arc::new(txm)),
		balance_monitor: Box::new(move |_| Arc::new(monitor)),
	}
}

/// Collaborator mocks with names stubbed, for tests that never start the
/// chain.
pub fn quiet_mocks() -> (MockTxm, MockMonitor) {
	let mut txm = MockTxm::new();
	txm.expect_name().return_const("TxManager".to_string());
	let mut monitor = MockMonitor::new();
	monitor
		.expect_name()
		.return_const("BalanceMonitor".to_string());
	(txm, monitor)
}
