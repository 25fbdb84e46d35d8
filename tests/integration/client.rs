//! RPC client integration tests against a mock endpoint.

use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use solana_chain_client::models::Commitment;
use solana_chain_client::services::rpc::types::AccountInfoOpts;
use solana_chain_client::services::rpc::{
	AccountReader, ClientError, Reader, RpcClient, Writer, DEVNET_GENESIS_HASH,
	MAINNET_GENESIS_HASH, TESTNET_GENESIS_HASH,
};
use solana_chain_client::utils::tests::ChainConfigBuilder;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::mocks::{
	mock_genesis, mock_rpc, mock_rpc_error, mock_rpc_expect, mock_rpc_with_params, transfer_tx,
	UNKNOWN_GENESIS_HASH,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn test_client(url: &str) -> RpcClient {
	let cfg = ChainConfigBuilder::new("localnet").build();
	RpcClient::new(url, &cfg, REQUEST_TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_chain_id_maps_genesis_hashes() {
	let cases = [
		(DEVNET_GENESIS_HASH, "devnet"),
		(TESTNET_GENESIS_HASH, "testnet"),
		(MAINNET_GENESIS_HASH, "mainnet"),
		(UNKNOWN_GENESIS_HASH, "localnet"),
	];

	for (hash, expected) in cases {
		let mut server = Server::new_async().await;
		let mock = mock_genesis(&mut server, hash);

		let client = test_client(&server.url());
		assert_eq!(client.chain_id().await.unwrap(), expected);
		mock.assert();
	}
}

#[tokio::test]
async fn test_balance_uses_peer_commitment() {
	let mut server = Server::new_async().await;
	let address = Pubkey::new_unique();
	let mock = mock_rpc_with_params(
		&mut server,
		"getBalance",
		json!([address.to_string(), { "commitment": "confirmed" }]),
		json!({ "context": { "slot": 1 }, "value": 100_000_000_000u64 }),
	);

	let client = test_client(&server.url());
	assert_eq!(client.balance(&address).await.unwrap(), 100_000_000_000);
	mock.assert();
}

#[tokio::test]
async fn test_slot_height_defaults_to_processed() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc_with_params(
		&mut server,
		"getSlot",
		json!([{ "commitment": "processed" }]),
		json!(42),
	);

	let client = test_client(&server.url());
	assert_eq!(client.slot_height().await.unwrap(), 42);
	mock.assert();
}

#[tokio::test]
async fn test_slot_height_commitment_override() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc_with_params(
		&mut server,
		"getSlot",
		json!([{ "commitment": "finalized" }]),
		json!(41),
	);

	let client = test_client(&server.url());
	assert_eq!(
		client
			.slot_height_with_commitment(Commitment::Finalized)
			.await
			.unwrap(),
		41
	);
	mock.assert();
}

#[tokio::test]
async fn test_latest_blockhash() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc(
		&mut server,
		"getLatestBlockhash",
		json!({
			"context": { "slot": 100 },
			"value": {
				"blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
				"lastValidBlockHeight": 3090
			}
		}),
	);

	let client = test_client(&server.url());
	let result = client.latest_blockhash().await.unwrap();
	assert_eq!(
		result.value.blockhash,
		"EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N"
	);
	assert_eq!(result.value.last_valid_block_height, 3090);
	mock.assert();
}

#[tokio::test]
async fn test_fee_for_message() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc(
		&mut server,
		"getFeeForMessage",
		json!({ "context": { "slot": 1 }, "value": 5000 }),
	);

	let client = test_client(&server.url());
	assert_eq!(client.fee_for_message("AQABAg==").await.unwrap(), 5000);
	mock.assert();
}

#[tokio::test]
async fn test_fee_for_message_null_value_is_an_error() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc(
		&mut server,
		"getFeeForMessage",
		json!({ "context": { "slot": 1 }, "value": null }),
	);

	let client = test_client(&server.url());
	let err = client.fee_for_message("AQABAg==").await.unwrap_err();
	assert!(matches!(err, ClientError::NullPayload { .. }));
	assert!(err.to_string().contains("getFeeForMessage"));
	mock.assert();
}

#[tokio::test]
async fn test_signature_statuses_preserves_null_positions() {
	let mut server = Server::new_async().await;
	let success = Signature::default();
	let unknown = Signature::default();
	let mock = mock_rpc_with_params(
		&mut server,
		"getSignatureStatuses",
		json!([
			[success.to_string(), unknown.to_string()],
			{ "searchTransactionHistory": false }
		]),
		json!({
			"context": { "slot": 82 },
			"value": [
				{
					"slot": 72,
					"confirmations": 10,
					"err": null,
					"confirmationStatus": "confirmed"
				},
				null
			]
		}),
	);

	let client = test_client(&server.url());
	let statuses = client
		.signature_statuses(&[success, unknown])
		.await
		.unwrap();
	assert_eq!(statuses.len(), 2);
	let first = statuses[0].as_ref().unwrap();
	assert_eq!(first.slot, 72);
	assert!(!first.is_err());
	assert!(statuses[1].is_none());
	mock.assert();
}

#[tokio::test]
async fn test_account_info_peer_commitment_overrides_opts() {
	let mut server = Server::new_async().await;
	let address = Pubkey::new_unique();
	// The caller asks for finalized; the peer's confirmed commitment must
	// reach the wire instead.
	let mock = mock_rpc_with_params(
		&mut server,
		"getAccountInfo",
		json!([address.to_string(), { "commitment": "confirmed", "encoding": "base64" }]),
		json!({
			"context": { "slot": 1 },
			"value": {
				"lamports": 1,
				"owner": "NativeLoader1111111111111111111111111111111",
				"data": ["", "base64"],
				"executable": false,
				"rentEpoch": 0
			}
		}),
	);

	let client = test_client(&server.url());
	let opts = AccountInfoOpts {
		commitment: Some("finalized".to_string()),
		..Default::default()
	};
	let result = client.account_info(&address, opts).await.unwrap();
	let account = result.value.unwrap();
	assert_eq!(account.lamports, 1);
	assert_eq!(
		account.owner,
		"NativeLoader1111111111111111111111111111111"
	);
	mock.assert();
}

#[tokio::test]
async fn test_send_tx_forwards_peer_send_options() {
	let mut server = Server::new_async().await;
	let from = Pubkey::new_unique();
	let to = Pubkey::new_unique();
	let tx = transfer_tx(&from, &to, 1);

	let encoded = {
		use base64::engine::general_purpose::STANDARD;
		use base64::Engine;
		STANDARD.encode(bincode::serialize(&tx).unwrap())
	};
	let signature = Signature::default();
	let mock = mock_rpc_with_params(
		&mut server,
		"sendTransaction",
		json!([encoded, {
			"encoding": "base64",
			"skipPreflight": false,
			"preflightCommitment": "confirmed",
			"maxRetries": 3
		}]),
		json!(signature.to_string()),
	);

	let cfg = ChainConfigBuilder::new("localnet")
		.skip_preflight(false)
		.max_retries(3)
		.build();
	let client = RpcClient::new(&server.url(), &cfg, REQUEST_TIMEOUT).unwrap();
	assert_eq!(client.send_tx(&tx).await.unwrap(), signature);
	mock.assert();
}

#[tokio::test]
async fn test_simulate_tx_defaults_to_sig_verify_at_peer_commitment() {
	let mut server = Server::new_async().await;
	let from = Pubkey::new_unique();
	let tx = transfer_tx(&from, &from, 1);

	// The encoded transaction is opaque here; match on the option fields.
	let mock = server
		.mock("POST", "/")
		.match_body(Matcher::AllOf(vec![
			Matcher::PartialJson(json!({ "method": "simulateTransaction" })),
			Matcher::Regex(r#""sigVerify":true"#.to_string()),
			Matcher::Regex(r#""commitment":"confirmed""#.to_string()),
		]))
		.with_header("content-type", "application/json")
		.with_status(200)
		.with_body(
			json!({
				"jsonrpc": "2.0",
				"result": {
					"context": { "slot": 1 },
					"value": { "err": null, "logs": [], "unitsConsumed": 450 }
				},
				"id": 1
			})
			.to_string(),
		)
		.create();

	let client = test_client(&server.url());
	let result = client.simulate_tx(&tx, None).await.unwrap();
	assert!(result.err.is_none());
	assert_eq!(result.units_consumed, Some(450));
	mock.assert();
}

#[tokio::test]
async fn test_latest_block_fetches_slot_then_block() {
	let mut server = Server::new_async().await;
	// Latest block resolves the slot at the peer commitment first.
	let slot_mock = mock_rpc_with_params(
		&mut server,
		"getSlot",
		json!([{ "commitment": "confirmed" }]),
		json!(100),
	);
	let block_mock = mock_rpc_with_params(
		&mut server,
		"getBlock",
		json!([100, {
			"encoding": "json",
			"commitment": "confirmed",
			"maxSupportedTransactionVersion": 0
		}]),
		json!({
			"blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
			"previousBlockhash": "6kRuviPVSJxFZTYHUPkdsSFTXfMizycsX5Zw9AbgV8pV",
			"parentSlot": 99,
			"blockTime": 1704067200i64,
			"blockHeight": 95
		}),
	);

	let client = test_client(&server.url());
	let block = client.latest_block().await.unwrap();
	assert_eq!(block.parent_slot, 99);
	assert_eq!(block.block_height, Some(95));
	assert_eq!(block.block_time, Some(1704067200));
	slot_mock.assert();
	block_mock.assert();
}

#[tokio::test]
async fn test_blocks_with_limit() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc_with_params(
		&mut server,
		"getBlocksWithLimit",
		json!([10, 3, { "commitment": "confirmed" }]),
		json!([10, 11, 12]),
	);

	let client = test_client(&server.url());
	let slots = client.blocks_with_limit(10, 3).await.unwrap();
	assert_eq!(slots, vec![10, 11, 12]);
	mock.assert();
}

#[tokio::test]
async fn test_http_failure_is_a_transport_error() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.with_status(500)
		.create();

	let client = test_client(&server.url());
	let err = client.slot_height().await.unwrap_err();
	assert!(matches!(err, ClientError::Transport { .. }));
	assert!(err.to_string().contains(&server.url()));
	mock.assert();
}

#[tokio::test]
async fn test_rpc_error_object_is_classified() {
	let mut server = Server::new_async().await;
	let mock = mock_rpc_error(&mut server, "getBlock", -32007, "Slot 100 was skipped");

	let client = test_client(&server.url());
	let err = client.block(100).await.unwrap_err();
	match err {
		ClientError::Rpc { code, .. } => assert_eq!(code, -32007),
		other => panic!("expected Rpc error, got {other:?}"),
	}
	mock.assert();
}

#[tokio::test]
async fn test_duplicate_submissions_return_equal_signatures() {
	let mut server = Server::new_async().await;
	let from = Pubkey::new_unique();
	let tx = transfer_tx(&from, &from, 1);
	let signature = Signature::default();
	let mock = mock_rpc_expect(&mut server, "sendTransaction", json!(signature.to_string()), 5);

	let client = std::sync::Arc::new(test_client(&server.url()));
	let mut tasks = Vec::new();
	for _ in 0..5 {
		let client = std::sync::Arc::clone(&client);
		let tx = tx.clone();
		tasks.push(tokio::spawn(async move { client.send_tx(&tx).await }));
	}

	let mut signatures = Vec::new();
	for task in tasks {
		signatures.push(task.await.unwrap().unwrap());
	}
	assert!(signatures.iter().all(|s| *s == signatures[0]));
	mock.assert();
}
