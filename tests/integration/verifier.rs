//! Chain-id verification against mock endpoints.

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;
use serde_json::json;
use solana_chain_client::services::chain::VerifiedClient;
use solana_chain_client::services::rpc::{Reader, ReaderWriter, RpcClient, DEVNET_GENESIS_HASH};
use solana_chain_client::utils::tests::ChainConfigBuilder;
use solana_sdk::pubkey::Pubkey;

use crate::mocks::{mock_genesis, mock_genesis_expect, mock_rpc, mock_rpc_expect, UNKNOWN_GENESIS_HASH};

fn verified_client(url: &str, expected_chain_id: &str) -> VerifiedClient {
	let cfg = ChainConfigBuilder::new(expected_chain_id).build();
	let client = RpcClient::new(url, &cfg, Duration::from_secs(5)).unwrap();
	VerifiedClient::new(
		Arc::new(client) as Arc<dyn ReaderWriter>,
		url,
		expected_chain_id,
	)
}

#[tokio::test]
async fn test_mismatched_endpoint_is_rejected_forever() {
	let mut server = Server::new_async().await;
	let genesis_mock = mock_genesis_expect(&mut server, DEVNET_GENESIS_HASH, 2);
	// The gated operation must never reach the endpoint.
	let balance_mock = mock_rpc_expect(
		&mut server,
		"getBalance",
		json!({ "context": { "slot": 1 }, "value": 1 }),
		0,
	);

	let client = verified_client(&server.url(), "mainnet");
	let expected_message = format!(
		"client returned mismatched chain id (expected: mainnet, got: devnet): {}",
		server.url()
	);

	for _ in 0..2 {
		let err = client.balance(&Pubkey::new_unique()).await.unwrap_err();
		assert_eq!(err.to_string(), expected_message);
		assert!(!client.is_verified().await);
	}

	genesis_mock.assert();
	balance_mock.assert();
}

#[tokio::test]
async fn test_verification_happens_exactly_once() {
	let mut server = Server::new_async().await;
	let genesis_mock = mock_genesis_expect(&mut server, UNKNOWN_GENESIS_HASH, 1);
	let balance_mock = mock_rpc_expect(
		&mut server,
		"getBalance",
		json!({ "context": { "slot": 1 }, "value": 100 }),
		3,
	);

	let client = verified_client(&server.url(), "localnet");
	let address = Pubkey::new_unique();

	for _ in 0..3 {
		assert_eq!(client.balance(&address).await.unwrap(), 100);
		assert!(client.is_verified().await);
	}
	// The wrapper reports the observed identity without refetching.
	assert_eq!(client.chain_id().await.unwrap(), "localnet");

	genesis_mock.assert();
	balance_mock.assert();
}

#[tokio::test]
async fn test_unreachable_endpoint_does_not_pin_verification() {
	let mut server = Server::new_async().await;
	// No mocks mounted: the first verification attempt fails on transport.
	let client = verified_client(&server.url(), "localnet");
	let err = client.slot_height().await.unwrap_err();
	assert!(err.is_transport());
	assert!(!client.is_verified().await);

	// Once the endpoint answers, verification succeeds and the call goes
	// through.
	mock_genesis(&mut server, UNKNOWN_GENESIS_HASH);
	mock_rpc(&mut server, "getSlot", json!(7));
	assert_eq!(client.slot_height().await.unwrap(), 7);
	assert!(client.is_verified().await);
}
