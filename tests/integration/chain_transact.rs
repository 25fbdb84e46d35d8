//! Chain façade transfer flow against a mock endpoint.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use mockito::{Server, ServerGuard};
use serde_json::json;
use solana_chain_client::services::chain::Chain;
use solana_chain_client::utils::tests::ChainConfigBuilder;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use crate::mocks::{
	chain_opts, mock_genesis, mock_rpc, mock_rpc_expect, quiet_mocks, UNKNOWN_GENESIS_HASH,
};

const BLOCKHASH: &str = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";

fn mock_transfer_reads(server: &mut ServerGuard, balance: u64, fee: u64) {
	mock_genesis(server, UNKNOWN_GENESIS_HASH);
	mock_rpc(
		server,
		"getLatestBlockhash",
		json!({
			"context": { "slot": 100 },
			"value": { "blockhash": BLOCKHASH, "lastValidBlockHeight": 3090 }
		}),
	);
	mock_rpc(
		server,
		"getBalance",
		json!({ "context": { "slot": 100 }, "value": balance }),
	);
	mock_rpc(
		server,
		"getFeeForMessage",
		json!({ "context": { "slot": 100 }, "value": fee }),
	);
}

#[tokio::test]
async fn test_transact_enqueues_a_capped_transfer() {
	let mut server = Server::new_async().await;
	mock_transfer_reads(&mut server, 100_000_000, 5000);

	let expected_blockhash = Hash::from_str(BLOCKHASH).unwrap();
	let (mut txm, monitor) = quiet_mocks();
	txm.expect_enqueue()
		.times(1)
		.withf(move |id, tx, opts| {
			id.is_empty()
				&& tx.message.instructions.len() == 1
				&& tx.message.recent_blockhash == expected_blockhash
				&& opts.compute_unit_limit == Some(500)
				&& opts.compute_unit_price_min == 0
				&& opts.compute_unit_price_max == 0
				&& opts.base_compute_unit_price == 0
				&& opts.fee_bump_period == StdDuration::ZERO
		})
		.returning(|_, _, _| Ok(()));

	let cfg = ChainConfigBuilder::new("localnet")
		.node("primary", &server.url())
		.build();
	let chain = Chain::new(cfg, chain_opts(txm, monitor)).unwrap();

	chain
		.transact(
			&Pubkey::new_unique().to_string(),
			&Pubkey::new_unique().to_string(),
			1000,
			true,
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn test_transact_rejects_insufficient_balance() {
	let mut server = Server::new_async().await;
	// balance < amount + fee
	mock_transfer_reads(&mut server, 4000, 5000);

	let (mut txm, monitor) = quiet_mocks();
	txm.expect_enqueue().never();

	let cfg = ChainConfigBuilder::new("localnet")
		.node("primary", &server.url())
		.build();
	let chain = Chain::new(cfg, chain_opts(txm, monitor)).unwrap();

	let err = chain
		.transact(
			&Pubkey::new_unique().to_string(),
			&Pubkey::new_unique().to_string(),
			1000,
			true,
		)
		.await
		.unwrap_err();
	let message = format!("{err:#}");
	assert!(message.contains("failed to validate balance"));
	assert!(message.contains("balance 4000 is too low"));
}

#[tokio::test]
async fn test_transact_skips_balance_check_when_disabled() {
	let mut server = Server::new_async().await;
	mock_genesis(&mut server, UNKNOWN_GENESIS_HASH);
	mock_rpc(
		&mut server,
		"getLatestBlockhash",
		json!({
			"context": { "slot": 100 },
			"value": { "blockhash": BLOCKHASH, "lastValidBlockHeight": 3090 }
		}),
	);
	// No getBalance/getFeeForMessage mocks: the check must not run.
	let balance_mock = mock_rpc_expect(
		&mut server,
		"getBalance",
		json!({ "context": { "slot": 100 }, "value": 0 }),
		0,
	);

	let (mut txm, monitor) = quiet_mocks();
	txm.expect_enqueue().times(1).returning(|_, _, _| Ok(()));

	let cfg = ChainConfigBuilder::new("localnet")
		.node("primary", &server.url())
		.build();
	let chain = Chain::new(cfg, chain_opts(txm, monitor)).unwrap();

	chain
		.transact(
			&Pubkey::new_unique().to_string(),
			&Pubkey::new_unique().to_string(),
			1000,
			false,
		)
		.await
		.unwrap();
	balance_mock.assert_async().await;
}

#[tokio::test]
async fn test_latest_head_reads_the_newest_block() {
	let mut server = Server::new_async().await;
	mock_genesis(&mut server, UNKNOWN_GENESIS_HASH);
	mock_rpc(&mut server, "getSlot", json!(100));
	mock_rpc(
		&mut server,
		"getBlock",
		json!({
			"blockhash": BLOCKHASH,
			"previousBlockhash": "6kRuviPVSJxFZTYHUPkdsSFTXfMizycsX5Zw9AbgV8pV",
			"parentSlot": 99,
			"blockTime": 1704067200i64,
			"blockHeight": 95
		}),
	);

	let (txm, monitor) = quiet_mocks();
	let cfg = ChainConfigBuilder::new("localnet")
		.node("primary", &server.url())
		.build();
	let chain = Chain::new(cfg, chain_opts(txm, monitor)).unwrap();

	let head = chain.latest_head().await.unwrap();
	assert_eq!(head.height, "95");
	assert_eq!(head.hash, BLOCKHASH.as_bytes().to_vec());
	assert_eq!(head.timestamp, 1704067200);
}
