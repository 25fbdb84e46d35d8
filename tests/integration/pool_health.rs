//! Pool health tracking against mock endpoints.

use std::time::Duration;

use mockito::Server;
use serde_json::json;
use solana_chain_client::models::SelectionMode;
use solana_chain_client::services::lifecycle::Service;
use solana_chain_client::services::multinode::NodePool;
use solana_chain_client::utils::tests::ChainConfigBuilder;

use crate::mocks::{mock_rpc, mock_rpc_expect};

#[tokio::test]
async fn test_failing_node_is_declared_dead_then_recovers() {
	let mut healthy = Server::new_async().await;
	let mut flaky = Server::new_async().await;

	mock_rpc(&mut healthy, "getSlot", json!(100));
	flaky.mock("POST", "/").with_status(500).create();

	let cfg = ChainConfigBuilder::new("localnet")
		.multi_node(SelectionMode::HighestHead)
		.poll_interval_ms(50)
		.death_declaration_delay_ms(200)
		.node("healthy", &healthy.url())
		.node("flaky", &flaky.url())
		.build();
	let pool = NodePool::new(&cfg).unwrap();
	pool.start().await.unwrap();

	// Probes fail continuously for longer than the death declaration delay.
	tokio::time::sleep(Duration::from_millis(500)).await;

	let states = pool.node_states();
	assert!(states.contains(&("healthy".to_string(), "alive".to_string())));
	assert!(states.contains(&("flaky".to_string(), "dead".to_string())));

	for _ in 0..10 {
		assert_eq!(pool.select_rpc().unwrap().url(), healthy.url());
	}

	// The dead node keeps being probed; once it answers, it rejoins
	// selection, here with the best head.
	flaky.reset();
	mock_rpc(&mut flaky, "getSlot", json!(9999));
	tokio::time::sleep(Duration::from_millis(300)).await;

	let states = pool.node_states();
	assert!(states.contains(&("flaky".to_string(), "alive".to_string())));
	assert_eq!(pool.select_rpc().unwrap().url(), flaky.url());

	pool.close().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_probe_loops() {
	let mut server = Server::new_async().await;
	mock_rpc(&mut server, "getSlot", json!(10));

	let cfg = ChainConfigBuilder::new("localnet")
		.multi_node(SelectionMode::HighestHead)
		.poll_interval_ms(20)
		.node("only", &server.url())
		.build();
	let pool = NodePool::new(&cfg).unwrap();
	pool.start().await.unwrap();
	tokio::time::sleep(Duration::from_millis(100)).await;
	pool.close().await.unwrap();

	// No probes run after close returns.
	server.reset();
	let after_close = mock_rpc_expect(&mut server, "getSlot", json!(10), 0);
	tokio::time::sleep(Duration::from_millis(200)).await;
	after_close.assert_async().await;
}
