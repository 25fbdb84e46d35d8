//! Metrics module for the chain client.
//!
//! - This module contains the global Prometheus registry.
//! - Metrics are registered once at first use and emitted for the process
//!   lifetime; there is no dynamic redefinition.

use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

lazy_static! {
	/// Global Prometheus registry.
	pub static ref REGISTRY: Registry = Registry::new();

	/// Gauge for the latency of the most recent client request, in
	/// milliseconds, labelled by request name and endpoint URL.
	pub static ref CLIENT_LATENCY: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("client_latency_ms", "Latency of the most recent client request in ms"),
			&["request", "url"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for node liveness in the multi-node pool (1 alive, 0 dead).
	pub static ref POOL_NODE_ALIVE: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("pool_node_alive", "Whether a pool node is considered alive"),
			&["chain_id", "node"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Gauge for the last head slot observed by a pool node's health probe.
	pub static ref POOL_NODE_HEAD_SLOT: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("pool_node_head_slot", "Last head slot observed for a pool node"),
			&["chain_id", "node"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	/// Counter for transaction broadcast outcomes, labelled by chain and
	/// outcome (`success`, `rejected`, `transport_error`).
	pub static ref SEND_OUTCOMES_TOTAL: CounterVec = {
		let counter = CounterVec::new(
			Opts::new("send_outcomes_total", "Transaction broadcast outcomes"),
			&["chain_id", "outcome"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};
}

/// Gather all metrics and encode into the Prometheus text format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let metric_families = REGISTRY.gather();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer)?;
	Ok(buffer)
}

/// Records the latency of a client request.
pub fn set_client_latency(millis: f64, request: &str, url: &str) {
	CLIENT_LATENCY.with_label_values(&[request, url]).set(millis);
}

/// Fetches the latency gauge for a request/url pair, if it was recorded.
pub fn get_client_latency(request: &str, url: &str) -> Result<Gauge, prometheus::Error> {
	CLIENT_LATENCY.get_metric_with_label_values(&[request, url])
}

/// Records whether a pool node is alive.
pub fn set_node_alive(chain_id: &str, node: &str, alive: bool) {
	POOL_NODE_ALIVE
		.with_label_values(&[chain_id, node])
		.set(if alive { 1.0 } else { 0.0 });
}

/// Records the head slot last observed for a pool node.
pub fn set_node_head_slot(chain_id: &str, node: &str, slot: u64) {
	POOL_NODE_HEAD_SLOT
		.with_label_values(&[chain_id, node])
		.set(slot as f64);
}

/// Records one transaction broadcast outcome.
pub fn record_send_outcome(chain_id: &str, outcome: &str) {
	SEND_OUTCOMES_TOTAL
		.with_label_values(&[chain_id, outcome])
		.inc();
}

/// Measures wall-clock latency of one client request and records it on drop.
pub struct LatencyGuard {
	start: Instant,
	request: String,
	url: String,
}

impl LatencyGuard {
	pub fn new(request: &str, url: &str) -> Self {
		Self {
			start: Instant::now(),
			request: request.to_string(),
			url: url.to_string(),
		}
	}
}

impl Drop for LatencyGuard {
	fn drop(&mut self) {
		set_client_latency(
			self.start.elapsed().as_secs_f64() * 1000.0,
			&self.request,
			&self.url,
		);
	}
}
