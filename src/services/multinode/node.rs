//! Pool node state.
//!
//! Each live node pairs one RPC client with the health bookkeeping the pool's
//! probe loop maintains. Reads of node state are short lock-free-ish
//! critical sections so selection never stalls behind a health update.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::services::chain::VerifiedClient;
use crate::services::rpc::RpcClient;
use crate::utils::metrics;

/// Point-in-time health snapshot of a node.
#[derive(Debug, Clone)]
pub(crate) struct NodeState {
	pub alive: bool,
	pub head_slot: u64,
	/// Total-difficulty analog for selection generality; stays zero on
	/// Solana-family chains.
	pub weight: u64,
	pub failing_since: Option<Instant>,
}

impl Default for NodeState {
	fn default() -> Self {
		Self {
			alive: true,
			head_slot: 0,
			weight: 0,
			failing_since: None,
		}
	}
}

/// A health-tracked, selectable pool member.
pub struct Node {
	name: String,
	chain_id: String,
	index: usize,
	raw: Arc<RpcClient>,
	verified: Arc<VerifiedClient>,
	state: RwLock<NodeState>,
}

impl Node {
	pub fn new(name: &str, chain_id: &str, index: usize, client: Arc<RpcClient>) -> Self {
		let url = client.url().to_string();
		let verified = Arc::new(VerifiedClient::new(
			Arc::clone(&client) as Arc<dyn crate::services::rpc::ReaderWriter>,
			&url,
			chain_id,
		));
		Self {
			name: name.to_string(),
			chain_id: chain_id.to_string(),
			index,
			raw: client,
			verified,
			state: RwLock::new(NodeState::default()),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn url(&self) -> &str {
		self.raw.url()
	}

	pub fn index(&self) -> usize {
		self.index
	}

	/// Verification-gated client handed out by selection and broadcast.
	pub fn client(&self) -> Arc<VerifiedClient> {
		Arc::clone(&self.verified)
	}

	pub(crate) fn snapshot(&self) -> NodeState {
		self.state
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	pub fn is_alive(&self) -> bool {
		self.state
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.alive
	}

	/// Runs one health probe against the raw client. Probes bypass the
	/// verification gate: health is about connectivity, identity is checked
	/// on the serving path.
	pub(crate) async fn probe(&self, death_declaration_delay: Duration) {
		match self
			.raw
			.slot_height_with_commitment(crate::models::Commitment::Processed)
			.await
		{
			Ok(slot) => self.record_success(slot),
			Err(e) => {
				debug!(
					node = %self.name,
					url = %self.url(),
					error = %e,
					"health probe failed"
				);
				self.record_failure(death_declaration_delay);
			}
		}
	}

	pub(crate) fn record_success(&self, head_slot: u64) {
		let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
		if !state.alive {
			info!(node = %self.name, url = %self.url(), "node recovered");
		}
		state.alive = true;
		state.head_slot = head_slot;
		state.failing_since = None;
		drop(state);
		metrics::set_node_alive(&self.chain_id, &self.name, true);
		metrics::set_node_head_slot(&self.chain_id, &self.name, head_slot);
	}

	pub(crate) fn record_failure(&self, death_declaration_delay: Duration) {
		let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
		let failing_since = *state.failing_since.get_or_insert_with(Instant::now);
		// Declared dead only after failing continuously for the full delay;
		// probing continues so the node can recover.
		if state.alive && failing_since.elapsed() >= death_declaration_delay {
			info!(node = %self.name, url = %self.url(), "node declared dead");
			state.alive = false;
		}
		let alive = state.alive;
		drop(state);
		metrics::set_node_alive(&self.chain_id, &self.name, alive);
	}
}

/// A broadcast-only pool member. Never read from, never health-probed for
/// selection; always included in transaction fan-out.
pub struct SendOnlyNode {
	name: String,
	verified: Arc<VerifiedClient>,
	url: String,
}

impl SendOnlyNode {
	pub fn new(name: &str, chain_id: &str, client: Arc<RpcClient>) -> Self {
		let url = client.url().to_string();
		let verified = Arc::new(VerifiedClient::new(
			client as Arc<dyn crate::services::rpc::ReaderWriter>,
			&url,
			chain_id,
		));
		Self {
			name: name.to_string(),
			verified,
			url,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn client(&self) -> Arc<VerifiedClient> {
		Arc::clone(&self.verified)
	}
}
