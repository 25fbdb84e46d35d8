//! Health-tracked node pool.
//!
//! The pool owns every configured node, runs one probe loop per live node,
//! and answers selection queries according to the configured mode. Selection
//! is a point-in-time read over short-lived state guards; probe loops stop
//! through a shutdown handshake awaited by `close`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::models::{ChainConfig, MultiNodeConfig, SelectionMode, DEFAULT_REQUEST_TIMEOUT};
use crate::services::chain::VerifiedClient;
use crate::services::lifecycle::{Service, StateMachine};
use crate::services::rpc::{ClientError, RpcClient};

use super::node::{Node, SendOnlyNode};

/// How far a node's head may trail the best alive head and still be
/// selectable, in slots.
pub const HEAD_SLOT_LAG_TOLERANCE: u64 = 50;

#[derive(Default)]
struct Lease {
	primary: Option<usize>,
	renewed_at: Option<Instant>,
}

#[derive(Default)]
struct RunState {
	shutdown: Option<watch::Sender<bool>>,
	handles: Vec<JoinHandle<()>>,
}

/// Multi-node pool with health tracking and selection policy.
impl std::fmt::Debug for NodePool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NodePool").field("chain_id", &self.chain_id).finish_non_exhaustive()
	}
}

pub struct NodePool {
	chain_id: String,
	cfg: MultiNodeConfig,
	nodes: Vec<Arc<Node>>,
	send_only: Vec<Arc<SendOnlyNode>>,
	round_robin: AtomicUsize,
	lease: Mutex<Lease>,
	run: Mutex<RunState>,
	sm: StateMachine,
}

impl NodePool {
	pub fn new(cfg: &ChainConfig) -> Result<Self, ClientError> {
		let mut nodes = Vec::new();
		let mut send_only = Vec::new();

		for node_cfg in &cfg.nodes {
			if node_cfg.name.is_empty() || node_cfg.url.is_empty() {
				return Err(ClientError::config(format!(
					"node config contains empty fields: {node_cfg:?}"
				)));
			}
			let client = Arc::new(RpcClient::new(
				&node_cfg.url,
				cfg,
				DEFAULT_REQUEST_TIMEOUT,
			)?);
			if node_cfg.send_only {
				send_only.push(Arc::new(SendOnlyNode::new(
					&node_cfg.name,
					&cfg.chain_id,
					client,
				)));
			} else {
				nodes.push(Arc::new(Node::new(
					&node_cfg.name,
					&cfg.chain_id,
					nodes.len(),
					client,
				)));
			}
		}

		if nodes.is_empty() {
			return Err(ClientError::config("no nodes available"));
		}

		Ok(Self {
			chain_id: cfg.chain_id.clone(),
			cfg: cfg.multi_node.clone(),
			nodes,
			send_only,
			round_robin: AtomicUsize::new(0),
			lease: Mutex::new(Lease::default()),
			run: Mutex::new(RunState::default()),
			sm: StateMachine::new("NodePool"),
		})
	}

	/// Selects a client by the configured mode among alive, in-sync nodes.
	///
	/// While the current primary's lease is valid and the primary is still
	/// selectable, it is returned without re-evaluating; otherwise selection
	/// runs fresh and renews the lease.
	pub fn select_rpc(&self) -> Result<Arc<VerifiedClient>, ClientError> {
		let mut lease = self.lease.lock().unwrap_or_else(PoisonError::into_inner);

		if !self.cfg.lease_duration().is_zero() {
			if let (Some(primary), Some(renewed_at)) = (lease.primary, lease.renewed_at) {
				if renewed_at.elapsed() < self.cfg.lease_duration()
					&& self.is_selectable(primary)
				{
					return Ok(self.nodes[primary].client());
				}
			}
		}

		let index = self.select_index().ok_or_else(|| {
			ClientError::transport("selectRPC", &self.chain_id, "no live nodes available")
		})?;
		lease.primary = Some(index);
		lease.renewed_at = Some(Instant::now());
		debug!(
			chain_id = %self.chain_id,
			node = %self.nodes[index].name(),
			"selected primary node"
		);
		Ok(self.nodes[index].client())
	}

	/// Every broadcast target: alive live nodes plus all send-only nodes.
	/// Dead nodes are excluded; send-only nodes carry no health state.
	pub(crate) fn broadcast_targets(&self) -> Vec<(String, Arc<VerifiedClient>)> {
		let mut targets: Vec<(String, Arc<VerifiedClient>)> = self
			.nodes
			.iter()
			.filter(|node| node.is_alive())
			.map(|node| (node.name().to_string(), node.client()))
			.collect();
		targets.extend(
			self.send_only
				.iter()
				.map(|node| (node.name().to_string(), node.client())),
		);
		targets
	}

	/// Name and health state of every pool member, in configuration order.
	pub fn node_states(&self) -> Vec<(String, String)> {
		let mut states: Vec<(String, String)> = self
			.nodes
			.iter()
			.map(|node| {
				let state = if node.is_alive() { "alive" } else { "dead" };
				(node.name().to_string(), state.to_string())
			})
			.collect();
		states.extend(
			self.send_only
				.iter()
				.map(|node| (node.name().to_string(), "send_only".to_string())),
		);
		states
	}

	fn is_selectable(&self, index: usize) -> bool {
		let best_head = self.best_alive_head();
		let state = self.nodes[index].snapshot();
		state.alive && state.head_slot + HEAD_SLOT_LAG_TOLERANCE >= best_head
	}

	fn best_alive_head(&self) -> u64 {
		self.nodes
			.iter()
			.map(|node| node.snapshot())
			.filter(|state| state.alive)
			.map(|state| state.head_slot)
			.max()
			.unwrap_or(0)
	}

	fn select_index(&self) -> Option<usize> {
		let snapshots: Vec<_> = self.nodes.iter().map(|node| node.snapshot()).collect();
		let best_head = snapshots
			.iter()
			.filter(|state| state.alive)
			.map(|state| state.head_slot)
			.max()?;

		let selectable: Vec<usize> = (0..snapshots.len())
			.filter(|&i| {
				let state = &snapshots[i];
				state.alive && state.head_slot + HEAD_SLOT_LAG_TOLERANCE >= best_head
			})
			.collect();
		if selectable.is_empty() {
			return None;
		}

		match self.cfg.selection_mode {
			// Iteration order breaks ties toward the lower index.
			SelectionMode::HighestHead => selectable
				.iter()
				.copied()
				.reduce(|best, i| {
					if snapshots[i].head_slot > snapshots[best].head_slot {
						i
					} else {
						best
					}
				}),
			SelectionMode::TotalDifficulty => selectable.iter().copied().reduce(|best, i| {
				if snapshots[i].weight > snapshots[best].weight {
					i
				} else {
					best
				}
			}),
			SelectionMode::RoundRobin => {
				let turn = self.round_robin.fetch_add(1, Ordering::Relaxed);
				Some(selectable[turn % selectable.len()])
			}
			SelectionMode::Priority => selectable.first().copied(),
		}
	}

	#[cfg(test)]
	fn node(&self, index: usize) -> &Arc<Node> {
		&self.nodes[index]
	}
}

#[async_trait]
impl Service for NodePool {
	fn name(&self) -> String {
		format!("NodePool.{}", self.chain_id)
	}

	async fn start(&self) -> anyhow::Result<()> {
		self.sm.begin_start()?;
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let mut handles = Vec::with_capacity(self.nodes.len());
		for node in &self.nodes {
			let node = Arc::clone(node);
			let mut shutdown = shutdown_rx.clone();
			let poll_interval = self.cfg.poll_interval();
			let death_declaration_delay = self.cfg.death_declaration_delay();
			handles.push(tokio::spawn(async move {
				let mut interval = tokio::time::interval(poll_interval);
				interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
				loop {
					tokio::select! {
						_ = shutdown.changed() => break,
						_ = interval.tick() => node.probe(death_declaration_delay).await,
					}
				}
			}));
		}

		{
			let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
			run.shutdown = Some(shutdown_tx);
			run.handles = handles;
		}
		self.sm.complete_start()?;
		debug!(chain_id = %self.chain_id, nodes = self.nodes.len(), "node pool started");
		Ok(())
	}

	async fn close(&self) -> anyhow::Result<()> {
		self.sm.begin_close()?;
		let (shutdown, handles) = {
			let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
			(run.shutdown.take(), std::mem::take(&mut run.handles))
		};
		if let Some(shutdown) = shutdown {
			let _ = shutdown.send(true);
		}
		// Every probe loop must have exited before close returns.
		for handle in handles {
			let _ = handle.await;
		}
		self.sm.complete_close()?;
		debug!(chain_id = %self.chain_id, "node pool closed");
		Ok(())
	}

	fn ready(&self) -> anyhow::Result<()> {
		self.sm.ready()
	}
}
