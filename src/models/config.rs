//! Chain client configuration.
//!
//! The option set is closed: everything the fabric recognises is declared
//! here, with serde defaults matching the values used in production. Duration
//! options are carried as millisecond fields and exposed as [`Duration`]
//! accessors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout applied to every read request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn default_true() -> bool {
	true
}

fn default_tx_timeout_ms() -> u64 {
	60_000
}

fn default_death_declaration_delay_ms() -> u64 {
	10_000
}

fn default_poll_interval_ms() -> u64 {
	10_000
}

/// Confirmation depth requested of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
	/// The node's most recent block (may be skipped later).
	Processed,
	/// The most recent block voted on by a supermajority.
	#[default]
	Confirmed,
	/// The most recent block finalized by the cluster.
	Finalized,
}

impl Commitment {
	pub fn as_str(&self) -> &'static str {
		match self {
			Commitment::Processed => "processed",
			Commitment::Confirmed => "confirmed",
			Commitment::Finalized => "finalized",
		}
	}
}

/// How the multi-node pool picks its primary peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
	/// Peer with the largest observed head slot, ties broken by lower index.
	#[default]
	HighestHead,
	/// Rotate through live peers in index order.
	RoundRobin,
	/// First live peer in the configured order.
	Priority,
	/// Peer with the largest weight. Unused on Solana-family chains, kept
	/// for generality with other chain families.
	TotalDifficulty,
}

/// One RPC endpoint. Names are unique within a chain; the order of
/// non-send-only nodes is stable and used as the selection tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
	pub name: String,
	pub url: String,
	/// Send-only nodes are used exclusively for transaction broadcast.
	#[serde(default)]
	pub send_only: bool,
}

/// Multi-node pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiNodeConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub selection_mode: SelectionMode,
	/// How long a selected primary is reused before selection is
	/// re-evaluated. Zero re-evaluates on every call.
	#[serde(default)]
	pub lease_duration_ms: u64,
	/// Minimum duration of continuous probe failure before a node is
	/// declared dead.
	#[serde(default = "default_death_declaration_delay_ms")]
	pub death_declaration_delay_ms: u64,
	/// Health probe cadence.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

impl Default for MultiNodeConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			selection_mode: SelectionMode::default(),
			lease_duration_ms: 0,
			death_declaration_delay_ms: default_death_declaration_delay_ms(),
			poll_interval_ms: default_poll_interval_ms(),
		}
	}
}

impl MultiNodeConfig {
	pub fn lease_duration(&self) -> Duration {
		Duration::from_millis(self.lease_duration_ms)
	}

	pub fn death_declaration_delay(&self) -> Duration {
		Duration::from_millis(self.death_declaration_delay_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

/// Top-level configuration for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
	/// Expected chain identity; every peer is verified against it.
	pub chain_id: String,
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default)]
	pub commitment: Commitment,
	#[serde(default = "default_true")]
	pub skip_preflight: bool,
	/// Resubmission count hint passed to `sendTransaction`; `None` leaves
	/// the RPC default in place.
	#[serde(default)]
	pub max_retries: Option<u64>,
	#[serde(default = "default_tx_timeout_ms")]
	pub tx_timeout_ms: u64,
	#[serde(default)]
	pub nodes: Vec<NodeConfig>,
	#[serde(default)]
	pub multi_node: MultiNodeConfig,
}

impl ChainConfig {
	pub fn new(chain_id: impl Into<String>) -> Self {
		Self {
			chain_id: chain_id.into(),
			enabled: true,
			commitment: Commitment::default(),
			skip_preflight: true,
			max_retries: None,
			tx_timeout_ms: default_tx_timeout_ms(),
			nodes: Vec::new(),
			multi_node: MultiNodeConfig::default(),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn tx_timeout(&self) -> Duration {
		Duration::from_millis(self.tx_timeout_ms)
	}
}
