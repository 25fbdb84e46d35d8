//! Façade payload types reported to higher layers.

use serde::{Deserialize, Serialize};

/// Most recent head of the chain as observed through a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
	/// Block height as a decimal string.
	pub height: String,
	/// Blockhash bytes (base58 text form).
	pub hash: Vec<u8>,
	/// Block time, unix seconds.
	pub timestamp: u64,
}

/// Summary of one configured chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
	pub id: String,
	pub enabled: bool,
	/// Serialised configuration (JSON).
	pub config: String,
}

/// Summary of one configured node, as listed by the façade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
	pub chain_id: String,
	pub name: String,
	/// Serialised node configuration (JSON).
	pub config: String,
	/// Pool health state where known; empty in single-node mode.
	pub state: String,
}
