//! Domain models and data structures for the chain client.
//!
//! - `config`: configuration for chains, nodes, and the multi-node pool
//! - `core`: payload types reported through the chain façade

mod config;
mod core;

pub use config::{
	ChainConfig, Commitment, MultiNodeConfig, NodeConfig, SelectionMode, DEFAULT_REQUEST_TIMEOUT,
};
pub use core::{ChainStatus, Head, NodeStatus};
