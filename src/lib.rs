//! Multi-endpoint RPC client fabric for Solana-family chains.
//!
//! This crate exposes a single façade, [`services::chain::Chain`], that lets
//! higher layers submit transactions, read account state, and monitor chain
//! health across a fleet of remote RPC endpoints. It hides endpoint
//! selection, chain-identity verification, duplicate-request suppression,
//! and failure classification.
//!
//! - `models`: configuration and façade payload types
//! - `services`: the RPC fabric (peer, coalescer, verifier, registry,
//!   multi-node pool, transaction sender) and the chain façade
//! - `utils`: process-wide metrics and shared test builders

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
	ChainConfig, ChainStatus, Commitment, Head, MultiNodeConfig, NodeConfig, NodeStatus,
	SelectionMode,
};
pub use services::chain::{
	Chain, ChainOpts, ClientLoader, Keystore, TxManager, TxOptions,
};
pub use services::rpc::{ClientError, Reader, ReaderWriter, RpcClient, Writer};
