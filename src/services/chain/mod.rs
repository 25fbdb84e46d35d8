//! Chain façade and its external collaborators.
//!
//! The façade owns either the single-node client registry or the multi-node
//! pool plus transaction sender, wires the injected transaction manager and
//! balance monitor into them, and drives the whole set through one
//! lifecycle.
//!
//! The transaction manager and balance monitor are collaborators, not part
//! of this crate: only their interfaces are fixed here. They are injected as
//! factories so the chain can hand them a lazy client loader and, in
//! multi-node mode, the pool-backed send function.

#[allow(clippy::module_inception)]
mod chain;
mod registry;
mod verifier;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::services::lifecycle::Service;
use crate::services::rpc::{ClientError, ReaderWriter};

pub use chain::{validate_balance, Chain};
pub use registry::ClientRegistry;
pub use verifier::VerifiedClient;

/// Lazily yields a usable client. Single-node mode resolves through the
/// registry's random pick; multi-node mode re-selects from the pool on every
/// call.
pub type ClientLoader =
	Arc<dyn Fn() -> Result<Arc<dyn ReaderWriter>, ClientError> + Send + Sync>;

/// Chain-routed transaction submission handed to the transaction manager.
pub type SendTxFn =
	Arc<dyn Fn(Transaction) -> BoxFuture<'static, Result<Signature, ClientError>> + Send + Sync>;

/// Delegated signing interface. The chain never holds key material.
#[async_trait]
pub trait Keystore: Send + Sync {
	async fn sign(&self, account: &Pubkey, message: &[u8]) -> anyhow::Result<Signature>;
}

/// Fee and compute parameters attached to an enqueued transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxOptions {
	pub compute_unit_limit: Option<u32>,
	pub compute_unit_price_min: u64,
	pub compute_unit_price_max: u64,
	pub base_compute_unit_price: u64,
	pub fee_bump_period: Duration,
}

/// Transaction lifecycle manager interface (external collaborator).
#[async_trait]
pub trait TxManager: Service {
	async fn enqueue(&self, id: &str, tx: Transaction, opts: TxOptions) -> anyhow::Result<()>;
}

/// Balance poller interface (external collaborator).
pub trait BalanceMonitor: Service {}

/// Everything the chain provides to a transaction manager.
pub struct TxManagerDeps {
	pub chain_id: String,
	pub client: ClientLoader,
	pub send_tx: SendTxFn,
	pub keystore: Arc<dyn Keystore>,
}

/// Everything the chain provides to a balance monitor.
pub struct BalanceMonitorDeps {
	pub chain_id: String,
	pub client: ClientLoader,
	pub keystore: Arc<dyn Keystore>,
}

pub type TxManagerFactory = Box<dyn FnOnce(TxManagerDeps) -> Arc<dyn TxManager> + Send>;
pub type BalanceMonitorFactory =
	Box<dyn FnOnce(BalanceMonitorDeps) -> Arc<dyn BalanceMonitor> + Send>;

/// Options for constructing a [`Chain`].
pub struct ChainOpts {
	pub keystore: Arc<dyn Keystore>,
	pub tx_manager: TxManagerFactory,
	pub balance_monitor: BalanceMonitorFactory,
}
