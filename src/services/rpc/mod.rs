//! Single-endpoint RPC layer.
//!
//! Defines the reader/writer interface every chain client exposes, and the
//! concrete [`RpcClient`] adapter over one HTTP JSON-RPC endpoint with
//! latency metrics, per-request deadlines, and duplicate-request
//! suppression.

pub(crate) mod coalescer;
mod client;
mod error;
mod http;
pub mod types;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

pub use client::{
	RpcClient, DEVNET_GENESIS_HASH, MAINNET_GENESIS_HASH, TESTNET_GENESIS_HASH,
};
pub use error::{error_codes, is_transaction_rejection, ClientError};
pub use types::{
	AccountInfo, AccountInfoOpts, BlockInfo, LatestBlockhash, RpcValue, SignatureStatus,
	SimulateOpts, SimulateResult,
};

/// Account-state access, the subset consumed by the balance monitor.
#[async_trait]
pub trait AccountReader: Send + Sync {
	/// Fetches account info. The peer's commitment overrides any commitment
	/// carried in `opts`; commitment is a peer-level policy.
	async fn account_info(
		&self,
		addr: &Pubkey,
		opts: AccountInfoOpts,
	) -> Result<RpcValue<Option<AccountInfo>>, ClientError>;
}

/// Read-side chain operations.
#[async_trait]
pub trait Reader: AccountReader {
	async fn balance(&self, addr: &Pubkey) -> Result<u64, ClientError>;

	/// Latest slot at `processed` commitment.
	async fn slot_height(&self) -> Result<u64, ClientError>;

	async fn latest_blockhash(&self) -> Result<RpcValue<LatestBlockhash>, ClientError>;

	/// Chain name derived from the genesis hash.
	async fn chain_id(&self) -> Result<String, ClientError>;

	/// Fee in lamports for a base64-encoded message.
	async fn fee_for_message(&self, message: &str) -> Result<u64, ClientError>;

	async fn latest_block(&self) -> Result<BlockInfo, ClientError>;

	async fn block(&self, slot: u64) -> Result<BlockInfo, ClientError>;

	async fn blocks_with_limit(
		&self,
		start_slot: u64,
		limit: u64,
	) -> Result<Vec<u64>, ClientError>;
}

/// Write-side chain operations.
#[async_trait]
pub trait Writer: Send + Sync {
	async fn send_tx(&self, tx: &Transaction) -> Result<Signature, ClientError>;

	/// Simulates a transaction. `None` opts default to signature
	/// verification at the peer's commitment.
	async fn simulate_tx(
		&self,
		tx: &Transaction,
		opts: Option<SimulateOpts>,
	) -> Result<SimulateResult, ClientError>;

	/// Looks up statuses without searching transaction history. Null entries
	/// are preserved by position.
	async fn signature_statuses(
		&self,
		sigs: &[Signature],
	) -> Result<Vec<Option<SignatureStatus>>, ClientError>;
}

/// Full chain client capability.
pub trait ReaderWriter: Reader + Writer {}

impl<T: Reader + Writer> ReaderWriter for T {}
