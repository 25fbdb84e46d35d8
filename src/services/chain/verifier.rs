//! Chain-identity verification.
//!
//! A [`VerifiedClient`] wraps a client so that no operation reaches the
//! endpoint until its genesis-derived chain name has been checked against the
//! configured chain id. Verification happens on the first operation rather
//! than at construction, so a temporarily unreachable endpoint does not fail
//! chain startup. Once verified, a client stays verified for its lifetime; a
//! mismatched endpoint keeps failing every operation.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tokio::sync::RwLock;

use crate::services::rpc::types::{
	AccountInfo, AccountInfoOpts, BlockInfo, LatestBlockhash, RpcValue, SignatureStatus,
	SimulateOpts, SimulateResult,
};
use crate::services::rpc::{AccountReader, ClientError, Reader, ReaderWriter, Writer};

#[derive(Debug, Default)]
struct Verification {
	observed: String,
	verified: bool,
}

impl std::fmt::Debug for VerifiedClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VerifiedClient")
			.field("url", &self.url)
			.field("expected_chain_id", &self.expected_chain_id)
			.finish_non_exhaustive()
	}
}

/// Chain-identity-gated wrapper over a client.
pub struct VerifiedClient {
	inner: Arc<dyn ReaderWriter>,
	url: String,
	expected_chain_id: String,
	verification: RwLock<Verification>,
}

impl VerifiedClient {
	pub fn new(inner: Arc<dyn ReaderWriter>, url: &str, expected_chain_id: &str) -> Self {
		Self {
			inner,
			url: url.to_string(),
			expected_chain_id: expected_chain_id.to_string(),
			verification: RwLock::new(Verification::default()),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub async fn is_verified(&self) -> bool {
		self.verification.read().await.verified
	}

	/// Fast path reads the flag; the slow path holds the write guard across
	/// the chain-id fetch so exactly one verification request runs. Failed
	/// fetches leave the flag false; the next operation re-attempts. No
	/// retry happens at this layer.
	async fn ensure_verified(&self) -> Result<(), ClientError> {
		{
			let verification = self.verification.read().await;
			if verification.verified {
				return Ok(());
			}
		}

		let mut verification = self.verification.write().await;
		if verification.verified {
			// Lost the race to another caller that verified meanwhile.
			return Ok(());
		}

		let observed = self.inner.chain_id().await?.to_lowercase();
		verification.observed = observed.clone();

		let expected = self.expected_chain_id.to_lowercase();
		if observed != expected {
			return Err(ClientError::chain_id_mismatch(expected, observed, &self.url));
		}

		verification.verified = true;
		Ok(())
	}
}

#[async_trait]
impl AccountReader for VerifiedClient {
	async fn account_info(
		&self,
		addr: &Pubkey,
		opts: AccountInfoOpts,
	) -> Result<RpcValue<Option<AccountInfo>>, ClientError> {
		self.ensure_verified().await?;
		self.inner.account_info(addr, opts).await
	}
}

#[async_trait]
impl Reader for VerifiedClient {
	async fn balance(&self, addr: &Pubkey) -> Result<u64, ClientError> {
		self.ensure_verified().await?;
		self.inner.balance(addr).await
	}

	async fn slot_height(&self) -> Result<u64, ClientError> {
		self.ensure_verified().await?;
		self.inner.slot_height().await
	}

	async fn latest_blockhash(&self) -> Result<RpcValue<LatestBlockhash>, ClientError> {
		self.ensure_verified().await?;
		self.inner.latest_blockhash().await
	}

	async fn chain_id(&self) -> Result<String, ClientError> {
		self.ensure_verified().await?;
		Ok(self.verification.read().await.observed.clone())
	}

	async fn fee_for_message(&self, message: &str) -> Result<u64, ClientError> {
		self.ensure_verified().await?;
		self.inner.fee_for_message(message).await
	}

	async fn latest_block(&self) -> Result<BlockInfo, ClientError> {
		self.ensure_verified().await?;
		self.inner.latest_block().await
	}

	async fn block(&self, slot: u64) -> Result<BlockInfo, ClientError> {
		self.ensure_verified().await?;
		self.inner.block(slot).await
	}

	async fn blocks_with_limit(
		&self,
		start_slot: u64,
		limit: u64,
	) -> Result<Vec<u64>, ClientError> {
		self.ensure_verified().await?;
		self.inner.blocks_with_limit(start_slot, limit).await
	}
}

#[async_trait]
impl Writer for VerifiedClient {
	async fn send_tx(&self, tx: &Transaction) -> Result<Signature, ClientError> {
		self.ensure_verified().await?;
		self.inner.send_tx(tx).await
	}

	async fn simulate_tx(
		&self,
		tx: &Transaction,
		opts: Option<SimulateOpts>,
	) -> Result<SimulateResult, ClientError> {
		self.ensure_verified().await?;
		self.inner.simulate_tx(tx, opts).await
	}

	async fn signature_statuses(
		&self,
		sigs: &[Signature],
	) -> Result<Vec<Option<SignatureStatus>>, ClientError> {
		self.ensure_verified().await?;
		self.inner.signature_statuses(sigs).await
	}
}
