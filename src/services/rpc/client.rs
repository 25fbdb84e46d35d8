//! RPC peer implementation.
//!
//! One [`RpcClient`] adapts one HTTP JSON-RPC endpoint. Every operation
//! applies the peer's request timeout (or the transaction timeout for
//! writes), records a latency sample labelled by operation name and URL, and
//! classifies failures. All idempotent reads are deduplicated through the
//! per-peer request group: concurrent identical calls share one network
//! request.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{instrument, warn};

use crate::models::{ChainConfig, Commitment};
use crate::utils::metrics::LatencyGuard;

use super::coalescer::RequestGroup;
use super::error::ClientError;
use super::http::HttpTransport;
use super::types::{
	AccountInfo, AccountInfoOpts, BlockInfo, GetBlockOpts, LatestBlockhash, RpcValue,
	SignatureStatus, SimulateOpts, SimulateResult,
};
use super::{AccountReader, Reader, Writer};

pub const DEVNET_GENESIS_HASH: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1wcaWoxPkrZBG";
pub const TESTNET_GENESIS_HASH: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3zQawwpjk2NsNY";
pub const MAINNET_GENESIS_HASH: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d";

/// RPC method constants.
mod rpc_methods {
	pub const GET_BALANCE: &str = "getBalance";
	pub const GET_SLOT: &str = "getSlot";
	pub const GET_LATEST_BLOCKHASH: &str = "getLatestBlockhash";
	pub const GET_GENESIS_HASH: &str = "getGenesisHash";
	pub const GET_FEE_FOR_MESSAGE: &str = "getFeeForMessage";
	pub const GET_SIGNATURE_STATUSES: &str = "getSignatureStatuses";
	pub const SIMULATE_TRANSACTION: &str = "simulateTransaction";
	pub const SEND_TRANSACTION: &str = "sendTransaction";
	pub const GET_ACCOUNT_INFO: &str = "getAccountInfo";
	pub const GET_BLOCK: &str = "getBlock";
	pub const GET_BLOCKS_WITH_LIMIT: &str = "getBlocksWithLimit";
}

/// Maps a genesis hash to its chain name, `None` for unknown hashes.
fn chain_name_for_genesis(hash: &str) -> Option<&'static str> {
	match hash {
		DEVNET_GENESIS_HASH => Some("devnet"),
		TESTNET_GENESIS_HASH => Some("testnet"),
		MAINNET_GENESIS_HASH => Some("mainnet"),
		_ => None,
	}
}

/// A client for one RPC endpoint of a Solana-family chain.
///
/// The client owns its HTTP connection for its lifetime and is exclusively
/// owned by exactly one registry entry or pool slot.
impl std::fmt::Debug for RpcClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RpcClient").finish_non_exhaustive()
	}
}

pub struct RpcClient {
	transport: HttpTransport,
	commitment: Commitment,
	skip_preflight: bool,
	max_retries: Option<u64>,
	request_timeout: Duration,
	tx_timeout: Duration,
	request_group: RequestGroup,
}

impl RpcClient {
	pub fn new(
		url: &str,
		cfg: &ChainConfig,
		request_timeout: Duration,
	) -> Result<Self, ClientError> {
		Ok(Self {
			transport: HttpTransport::new(url)?,
			commitment: cfg.commitment,
			skip_preflight: cfg.skip_preflight,
			max_retries: cfg.max_retries,
			request_timeout,
			tx_timeout: cfg.tx_timeout(),
			request_group: RequestGroup::new(),
		})
	}

	pub fn url(&self) -> &str {
		self.transport.url()
	}

	pub fn commitment(&self) -> Commitment {
		self.commitment
	}

	/// Latest slot at an explicit commitment, bypassing the default
	/// `processed` of [`Reader::slot_height`].
	pub async fn slot_height_with_commitment(
		&self,
		commitment: Commitment,
	) -> Result<u64, ClientError> {
		let _latency = LatencyGuard::new("slot_height", self.url());
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let params = json!([{ "commitment": commitment.as_str() }]);
		self.request_group
			.run(
				&format!("GetSlotHeight({})", commitment.as_str()),
				async move {
					transport
						.request::<u64>(rpc_methods::GET_SLOT, params, timeout)
						.await
				},
			)
			.await
	}

	fn encode_tx(tx: &Transaction) -> Result<String, ClientError> {
		let bytes = bincode::serialize(tx)
			.map_err(|e| ClientError::internal(format!("failed to serialize transaction: {e}")))?;
		Ok(BASE64_STANDARD.encode(bytes))
	}
}

#[async_trait]
impl AccountReader for RpcClient {
	#[instrument(skip(self, opts), fields(url = %self.url()))]
	async fn account_info(
		&self,
		addr: &Pubkey,
		mut opts: AccountInfoOpts,
	) -> Result<RpcValue<Option<AccountInfo>>, ClientError> {
		let _latency = LatencyGuard::new("account_info", self.url());
		// Overrides any caller-supplied value; commitment is peer policy.
		opts.commitment = Some(self.commitment.as_str().to_string());
		if opts.encoding.is_none() {
			opts.encoding = Some("base64".to_string());
		}
		let opts_key = serde_json::to_string(&opts)
			.map_err(|e| ClientError::internal(format!("failed to encode account opts: {e}")))?;
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let params = json!([addr.to_string(), opts]);
		self.request_group
			.run(&format!("GetAccountInfo({addr},{opts_key})"), async move {
				transport
					.request(rpc_methods::GET_ACCOUNT_INFO, params, timeout)
					.await
			})
			.await
	}
}

#[async_trait]
impl Reader for RpcClient {
	#[instrument(skip(self), fields(url = %self.url()))]
	async fn balance(&self, addr: &Pubkey) -> Result<u64, ClientError> {
		let _latency = LatencyGuard::new("balance", self.url());
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let params = json!([addr.to_string(), { "commitment": self.commitment.as_str() }]);
		let result: RpcValue<u64> = self
			.request_group
			.run(&format!("GetBalance({addr})"), async move {
				transport
					.request(rpc_methods::GET_BALANCE, params, timeout)
					.await
			})
			.await?;
		Ok(result.value)
	}

	async fn slot_height(&self) -> Result<u64, ClientError> {
		// Latest slot regardless of the peer commitment.
		self.slot_height_with_commitment(Commitment::Processed).await
	}

	#[instrument(skip(self), fields(url = %self.url()))]
	async fn latest_blockhash(&self) -> Result<RpcValue<LatestBlockhash>, ClientError> {
		let _latency = LatencyGuard::new("latest_blockhash", self.url());
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let params = json!([{ "commitment": self.commitment.as_str() }]);
		self.request_group
			.run("GetLatestBlockhash", async move {
				transport
					.request(rpc_methods::GET_LATEST_BLOCKHASH, params, timeout)
					.await
			})
			.await
	}

	#[instrument(skip(self), fields(url = %self.url()))]
	async fn chain_id(&self) -> Result<String, ClientError> {
		let _latency = LatencyGuard::new("chain_id", self.url());
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let hash: String = self
			.request_group
			.run("GetGenesisHash", async move {
				transport
					.request(rpc_methods::GET_GENESIS_HASH, json!([]), timeout)
					.await
			})
			.await?;

		let network = chain_name_for_genesis(&hash).unwrap_or_else(|| {
			warn!(
				url = %self.url(),
				genesis_hash = %hash,
				"unknown genesis hash, assuming chain is localnet"
			);
			"localnet"
		});
		Ok(network.to_string())
	}

	#[instrument(skip(self, message), fields(url = %self.url()))]
	async fn fee_for_message(&self, message: &str) -> Result<u64, ClientError> {
		let _latency = LatencyGuard::new("fee_for_message", self.url());
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let url = self.url().to_string();
		let params = json!([message, { "commitment": self.commitment.as_str() }]);
		let result: RpcValue<Option<u64>> = self
			.request_group
			.run(&format!("GetFeeForMessage({message})"), async move {
				transport
					.request(rpc_methods::GET_FEE_FOR_MESSAGE, params, timeout)
					.await
			})
			.await?;

		// A null fee means the blockhash in the message is unknown.
		result
			.value
			.ok_or_else(|| ClientError::null_payload(rpc_methods::GET_FEE_FOR_MESSAGE, url))
	}

	#[instrument(skip(self), fields(url = %self.url()))]
	async fn latest_block(&self) -> Result<BlockInfo, ClientError> {
		let slot = self.slot_height_with_commitment(self.commitment).await?;
		self.block(slot).await
	}

	#[instrument(skip(self), fields(url = %self.url()))]
	async fn block(&self, slot: u64) -> Result<BlockInfo, ClientError> {
		let _latency = LatencyGuard::new("get_block", self.url());
		let transport = self.transport.clone();
		let timeout = self.tx_timeout;
		let params = json!([slot, GetBlockOpts::full(self.commitment.as_str())]);
		self.request_group
			.run(&format!("GetBlock({slot})"), async move {
				transport
					.request(rpc_methods::GET_BLOCK, params, timeout)
					.await
			})
			.await
	}

	#[instrument(skip(self), fields(url = %self.url()))]
	async fn blocks_with_limit(
		&self,
		start_slot: u64,
		limit: u64,
	) -> Result<Vec<u64>, ClientError> {
		let _latency = LatencyGuard::new("get_blocks_with_limit", self.url());
		let transport = self.transport.clone();
		let timeout = self.tx_timeout;
		let params = json!([start_slot, limit, { "commitment": self.commitment.as_str() }]);
		self.request_group
			.run(
				&format!("GetBlocksWithLimit({start_slot},{limit})"),
				async move {
					transport
						.request(rpc_methods::GET_BLOCKS_WITH_LIMIT, params, timeout)
						.await
				},
			)
			.await
	}
}

#[async_trait]
impl Writer for RpcClient {
	#[instrument(skip(self, tx), fields(url = %self.url()))]
	async fn send_tx(&self, tx: &Transaction) -> Result<Signature, ClientError> {
		let _latency = LatencyGuard::new("send_tx", self.url());
		let encoded = Self::encode_tx(tx)?;
		let mut opts = json!({
			"encoding": "base64",
			"skipPreflight": self.skip_preflight,
			"preflightCommitment": self.commitment.as_str(),
		});
		if let Some(max_retries) = self.max_retries {
			opts["maxRetries"] = json!(max_retries);
		}
		let params = json!([encoded, opts]);
		let signature: String = self
			.transport
			.request(rpc_methods::SEND_TRANSACTION, params, self.tx_timeout)
			.await?;
		signature.parse::<Signature>().map_err(|e| {
			ClientError::transport(
				rpc_methods::SEND_TRANSACTION,
				self.url(),
				format!("invalid signature in response: {e}"),
			)
		})
	}

	#[instrument(skip(self, tx, opts), fields(url = %self.url()))]
	async fn simulate_tx(
		&self,
		tx: &Transaction,
		opts: Option<SimulateOpts>,
	) -> Result<SimulateResult, ClientError> {
		let _latency = LatencyGuard::new("simulate_tx", self.url());
		let encoded = Self::encode_tx(tx)?;
		let opts = opts.unwrap_or_else(|| SimulateOpts {
			sig_verify: true,
			commitment: Some(self.commitment.as_str().to_string()),
			replace_recent_blockhash: None,
			accounts: None,
		});
		let mut opts_value = serde_json::to_value(&opts)
			.map_err(|e| ClientError::internal(format!("failed to encode simulate opts: {e}")))?;
		opts_value["encoding"] = json!("base64");
		let params = json!([encoded, opts_value]);
		let result: RpcValue<SimulateResult> = self
			.transport
			.request(rpc_methods::SIMULATE_TRANSACTION, params, self.request_timeout)
			.await?;
		Ok(result.value)
	}

	#[instrument(skip(self, sigs), fields(url = %self.url(), count = sigs.len()))]
	async fn signature_statuses(
		&self,
		sigs: &[Signature],
	) -> Result<Vec<Option<SignatureStatus>>, ClientError> {
		let _latency = LatencyGuard::new("signature_statuses", self.url());
		let encoded: Vec<String> = sigs.iter().map(|s| s.to_string()).collect();
		let key = format!("GetSignatureStatuses({})", encoded.join(","));
		let transport = self.transport.clone();
		let timeout = self.request_timeout;
		let params = json!([encoded, { "searchTransactionHistory": false }]);
		let result: RpcValue<Vec<Option<SignatureStatus>>> = self
			.request_group
			.run(&key, async move {
				transport
					.request(rpc_methods::GET_SIGNATURE_STATUSES, params, timeout)
					.await
			})
			.await?;
		Ok(result.value)
	}
}
