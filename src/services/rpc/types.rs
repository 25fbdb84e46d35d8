//! Wire types for the Solana JSON-RPC surface.
//!
//! Only the fields the fabric consumes are modelled; anything passed through
//! untouched (simulation account data, block transactions) stays a
//! [`serde_json::Value`]. Pubkeys, hashes, and signatures travel as base58
//! strings on the wire and are parsed at the typed boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context attached to every value-bearing RPC response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcContext {
	pub slot: u64,
}

/// Standard `{context, value}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcValue<T> {
	pub context: RpcContext,
	pub value: T,
}

/// Result of `getLatestBlockhash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
	pub blockhash: String,
	pub last_valid_block_height: u64,
}

/// One entry of `getSignatureStatuses`. Null entries are preserved by
/// position in the surrounding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
	pub slot: u64,
	pub confirmations: Option<u64>,
	/// Null for successful transactions.
	#[serde(default)]
	pub err: Option<Value>,
	#[serde(default)]
	pub confirmation_status: Option<String>,
}

impl SignatureStatus {
	pub fn is_err(&self) -> bool {
		self.err.is_some()
	}
}

/// Options for `simulateTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateOpts {
	pub sig_verify: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub commitment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub replace_recent_blockhash: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accounts: Option<Value>,
}

/// Result of `simulateTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResult {
	/// Null when the simulated transaction would succeed.
	#[serde(default)]
	pub err: Option<Value>,
	#[serde(default)]
	pub logs: Option<Vec<String>>,
	#[serde(default)]
	pub accounts: Option<Value>,
	#[serde(default)]
	pub units_consumed: Option<u64>,
}

/// Options forwarded to `getAccountInfo`. The peer's commitment always
/// overrides `commitment`; the field exists so callers can express intent
/// through a shared opts value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoOpts {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub encoding: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub commitment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data_slice: Option<DataSlice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_context_slot: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSlice {
	pub offset: u64,
	pub length: u64,
}

/// Account payload of `getAccountInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
	pub lamports: u64,
	pub owner: String,
	#[serde(default)]
	pub data: Value,
	#[serde(default)]
	pub executable: bool,
	#[serde(default)]
	pub rent_epoch: u64,
}

/// Result of `getBlock`, trimmed to the fields the fabric reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
	pub blockhash: String,
	pub previous_blockhash: String,
	pub parent_slot: u64,
	#[serde(default)]
	pub block_time: Option<i64>,
	#[serde(default)]
	pub block_height: Option<u64>,
	#[serde(default)]
	pub transactions: Option<Value>,
	#[serde(default)]
	pub signatures: Option<Vec<String>>,
}

/// Request options for `getBlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBlockOpts {
	pub encoding: String,
	pub commitment: String,
	pub max_supported_transaction_version: u8,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_details: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rewards: Option<bool>,
}

impl GetBlockOpts {
	/// Full block at the given commitment, accepting both legacy and v0
	/// transactions.
	pub fn full(commitment: &str) -> Self {
		Self {
			encoding: "json".to_string(),
			commitment: commitment.to_string(),
			max_supported_transaction_version: 0,
			transaction_details: Some("full".to_string()),
			rewards: Some(false),
		}
	}
}
