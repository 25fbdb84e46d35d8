//! Client error types.
//!
//! One taxonomy covers the whole fabric: configuration problems, chain
//! identity mismatches, transport failures, RPC-level errors, missing
//! payloads, protocol rejections, and cancellation. Errors are `Clone`
//! because the request coalescer delivers one outcome to many waiters, so
//! underlying causes are flattened into the message instead of boxed.

use thiserror::Error;

/// Chain client error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
	/// Invalid or unusable configuration. Fatal at construction or first use.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// The peer's observed chain identity does not match the configured one.
	/// The peer is rejected for the life of the process.
	#[error("client returned mismatched chain id (expected: {expected}, got: {got}): {url}")]
	ChainIdMismatch {
		expected: String,
		got: String,
		url: String,
	},

	/// Network-level failure or malformed response body.
	#[error("transport error in {method} ({url}): {message}")]
	Transport {
		method: &'static str,
		url: String,
		message: String,
	},

	/// The RPC answered with a JSON-RPC error object.
	#[error("rpc error in {method} ({url}): {message} (code {code})")]
	Rpc {
		method: &'static str,
		url: String,
		code: i64,
		message: String,
	},

	/// The RPC succeeded but a required value was absent.
	#[error("rpc returned null value in {method} ({url})")]
	NullPayload { method: &'static str, url: String },

	/// The RPC accepted the request but the chain rejected the transaction.
	#[error("transaction rejected ({url}): {message} (code {code})")]
	TxRejected {
		url: String,
		code: i64,
		message: String,
	},

	/// Deadline exceeded or the request was cancelled.
	#[error("request cancelled in {method} ({url}): deadline exceeded")]
	Cancelled { method: &'static str, url: String },

	/// Invariant failure inside the fabric itself.
	#[error("internal error: {0}")]
	Internal(String),
}

impl ClientError {
	pub fn config(message: impl Into<String>) -> Self {
		Self::Config(message.into())
	}

	pub fn chain_id_mismatch(
		expected: impl Into<String>,
		got: impl Into<String>,
		url: impl Into<String>,
	) -> Self {
		Self::ChainIdMismatch {
			expected: expected.into(),
			got: got.into(),
			url: url.into(),
		}
	}

	pub fn transport(method: &'static str, url: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Transport {
			method,
			url: url.into(),
			message: message.into(),
		}
	}

	pub fn rpc(
		method: &'static str,
		url: impl Into<String>,
		code: i64,
		message: impl Into<String>,
	) -> Self {
		Self::Rpc {
			method,
			url: url.into(),
			code,
			message: message.into(),
		}
	}

	pub fn null_payload(method: &'static str, url: impl Into<String>) -> Self {
		Self::NullPayload {
			method,
			url: url.into(),
		}
	}

	pub fn tx_rejected(url: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
		Self::TxRejected {
			url: url.into(),
			code,
			message: message.into(),
		}
	}

	pub fn cancelled(method: &'static str, url: impl Into<String>) -> Self {
		Self::Cancelled {
			method,
			url: url.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal(message.into())
	}

	/// True for protocol-level rejections reported by an accepting peer.
	pub fn is_rejection(&self) -> bool {
		matches!(self, Self::TxRejected { .. })
	}

	/// True for failures a caller may retry against another peer.
	pub fn is_transport(&self) -> bool {
		matches!(
			self,
			Self::Transport { .. } | Self::Rpc { .. } | Self::NullPayload { .. } | Self::Cancelled { .. }
		)
	}

	pub fn is_mismatch(&self) -> bool {
		matches!(self, Self::ChainIdMismatch { .. })
	}
}

/// Known JSON-RPC error codes.
pub mod error_codes {
	/// Transaction preflight simulation failed.
	pub const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;
	/// Transaction signature verification failed.
	pub const TRANSACTION_SIGNATURE_VERIFICATION_FAILURE: i64 = -32003;
	/// Block not available (slot was skipped or not produced yet).
	pub const BLOCK_NOT_AVAILABLE: i64 = -32004;
	/// Slot was skipped.
	pub const SLOT_SKIPPED: i64 = -32007;
	/// Invalid parameters.
	#[allow(dead_code)]
	pub const INVALID_PARAMS: i64 = -32602;
	/// Internal error.
	#[allow(dead_code)]
	pub const INTERNAL_ERROR: i64 = -32603;
}

/// Checks whether an RPC error code means the chain rejected the transaction
/// itself, as opposed to the request failing.
pub fn is_transaction_rejection(code: i64) -> bool {
	matches!(
		code,
		error_codes::SEND_TRANSACTION_PREFLIGHT_FAILURE
			| error_codes::TRANSACTION_SIGNATURE_VERIFICATION_FAILURE
	)
}
