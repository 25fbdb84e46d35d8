//! Raw JSON-RPC transport over HTTP.
//!
//! One transport per endpoint, owning its `reqwest::Client` for the peer's
//! lifetime. The transport never retries: transient failures are surfaced to
//! callers, which decide whether to retry or try another peer.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{is_transaction_rejection, ClientError};

#[derive(Debug, Deserialize)]
struct JsonRpcError {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<JsonRpcError>,
}

/// HTTP JSON-RPC connection to a single endpoint.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
	url: String,
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(url: &str) -> Result<Self, ClientError> {
		reqwest::Url::parse(url)
			.map_err(|e| ClientError::config(format!("invalid node url {url}: {e}")))?;
		Ok(Self {
			url: url.to_string(),
			client: reqwest::Client::new(),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Sends one JSON-RPC request and decodes the typed result.
	///
	/// The deadline covers the whole exchange; an elapsed deadline maps to
	/// [`ClientError::Cancelled`]. JSON-RPC error objects are classified into
	/// protocol rejections or plain RPC errors by code.
	pub async fn request<R>(
		&self,
		method: &'static str,
		params: Value,
		timeout: Duration,
	) -> Result<R, ClientError>
	where
		R: DeserializeOwned,
	{
		let body = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
		});

		let send = self.client.post(&self.url).json(&body).send();
		let response = tokio::time::timeout(timeout, send)
			.await
			.map_err(|_| ClientError::cancelled(method, &self.url))?
			.map_err(|e| self.classify_reqwest(method, e))?;

		let status = response.status();
		if !status.is_success() {
			return Err(ClientError::transport(
				method,
				&self.url,
				format!("http status {status}"),
			));
		}

		let decoded: JsonRpcResponse = tokio::time::timeout(timeout, response.json())
			.await
			.map_err(|_| ClientError::cancelled(method, &self.url))?
			.map_err(|e| self.classify_reqwest(method, e))?;

		if let Some(error) = decoded.error {
			if is_transaction_rejection(error.code) {
				return Err(ClientError::tx_rejected(&self.url, error.code, error.message));
			}
			return Err(ClientError::rpc(method, &self.url, error.code, error.message));
		}

		let result = decoded
			.result
			.ok_or_else(|| ClientError::null_payload(method, &self.url))?;
		if result.is_null() && !allows_null::<R>() {
			return Err(ClientError::null_payload(method, &self.url));
		}

		serde_json::from_value(result).map_err(|e| {
			ClientError::transport(
				method,
				&self.url,
				format!("unexpected response structure: {e}"),
			)
		})
	}

	fn classify_reqwest(&self, method: &'static str, e: reqwest::Error) -> ClientError {
		if e.is_timeout() {
			ClientError::cancelled(method, &self.url)
		} else {
			ClientError::transport(method, &self.url, e.to_string())
		}
	}
}

/// Whether `R` can represent a JSON null on its own.
fn allows_null<R: DeserializeOwned>() -> bool {
	serde_json::from_value::<R>(Value::Null).is_ok()
}
