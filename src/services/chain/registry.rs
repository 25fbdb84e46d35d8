//! URL-keyed cache of verified clients for single-node selection.
//!
//! Clients are created lazily on first need and live until the chain is
//! closed; entries are never evicted (the map is bounded by the endpoint
//! count). Selection takes a random permutation of the configured endpoints
//! and returns the first one a client can be constructed for. Chain-id
//! verification is not performed here; it happens on the first operation of
//! the returned client.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::models::{ChainConfig, NodeConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::services::rpc::{ClientError, RpcClient};

use super::verifier::VerifiedClient;

/// Read-mostly cache of verified clients, keyed by endpoint URL.
pub struct ClientRegistry {
	cfg: ChainConfig,
	cache: RwLock<HashMap<String, Arc<VerifiedClient>>>,
}

impl ClientRegistry {
	pub fn new(cfg: ChainConfig) -> Self {
		Self {
			cfg,
			cache: RwLock::new(HashMap::new()),
		}
	}

	/// Returns a client for a randomly selected endpoint.
	///
	/// Construction failures are logged and the next endpoint in the
	/// permutation is tried; verification failures surface later, on the
	/// client's first operation.
	pub fn reader(&self) -> Result<Arc<VerifiedClient>, ClientError> {
		let nodes = &self.cfg.nodes;
		if nodes.is_empty() {
			return Err(ClientError::config("no nodes available"));
		}

		let mut order: Vec<usize> = (0..nodes.len()).collect();
		order.shuffle(&mut rand::thread_rng());

		for index in order {
			let node = &nodes[index];
			match self.verified_client(node) {
				Ok(client) => {
					debug!(name = %node.name, url = %node.url, "created client");
					return Ok(client);
				}
				Err(e) => {
					warn!(
						name = %node.name,
						url = %node.url,
						error = %e,
						"failed to create node"
					);
				}
			}
		}

		Err(ClientError::config("no valid nodes available"))
	}

	fn verified_client(&self, node: &NodeConfig) -> Result<Arc<VerifiedClient>, ClientError> {
		if node.name.is_empty() || node.url.is_empty() {
			return Err(ClientError::config(format!(
				"node config contains empty fields: {node:?}"
			)));
		}

		{
			let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
			if let Some(client) = cache.get(&node.url) {
				return Ok(Arc::clone(client));
			}
		}

		let client = RpcClient::new(&node.url, &self.cfg, DEFAULT_REQUEST_TIMEOUT)?;
		let verified = Arc::new(VerifiedClient::new(
			Arc::new(client),
			&node.url,
			&self.cfg.chain_id,
		));

		// Recheck under the write guard: a racing caller may have inserted
		// for the same URL first, in which case ours is discarded.
		let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
		Ok(Arc::clone(
			cache.entry(node.url.clone()).or_insert(verified),
		))
	}

	#[cfg(test)]
	fn cached_count(&self) -> usize {
		self.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}
}
