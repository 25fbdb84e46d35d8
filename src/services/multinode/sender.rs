//! Broadcast transaction sender.
//!
//! Hands a signed transaction to every broadcast target in parallel and
//! returns on the first accepted submission. The chain deduplicates by
//! signature, so duplicate submissions are safe and signature equality
//! across peers is the success condition.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::services::lifecycle::{Service, StateMachine};
use crate::services::rpc::{ClientError, Writer};
use crate::utils::metrics;

use super::pool::NodePool;

/// Outcome of one broadcast.
#[derive(Debug)]
pub struct SendTxResult {
	/// Signature reported by the first successful submission.
	pub signature: Option<Signature>,
	/// Transport-level failure: no peer accepted the transaction.
	pub send_error: Option<ClientError>,
	/// Protocol-level rejection reported by an accepting peer.
	pub tx_error: Option<ClientError>,
}

impl SendTxResult {
	/// Collapses the outcome, preferring the classified rejection over a
	/// transport error when nothing succeeded.
	pub fn into_result(self) -> Result<Signature, ClientError> {
		match self.signature {
			Some(signature) => Ok(signature),
			None => Err(self
				.tx_error
				.or(self.send_error)
				.unwrap_or_else(|| ClientError::internal("broadcast produced no outcome"))),
		}
	}
}

/// Fan-out writer over the node pool.
pub struct TransactionSender {
	chain_id: String,
	pool: Arc<NodePool>,
	sm: StateMachine,
}

impl TransactionSender {
	pub fn new(chain_id: &str, pool: Arc<NodePool>) -> Self {
		Self {
			chain_id: chain_id.to_string(),
			pool,
			sm: StateMachine::new("TransactionSender"),
		}
	}

	/// Broadcasts `tx` to every non-dead node and every send-only node.
	///
	/// Returns as soon as one peer reports a signature; the remaining
	/// submissions keep running detached and their outcomes are logged. If
	/// every peer fails, the most informative error wins: a rejection over a
	/// transport failure.
	pub async fn send_transaction(&self, tx: &Transaction) -> SendTxResult {
		let targets = self.pool.broadcast_targets();
		if targets.is_empty() {
			return SendTxResult {
				signature: None,
				tx_error: None,
				send_error: Some(ClientError::transport(
					"sendTransaction",
					&self.chain_id,
					"no nodes available for broadcast",
				)),
			};
		}

		let total = targets.len();
		let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
		for (name, client) in targets {
			let tx = tx.clone();
			let outcome_tx = outcome_tx.clone();
			tokio::spawn(async move {
				let outcome = client.send_tx(&tx).await;
				let _ = outcome_tx.send((name, outcome));
			});
		}
		drop(outcome_tx);

		let mut send_error = None;
		let mut tx_error: Option<ClientError> = None;
		let mut received = 0usize;
		while let Some((name, outcome)) = outcome_rx.recv().await {
			received += 1;
			match outcome {
				Ok(signature) => {
					metrics::record_send_outcome(&self.chain_id, "success");
					debug!(node = %name, signature = %signature, "transaction accepted");
					Self::drain_remaining(self.chain_id.clone(), outcome_rx, signature);
					return SendTxResult {
						signature: Some(signature),
						send_error: None,
						tx_error,
					};
				}
				Err(e) if e.is_rejection() => {
					metrics::record_send_outcome(&self.chain_id, "rejected");
					warn!(node = %name, error = %e, "transaction rejected by node");
					tx_error.get_or_insert(e);
				}
				Err(e) => {
					metrics::record_send_outcome(&self.chain_id, "transport_error");
					warn!(node = %name, error = %e, "transaction broadcast failed");
					send_error = Some(e);
				}
			}
			if received == total {
				break;
			}
		}

		SendTxResult {
			signature: None,
			send_error,
			tx_error,
		}
	}

	// Stragglers after the first success keep running; their outcomes are
	// logged, including signatures that disagree with the winner.
	fn drain_remaining(
		chain_id: String,
		mut outcome_rx: mpsc::UnboundedReceiver<(String, Result<Signature, ClientError>)>,
		expected: Signature,
	) {
		tokio::spawn(async move {
			while let Some((name, outcome)) = outcome_rx.recv().await {
				match outcome {
					Ok(signature) if signature == expected => {
						metrics::record_send_outcome(&chain_id, "success");
						debug!(node = %name, "duplicate submission confirmed");
					}
					Ok(signature) => {
						metrics::record_send_outcome(&chain_id, "success");
						warn!(
							node = %name,
							got = %signature,
							expected = %expected,
							"node returned a different signature for the same transaction"
						);
					}
					Err(e) if e.is_rejection() => {
						metrics::record_send_outcome(&chain_id, "rejected");
						warn!(node = %name, error = %e, "late rejection after accepted broadcast");
					}
					Err(e) => {
						metrics::record_send_outcome(&chain_id, "transport_error");
						debug!(node = %name, error = %e, "late broadcast failure");
					}
				}
			}
		});
	}
}

#[async_trait]
impl Service for TransactionSender {
	fn name(&self) -> String {
		format!("TransactionSender.{}", self.chain_id)
	}

	async fn start(&self) -> anyhow::Result<()> {
		self.sm.begin_start()?;
		self.sm.complete_start()
	}

	async fn close(&self) -> anyhow::Result<()> {
		self.sm.begin_close()?;
		self.sm.complete_close()
	}

	fn ready(&self) -> anyhow::Result<()> {
		self.sm.ready()
	}
}
