//! Chain façade implementation.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures::FutureExt;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tracing::{debug, warn};

use crate::models::{ChainConfig, ChainStatus, Head, NodeStatus};
use crate::services::lifecycle::{HealthReport, Service, StateMachine};
use crate::services::multinode::{NodePool, TransactionSender};
use crate::services::rpc::{ClientError, Reader, ReaderWriter, Writer};

use super::registry::ClientRegistry;
use super::{
	BalanceMonitor, BalanceMonitorDeps, ChainOpts, ClientLoader, SendTxFn, TxManager,
	TxManagerDeps, TxOptions,
};

enum Mode {
	SingleNode { registry: Arc<ClientRegistry> },
	MultiNode {
		pool: Arc<NodePool>,
		sender: Arc<TransactionSender>,
	},
}

/// Façade over one configured chain.
///
/// Owns endpoint selection (registry or pool), the injected transaction
/// manager and balance monitor, and the lifecycle of the whole set.
impl std::fmt::Debug for Chain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Chain").field("id", &self.id).finish_non_exhaustive()
	}
}

pub struct Chain {
	id: String,
	cfg: ChainConfig,
	sm: StateMachine,
	txm: Arc<dyn TxManager>,
	balance_monitor: Arc<dyn BalanceMonitor>,
	mode: Mode,
}

impl Chain {
	pub fn new(cfg: ChainConfig, opts: ChainOpts) -> Result<Self, ClientError> {
		if cfg.chain_id.is_empty() {
			return Err(ClientError::config("chain_id is required"));
		}
		if !cfg.is_enabled() {
			return Err(ClientError::config(format!(
				"cannot create new chain with ID {}: chain is disabled",
				cfg.chain_id
			)));
		}

		let id = cfg.chain_id.clone();
		let mode = if cfg.multi_node.enabled {
			let pool = Arc::new(NodePool::new(&cfg)?);
			let sender = Arc::new(TransactionSender::new(&id, Arc::clone(&pool)));
			Mode::MultiNode { pool, sender }
		} else {
			Mode::SingleNode {
				registry: Arc::new(ClientRegistry::new(cfg.clone())),
			}
		};

		let loader: ClientLoader = match &mode {
			Mode::SingleNode { registry } => {
				let registry = Arc::clone(registry);
				Arc::new(move || {
					registry
						.reader()
						.map(|client| client as Arc<dyn ReaderWriter>)
				})
			}
			Mode::MultiNode { pool, .. } => {
				let pool = Arc::clone(pool);
				Arc::new(move || {
					pool.select_rpc()
						.map(|client| client as Arc<dyn ReaderWriter>)
				})
			}
		};

		let send_tx: SendTxFn = match &mode {
			Mode::SingleNode { .. } => {
				let loader = Arc::clone(&loader);
				Arc::new(move |tx: Transaction| {
					let loader = Arc::clone(&loader);
					async move {
						let client = loader()?;
						client.send_tx(&tx).await
					}
					.boxed()
				})
			}
			Mode::MultiNode { sender, .. } => {
				let sender = Arc::clone(sender);
				Arc::new(move |tx: Transaction| {
					let sender = Arc::clone(&sender);
					async move { sender.send_transaction(&tx).await.into_result() }.boxed()
				})
			}
		};

		let txm = (opts.tx_manager)(TxManagerDeps {
			chain_id: id.clone(),
			client: Arc::clone(&loader),
			send_tx,
			keystore: Arc::clone(&opts.keystore),
		});
		let balance_monitor = (opts.balance_monitor)(BalanceMonitorDeps {
			chain_id: id.clone(),
			client: loader,
			keystore: opts.keystore,
		});

		Ok(Self {
			id,
			cfg,
			sm: StateMachine::new("Chain"),
			txm,
			balance_monitor,
			mode,
		})
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn config(&self) -> &ChainConfig {
		&self.cfg
	}

	fn name(&self) -> String {
		format!("Chain.{}", self.id)
	}

	/// The embedded transaction manager handle.
	pub fn tx_manager(&self) -> Arc<dyn TxManager> {
		Arc::clone(&self.txm)
	}

	/// Returns a read-capable handle. The handle performs chain-id
	/// verification on its first operation.
	pub fn reader(&self) -> Result<Arc<dyn Reader>, ClientError> {
		match &self.mode {
			Mode::SingleNode { registry } => {
				let client = registry.reader()?;
				Ok(client)
			}
			Mode::MultiNode { pool, .. } => {
				let client = pool.select_rpc()?;
				Ok(client)
			}
		}
	}

	pub async fn latest_head(&self) -> anyhow::Result<Head> {
		let reader = self.reader()?;
		let block = reader.latest_block().await?;

		let height = block
			.block_height
			.ok_or_else(|| anyhow!("client returned latest block without a block height"))?;
		let block_time = block
			.block_time
			.ok_or_else(|| anyhow!("client returned latest block without a block time"))?;
		let timestamp =
			u64::try_from(block_time).context("latest block time predates the unix epoch")?;

		Ok(Head {
			height: height.to_string(),
			hash: block.blockhash.into_bytes(),
			timestamp,
		})
	}

	pub fn get_chain_status(&self) -> anyhow::Result<ChainStatus> {
		let config =
			serde_json::to_string(&self.cfg).context("failed to serialize chain config")?;
		Ok(ChainStatus {
			id: self.id.clone(),
			enabled: self.cfg.is_enabled(),
			config,
		})
	}

	/// Offset/limit paging over the stable node order. An empty `page_token`
	/// starts from the beginning; the returned token is empty on the last
	/// page.
	pub fn list_node_statuses(
		&self,
		page_size: usize,
		page_token: &str,
	) -> anyhow::Result<(Vec<NodeStatus>, String, usize)> {
		let total = self.cfg.nodes.len();
		let start: usize = if page_token.is_empty() {
			0
		} else {
			page_token
				.parse()
				.with_context(|| format!("invalid page token: {page_token}"))?
		};
		if total == 0 {
			return Ok((Vec::new(), String::new(), 0));
		}
		if start >= total {
			bail!("page token out of range: {start} (total nodes: {total})");
		}

		let end = (start + page_size).min(total);
		let pool_states = match &self.mode {
			Mode::MultiNode { pool, .. } => pool.node_states(),
			Mode::SingleNode { .. } => Vec::new(),
		};

		let mut statuses = Vec::with_capacity(end - start);
		for node in &self.cfg.nodes[start..end] {
			let config =
				serde_json::to_string(node).context("failed to serialize node config")?;
			let state = pool_states
				.iter()
				.find(|(name, _)| name == &node.name)
				.map(|(_, state)| state.clone())
				.unwrap_or_default();
			statuses.push(NodeStatus {
				chain_id: self.id.clone(),
				name: node.name.clone(),
				config,
				state,
			});
		}

		let next_page_token = if end < total {
			end.to_string()
		} else {
			String::new()
		};
		Ok((statuses, next_page_token, total))
	}

	/// Enqueues a single transfer through the transaction manager.
	///
	/// The transaction gets a reduced compute-unit limit and no fee bumping,
	/// which keeps the optional balance pre-check accurate.
	pub async fn transact(
		&self,
		from: &str,
		to: &str,
		amount: u64,
		balance_check: bool,
	) -> anyhow::Result<()> {
		let reader = self.reader().context("chain unreachable")?;

		let from_key = Pubkey::from_str(from).context("failed to parse from key")?;
		let to_key = Pubkey::from_str(to).context("failed to parse to key")?;

		let blockhash = reader
			.latest_blockhash()
			.await
			.context("failed to get latest block hash")?;
		let recent_blockhash = Hash::from_str(&blockhash.value.blockhash)
			.context("failed to parse latest block hash")?;

		let instruction = system_instruction::transfer(&from_key, &to_key, amount);
		let mut message = Message::new(&[instruction], Some(&from_key));
		message.recent_blockhash = recent_blockhash;
		let tx = Transaction::new_unsigned(message);

		if balance_check {
			let encoded_message = BASE64_STANDARD.encode(tx.message.serialize());
			validate_balance(reader.as_ref(), &from_key, amount, &encoded_message)
				.await
				.context("failed to validate balance")?;
		}

		self.txm
			.enqueue(
				"",
				tx,
				TxOptions {
					// Far below the default 200k limit; a bare transfer needs
					// only a few hundred units.
					compute_unit_limit: Some(500),
					compute_unit_price_min: 0,
					compute_unit_price_max: 0,
					base_compute_unit_price: 0,
					fee_bump_period: Duration::ZERO,
				},
			)
			.await
			.context("transaction failed")
	}

	fn services(&self) -> Vec<Arc<dyn Service>> {
		let mut services: Vec<Arc<dyn Service>> = vec![
			Arc::clone(&self.txm) as Arc<dyn Service>,
			Arc::clone(&self.balance_monitor) as Arc<dyn Service>,
		];
		if let Mode::MultiNode { pool, sender } = &self.mode {
			services.push(Arc::clone(pool) as Arc<dyn Service>);
			services.push(Arc::clone(sender) as Arc<dyn Service>);
		}
		services
	}

	/// Starts the transaction manager, balance monitor, and, in multi-node
	/// mode, the pool and sender as a set. Any sub-start failure closes
	/// whatever already started, in reverse order, and rolls the chain back
	/// to its unstarted state.
	pub async fn start(&self) -> anyhow::Result<()> {
		self.sm.begin_start()?;
		debug!(chain_id = %self.id, "starting chain");

		let mut started: Vec<Arc<dyn Service>> = Vec::new();
		for service in self.services() {
			if let Err(e) = service.start().await {
				for prior in started.iter().rev() {
					if let Err(close_err) = prior.close().await {
						warn!(
							service = %prior.name(),
							error = %close_err,
							"rollback close failed"
						);
					}
				}
				self.sm.abort_start();
				return Err(e.context(format!("failed to start {}", service.name())));
			}
			started.push(service);
		}
		self.sm.complete_start()
	}

	/// Stops every component in reverse start order. Close failures are
	/// collected so every component gets its shutdown attempt.
	pub async fn close(&self) -> anyhow::Result<()> {
		self.sm.begin_close()?;
		debug!(chain_id = %self.id, "stopping chain");

		let mut errors = Vec::new();
		for service in self.services().into_iter().rev() {
			if let Err(e) = service.close().await {
				warn!(service = %service.name(), error = %e, "failed to close service");
				errors.push(format!("{}: {e}", service.name()));
			}
		}
		self.sm.complete_close()?;
		if errors.is_empty() {
			Ok(())
		} else {
			bail!("failed to close services: {}", errors.join("; "))
		}
	}

	/// Conjunction of the chain's own state and the transaction manager's
	/// readiness.
	pub fn ready(&self) -> anyhow::Result<()> {
		self.sm.ready()?;
		self.txm.ready()
	}

	pub fn health_report(&self) -> HealthReport {
		let mut report = HealthReport::new();
		report.insert(self.name(), self.sm.ready().err().map(|e| e.to_string()));
		report.extend(self.txm.health_report());
		report
	}
}

/// Checks that `from` can cover `amount` plus the fee for `message`
/// (base64). Idempotent for unchanged chain state.
pub async fn validate_balance(
	reader: &dyn Reader,
	from: &Pubkey,
	amount: u64,
	message: &str,
) -> anyhow::Result<()> {
	let balance = reader.balance(from).await?;
	let fee = reader.fee_for_message(message).await?;

	if balance < amount.saturating_add(fee) {
		bail!(
			"balance {balance} is too low for this transaction to be executed: amount {amount} + fee {fee}"
		);
	}
	Ok(())
}
