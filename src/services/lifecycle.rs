//! Service lifecycle primitives.
//!
//! Components with background work share one lifecycle shape: a named
//! service with idempotence-guarded start/close transitions and an
//! aggregatable health report.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::bail;
use async_trait::async_trait;

/// Component name to failure description; `None` means healthy.
pub type HealthReport = HashMap<String, Option<String>>;

/// Startable, closable, health-reporting component.
#[async_trait]
pub trait Service: Send + Sync {
	fn name(&self) -> String;

	async fn start(&self) -> anyhow::Result<()>;

	async fn close(&self) -> anyhow::Result<()>;

	fn ready(&self) -> anyhow::Result<()>;

	fn health_report(&self) -> HealthReport {
		let mut report = HealthReport::new();
		report.insert(self.name(), self.ready().err().map(|e| e.to_string()));
		report
	}
}

/// Lifecycle states. Transitions only move forward, except that a failed
/// start rolls back to `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
	New,
	Starting,
	Started,
	Stopping,
	Closed,
}

/// Guards lifecycle transitions for a named component.
#[derive(Debug)]
pub struct StateMachine {
	name: &'static str,
	state: Mutex<ServiceState>,
}

impl StateMachine {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			state: Mutex::new(ServiceState::New),
		}
	}

	pub fn state(&self) -> ServiceState {
		*self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn begin_start(&self) -> anyhow::Result<()> {
		self.transition(ServiceState::New, ServiceState::Starting, "start")
	}

	pub fn complete_start(&self) -> anyhow::Result<()> {
		self.transition(ServiceState::Starting, ServiceState::Started, "start")
	}

	/// Rolls a failed start back so the component can be started again.
	pub fn abort_start(&self) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if *state == ServiceState::Starting {
			*state = ServiceState::New;
		}
	}

	pub fn begin_close(&self) -> anyhow::Result<()> {
		self.transition(ServiceState::Started, ServiceState::Stopping, "close")
	}

	pub fn complete_close(&self) -> anyhow::Result<()> {
		self.transition(ServiceState::Stopping, ServiceState::Closed, "close")
	}

	pub fn ready(&self) -> anyhow::Result<()> {
		let state = self.state();
		if state != ServiceState::Started {
			bail!("{} is not started (state: {:?})", self.name, state);
		}
		Ok(())
	}

	fn transition(
		&self,
		from: ServiceState,
		to: ServiceState,
		action: &str,
	) -> anyhow::Result<()> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if *state != from {
			bail!(
				"cannot {} {} from state {:?}",
				action,
				self.name,
				*state
			);
		}
		*state = to;
		Ok(())
	}
}
