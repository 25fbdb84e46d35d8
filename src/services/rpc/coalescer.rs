//! Duplicate request suppression.
//!
//! For a given key at most one underlying call is in flight; concurrent
//! callers with the same key attach to it and receive a clone of the same
//! outcome. The underlying work runs on a spawned task, so cancelling the
//! originating caller still delivers the result to the remaining waiters.
//! Every completing caller evicts the finished entry before returning, so a
//! back-to-back call with the same key issues fresh work; a detached task
//! backstops eviction when every caller was cancelled mid-flight.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::error::ClientError;

type FlightOutput = Result<Arc<dyn Any + Send + Sync>, ClientError>;
type Flight = Shared<BoxFuture<'static, FlightOutput>>;

/// Per-peer single-flight request group.
#[derive(Default)]
pub(crate) struct RequestGroup {
	inflight: Arc<Mutex<HashMap<String, Flight>>>,
}

impl RequestGroup {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `fut` under `key`, or attaches to the in-flight call for `key`.
	///
	/// The follower's `fut` is dropped unpolled; only the first caller's
	/// future does network work.
	pub async fn run<T, Fut>(&self, key: &str, fut: Fut) -> Result<T, ClientError>
	where
		T: Clone + Send + Sync + 'static,
		Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
	{
		let flight = {
			let mut inflight = self
				.inflight
				.lock()
				.unwrap_or_else(PoisonError::into_inner);
			match inflight.get(key) {
				Some(flight) => flight.clone(),
				None => {
					let handle = tokio::spawn(fut);
					let flight: Flight = async move {
						match handle.await {
							Ok(Ok(value)) => Ok(Arc::new(value) as Arc<dyn Any + Send + Sync>),
							Ok(Err(e)) => Err(e),
							Err(e) => Err(ClientError::internal(format!(
								"coalesced request aborted: {e}"
							))),
						}
					}
					.boxed()
					.shared();
					inflight.insert(key.to_string(), flight.clone());
					self.spawn_cleanup(key.to_string(), flight.clone());
					flight
				}
			}
		};

		let outcome = flight.clone().await;
		// Evicted here, synchronously, before any result is returned: the
		// next call with this key must issue fresh work even when it follows
		// immediately, without yielding to the scheduler in between.
		self.evict(key, &flight);

		let value = outcome?;
		match value.downcast::<T>() {
			Ok(value) => Ok((*value).clone()),
			Err(_) => Err(ClientError::internal(format!(
				"coalesced result type mismatch for key {key}"
			))),
		}
	}

	fn evict(&self, key: &str, flight: &Flight) {
		let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(current) = inflight.get(key) {
			// A newer flight may already occupy the key; leave it alone.
			if current.ptr_eq(flight) {
				inflight.remove(key);
			}
		}
	}

	// Backstop: if every caller is cancelled before the flight completes,
	// nobody reaches the synchronous eviction path, and a later call would
	// observe a stale result instead of issuing fresh work.
	fn spawn_cleanup(&self, key: String, flight: Flight) {
		let map = Arc::clone(&self.inflight);
		tokio::spawn(async move {
			let _ = flight.clone().await;
			let mut inflight = map.lock().unwrap_or_else(PoisonError::into_inner);
			if let Some(current) = inflight.get(&key) {
				if current.ptr_eq(&flight) {
					inflight.remove(&key);
				}
			}
		});
	}
}
