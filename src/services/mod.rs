//! Service layer for the chain client.
//!
//! - `rpc`: single-endpoint client with coalescing and error classification
//! - `chain`: the chain façade, client registry, and chain-id verifier
//! - `multinode`: health-tracked pool and broadcast transaction sender
//! - `lifecycle`: shared service lifecycle primitives

pub mod chain;
pub mod lifecycle;
pub mod multinode;
pub mod rpc;
