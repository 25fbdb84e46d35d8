//! Multi-node pool and broadcast sender.
//!
//! - `node`: health-tracked pool members and send-only members
//! - `pool`: selection policy, lease rotation, probe loops
//! - `sender`: parallel transaction fan-out with outcome classification

mod node;
mod pool;
mod sender;

pub use node::{Node, SendOnlyNode};
pub use pool::{NodePool, HEAD_SLOT_LAG_TOLERANCE};
pub use sender::{SendTxResult, TransactionSender};
