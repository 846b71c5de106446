//! Keyward node runtime.
//!
//! Wires the keystore, the messaging service and the account session
//! manager together and drives their lifecycle. See [`node::Node`].

pub mod node;

pub use node::{Node, NodeState, NodeStatus};
