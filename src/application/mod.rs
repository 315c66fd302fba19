//! Application layer - Handlers and node bootstrap.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
mod node;
mod publish;

pub use node::{Node, NodeDependencies, NodeOptions};
