//! Canopy Node
//!
//! Wires a [`NodeConfig`](canopy_core::NodeConfig) to a database backend and
//! a mounted multistore, and exposes the operations driven by the CLI.

mod app;

pub use app::*;
