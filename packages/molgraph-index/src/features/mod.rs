//! Feature modules
//!
//! Data flows one way during a build:
//!
//! ```text
//! graph_store → molecule (+ adjacency table) → lexical → committed index
//!                    ↓                              ↑
//!               fingerprint            snapshot (persisted config)
//! ```
//!
//! `lifecycle` drives the whole thing.

pub mod fingerprint;
pub mod graph_store;
pub mod lexical;
pub mod lifecycle;
pub mod molecule;
pub mod snapshot;
