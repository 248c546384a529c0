//! Shared models and ports used across features

pub mod models;
pub mod ports;

pub use models::*;
pub use ports::GraphStore;
