//! Index lifecycle
//!
//! - `params`: build parameters set one key at a time
//! - `state`: per-index state machine
//! - `swap`: directory replacement after a full build
//! - `controller`: full build, incremental update, single add, shutdown

pub mod controller;
pub mod params;
pub mod state;
pub mod swap;

pub use controller::{
    validate_index_name, AddOutcome, BuildReport, IndexController, SkipReason, UpdateOutcome,
    DEFAULT_INDEX_DIR,
};
pub use params::IndexParams;
pub use state::IndexState;
