//! Per-index lifecycle state
//!
//! ```text
//! Unbuilt ──create──▶ Building ──▶ Operational ◀──▶ Updating
//!                        ▲              │
//!                        └───create─────┘
//! any ──shutdown──▶ ShutDown
//! ```
//!
//! A failed build or update returns the index to the state it was in before.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexState {
    Unbuilt,
    Building,
    Operational,
    Updating,
    ShutDown,
}

impl IndexState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexState::Unbuilt => "unbuilt",
            IndexState::Building => "building",
            IndexState::Operational => "operational",
            IndexState::Updating => "updating",
            IndexState::ShutDown => "shut down",
        }
    }

    /// A full build may start from nothing or replace a live index.
    pub fn can_build(self) -> bool {
        matches!(self, IndexState::Unbuilt | IndexState::Operational)
    }

    /// Updates and single adds need a live index.
    pub fn can_update(self) -> bool {
        self == IndexState::Operational
    }

    pub fn is_busy(self) -> bool {
        matches!(self, IndexState::Building | IndexState::Updating)
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
