/*
 * molgraph-index - Molecule Full-Text Indexing for Entity Graphs
 *
 * Feature-First Layout:
 * - shared/      : Entity and statement models, graph store port
 * - features/    : molecule → lexical → lifecycle, plus snapshot/fingerprint
 * - config/      : Controller configuration (YAML)
 * - errors       : Error taxonomy
 *
 * Each entity becomes one document: the text of its hop-limited
 * neighborhood. Indexes are built in full, caught up incrementally, and
 * swapped into place atomically.
 */

#![allow(clippy::too_many_arguments)] // Build loops thread many collaborators
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and ports
pub mod shared;

/// Feature modules
pub mod features;

/// Controller configuration
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, ControllerConfig};
pub use errors::{ErrorClass, FtsError, Result};
pub use features::fingerprint::Fingerprint;
pub use features::graph_store::MemoryGraphStore;
pub use features::lexical::{
    AnalyzerRegistry, DocumentScorer, ScorerRegistry, SearchHit, StaticScorer,
};
pub use features::lifecycle::{
    AddOutcome, BuildReport, IndexController, IndexState, SkipReason, UpdateOutcome,
};
pub use features::molecule::{MoleculeBuilder, MoleculeConfig, NeighborSource};
pub use shared::{EntityId, EntityKind, EntityValue, GraphStore, Statement, StatementPattern};
