//! Port traits for external collaborators

use super::models::{EntityId, EntityKind, EntityValue, Statement, StatementPattern};

/// Read access to the graph/triple store.
///
/// Ids handed out by the store run from 1 to `entity_count()` inclusive.
pub trait GraphStore: Send + Sync {
    /// Statements matching `pattern`, in store order.
    fn statements<'a>(
        &'a self,
        pattern: &StatementPattern,
    ) -> Box<dyn Iterator<Item = Statement> + 'a>;

    /// `None` for ids the store does not know.
    fn kind_of(&self, id: EntityId) -> Option<EntityKind>;

    /// Canonical representative of the equivalence class of `id`.
    fn canonical(&self, id: EntityId) -> EntityId;

    fn language_of(&self, id: EntityId) -> Option<String>;

    fn value_of(&self, id: EntityId) -> Option<EntityValue>;

    /// Look up the id of an absolute IRI.
    fn resolve(&self, iri: &str) -> Option<EntityId>;

    fn entity_count(&self) -> u64;

    fn is_read_only(&self) -> bool;

    /// Bits needed to represent any entity id of this store.
    fn entity_id_bits(&self) -> u32 {
        64 - self.entity_count().leading_zeros().min(63)
    }
}
