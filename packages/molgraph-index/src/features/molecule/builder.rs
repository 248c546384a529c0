//! Molecule construction
//!
//! # Traversal
//!
//! Depth-first from the center with an explicit stack. The visited set is
//! the only termination guard: a node is marked when it is popped, before
//! anything else happens to it. Stepping onto a blank node costs no hop, so
//! a chain of blank nodes counts as a single hop and cycles through blank
//! nodes are cut only by the visited set.
//!
//! Children are pushed in reverse, which yields the same visit order as a
//! recursive pre-order walk.
//!
//! # Neighbor sources
//!
//! - `NeighborSource::Adjacency`: a table materialized for a full build
//! - `NeighborSource::Store`: the live statement store (updates, single adds)
//!
//! Both apply the same edge admission rules.

use molgraph_storage::{AdjacencyStore, StorageError};
use rustc_hash::FxHashSet;

use super::model::MoleculeConfig;
use crate::shared::models::{EntityId, EntityKind, EntityValue, Statement, StatementPattern};
use crate::shared::ports::GraphStore;

/// Where neighbor lists come from
#[derive(Clone, Copy)]
pub enum NeighborSource<'a> {
    Adjacency(&'a dyn AdjacencyStore),
    Store,
}

pub struct MoleculeBuilder<'a> {
    config: &'a MoleculeConfig,
    store: &'a dyn GraphStore,
}

impl<'a> MoleculeBuilder<'a> {
    pub fn new(config: &'a MoleculeConfig, store: &'a dyn GraphStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &MoleculeConfig {
        self.config
    }

    /// Predicate allow/deny check plus entity exclusion of URI endpoints.
    pub fn edge_allowed(&self, st: &Statement) -> bool {
        self.config.predicate_allowed(st.predicate)
            && !self.excluded_uri(st.subject)
            && !self.excluded_uri(st.object)
    }

    fn excluded_uri(&self, id: EntityId) -> bool {
        self.config.entity_excluded(id) && self.store.kind_of(id) == Some(EntityKind::Uri)
    }

    /// Copy every admitted edge that can affect a molecule into `table`.
    ///
    /// Literal objects are skipped when literals are not rendered, and URI
    /// objects are skipped when URIs are not rendered and the hop budget is
    /// one, since such a URI would be neither shown nor expanded.
    pub fn materialize(&self, table: &mut dyn AdjacencyStore) -> Result<u64, StorageError> {
        let include = &self.config.include_filter;
        let mut edges = 0u64;
        for st in self.store.statements(&StatementPattern::any()) {
            if !self.edge_allowed(&st) {
                continue;
            }
            match self.store.kind_of(st.object) {
                None => continue,
                Some(EntityKind::Literal) if !include.literal => continue,
                Some(EntityKind::Uri) if !include.uri && self.config.degree == 1 => continue,
                _ => {}
            }
            table.add(st.subject, st.object)?;
            edges += 1;
        }
        Ok(edges)
    }

    /// Entities reachable from `center`, in visit order.
    pub fn collect(
        &self,
        center: EntityId,
        source: NeighborSource<'_>,
    ) -> Result<Vec<EntityId>, StorageError> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![(center, self.config.degree)];
        let mut children = Vec::new();

        while let Some((node, hops)) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node);
            if hops == 0 {
                continue;
            }

            children.clear();
            self.neighbors(node, source, &mut children)?;
            for &child in children.iter().rev() {
                let remaining = match self.store.kind_of(child) {
                    Some(EntityKind::BlankNode) => hops,
                    _ => hops - 1,
                };
                stack.push((child, remaining));
            }
        }

        Ok(order)
    }

    fn neighbors(
        &self,
        node: EntityId,
        source: NeighborSource<'_>,
        out: &mut Vec<EntityId>,
    ) -> Result<(), StorageError> {
        match source {
            NeighborSource::Adjacency(table) => out.extend(table.neighbors_of(node)?),
            NeighborSource::Store => out.extend(
                self.store
                    .statements(&StatementPattern::with_subject(node))
                    .filter(|st| self.edge_allowed(st))
                    .map(|st| st.object),
            ),
        }
        Ok(())
    }

    /// Space separated text of the included members.
    pub fn render(&self, center: EntityId, members: &[EntityId]) -> String {
        let mut out = String::new();
        for &node in members {
            let Some(value) = self.store.value_of(node) else {
                continue;
            };
            if !self.included(center, node, &value) {
                continue;
            }
            let text = value.display_text();
            if text.is_empty() || self.config.value_excluded(text) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
        out
    }

    fn included(&self, center: EntityId, node: EntityId, value: &EntityValue) -> bool {
        let include = &self.config.include_filter;
        let kind = value.kind();
        if node == center && include.centre && kind != EntityKind::BlankNode {
            return true;
        }
        match kind {
            EntityKind::Uri => include.uri,
            EntityKind::Literal => {
                include.literal
                    && self
                        .config
                        .language_allowed(self.store.language_of(node).as_deref())
            }
            EntityKind::BlankNode => false,
        }
    }

    /// Full-build rendering; may return an empty string.
    pub fn build_full(
        &self,
        center: EntityId,
        source: NeighborSource<'_>,
    ) -> Result<String, StorageError> {
        let members = self.collect(center, source)?;
        Ok(self.render(center, &members))
    }

    /// Incremental rendering against the live store; `None` means "do not
    /// index this entity".
    pub fn build_incremental(&self, center: EntityId) -> Result<Option<String>, StorageError> {
        let text = self.build_full(center, NeighborSource::Store)?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }
}
