//! In-memory GraphStore
//!
//! Interns URIs, literals and blank nodes to dense ids and keeps statements
//! in insertion order, indexed by subject. Equivalence classes are merged
//! with `merge`; the smallest id of a class is its canonical member.

use rustc_hash::FxHashMap;

use crate::shared::models::{
    EntityId, EntityKind, EntityValue, Statement, StatementPattern, NO_ENTITY,
};
use crate::shared::ports::GraphStore;

#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    values: Vec<EntityValue>,
    lookup: FxHashMap<EntityValue, EntityId>,
    statements: Vec<Statement>,
    by_subject: FxHashMap<EntityId, Vec<usize>>,
    /// Union-find parent per id (index = id - 1)
    parent: Vec<EntityId>,
    read_only: bool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, value: EntityValue) -> EntityId {
        if let Some(&id) = self.lookup.get(&value) {
            return id;
        }
        self.values.push(value.clone());
        let id = self.values.len() as EntityId;
        self.parent.push(id);
        self.lookup.insert(value, id);
        id
    }

    /// Id of an IRI, creating it if needed
    pub fn uri(&mut self, iri: &str) -> EntityId {
        self.intern(EntityValue::uri(iri))
    }

    pub fn literal(&mut self, lexical: &str, language: Option<&str>) -> EntityId {
        self.intern(EntityValue::literal(lexical, language))
    }

    pub fn blank(&mut self, label: &str) -> EntityId {
        self.intern(EntityValue::blank(label))
    }

    /// Add a statement in the default context.
    pub fn add(&mut self, subject: EntityId, predicate: EntityId, object: EntityId) {
        self.add_in_context(subject, predicate, object, NO_ENTITY);
    }

    pub fn add_in_context(
        &mut self,
        subject: EntityId,
        predicate: EntityId,
        object: EntityId,
        context: EntityId,
    ) {
        let st = Statement {
            subject,
            predicate,
            object,
            context,
        };
        self.by_subject
            .entry(subject)
            .or_default()
            .push(self.statements.len());
        self.statements.push(st);
    }

    /// Put `a` and `b` in the same equivalence class.
    pub fn merge(&mut self, a: EntityId, b: EntityId) {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra == NO_ENTITY || rb == NO_ENTITY || ra == rb {
            return;
        }
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[(drop - 1) as usize] = keep;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn root(&self, id: EntityId) -> EntityId {
        if id == NO_ENTITY || id as usize > self.parent.len() {
            return NO_ENTITY;
        }
        let mut current = id;
        loop {
            let next = self.parent[(current - 1) as usize];
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

impl GraphStore for MemoryGraphStore {
    fn statements<'a>(
        &'a self,
        pattern: &StatementPattern,
    ) -> Box<dyn Iterator<Item = Statement> + 'a> {
        let pattern = *pattern;
        match pattern.subject {
            Some(subject) => {
                let slots = self
                    .by_subject
                    .get(&subject)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                Box::new(
                    slots
                        .iter()
                        .map(move |&i| self.statements[i])
                        .filter(move |st| pattern.matches(st)),
                )
            }
            None => Box::new(
                self.statements
                    .iter()
                    .copied()
                    .filter(move |st| pattern.matches(st)),
            ),
        }
    }

    fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.value_of_ref(id).map(EntityValue::kind)
    }

    fn canonical(&self, id: EntityId) -> EntityId {
        match self.root(id) {
            NO_ENTITY => id,
            root => root,
        }
    }

    fn language_of(&self, id: EntityId) -> Option<String> {
        match self.value_of_ref(id)? {
            EntityValue::Literal { language, .. } => language.clone(),
            _ => None,
        }
    }

    fn value_of(&self, id: EntityId) -> Option<EntityValue> {
        self.value_of_ref(id).cloned()
    }

    fn resolve(&self, iri: &str) -> Option<EntityId> {
        self.lookup.get(&EntityValue::uri(iri)).copied()
    }

    fn entity_count(&self) -> u64 {
        self.values.len() as u64
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl MemoryGraphStore {
    fn value_of_ref(&self, id: EntityId) -> Option<&EntityValue> {
        if id == NO_ENTITY {
            return None;
        }
        self.values.get((id - 1) as usize)
    }
}
