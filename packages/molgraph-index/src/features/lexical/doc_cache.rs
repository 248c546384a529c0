//! Reverse lookup from document address to entity id
//!
//! One slot per document of an opened snapshot, filled lazily by whichever
//! query needs it first. A slot only ever receives the id stored in that
//! document, so concurrent fills race harmlessly and plain relaxed atomics
//! are enough. Zero marks an empty slot (entity ids start at 1).

use std::sync::atomic::{AtomicU64, Ordering};

use tantivy::{DocAddress, Searcher};

use super::schema::FIELD_ID;
use crate::shared::models::{EntityId, NO_ENTITY};

pub struct DocIdCache {
    /// First slot of each segment
    bases: Vec<usize>,
    slots: Vec<AtomicU64>,
}

impl DocIdCache {
    pub fn for_searcher(searcher: &Searcher) -> Self {
        let sizes: Vec<u32> = searcher
            .segment_readers()
            .iter()
            .map(|reader| reader.max_doc())
            .collect();
        Self::from_segment_sizes(&sizes)
    }

    pub fn from_segment_sizes(sizes: &[u32]) -> Self {
        let mut bases = Vec::with_capacity(sizes.len());
        let mut total = 0usize;
        for &size in sizes {
            bases.push(total);
            total += size as usize;
        }
        Self {
            bases,
            slots: (0..total).map(|_| AtomicU64::new(NO_ENTITY)).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, addr: DocAddress) -> Option<&AtomicU64> {
        let base = *self.bases.get(addr.segment_ord as usize)?;
        self.slots.get(base + addr.doc_id as usize)
    }

    /// Cached id of `addr`, computing it with `lookup` on a miss.
    pub fn get_or_fill<E>(
        &self,
        addr: DocAddress,
        lookup: impl FnOnce() -> Result<Option<EntityId>, E>,
    ) -> Result<Option<EntityId>, E> {
        let Some(slot) = self.slot(addr) else {
            return lookup();
        };
        match slot.load(Ordering::Relaxed) {
            NO_ENTITY => {
                let id = lookup()?;
                if let Some(id) = id {
                    slot.store(id, Ordering::Relaxed);
                }
                Ok(id)
            }
            cached => Ok(Some(cached)),
        }
    }

    /// Entity id stored in the document at `addr`.
    pub fn entity_id(
        &self,
        searcher: &Searcher,
        addr: DocAddress,
    ) -> tantivy::Result<Option<EntityId>> {
        self.get_or_fill(addr, || {
            let column = searcher
                .segment_reader(addr.segment_ord)
                .fast_fields()
                .u64(FIELD_ID)?;
            Ok(column.first(addr.doc_id))
        })
    }
}
