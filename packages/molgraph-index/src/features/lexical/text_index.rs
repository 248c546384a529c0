//! Tantivy Molecule Index
//!
//! # Architecture
//!
//! ```text
//! MoleculeBuilder → MoleculeWriter → IndexWriter → Tantivy Index
//!                                                      ↓
//!                              IndexReader → SearchSnapshot (Searcher + DocIdCache)
//! ```
//!
//! Readers see committed data only after `reload`, which swaps the whole
//! snapshot at once. A query holds its snapshot for its whole run, so it
//! sees either the old or the new state, never a mix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tantivy::{
    collector::{Count, TopDocs},
    doc,
    query::{QueryParser, TermQuery},
    schema::{IndexRecordOption, Value},
    tokenizer::TextAnalyzer,
    DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, Searcher, SegmentReader,
    TantivyDocument, Term,
};

use super::doc_cache::DocIdCache;
use super::schema::{SchemaFields, FIELD_BOOST, MOLECULE_TOKENIZER};
use crate::errors::{FtsError, Result};
use crate::shared::models::EntityId;

/// Bookkeeping key of the last-processed marker
pub const KEY_LAST_INDEXED: &str = "lastindexed";
/// Bookkeeping key of the molecule configuration snapshot
pub const KEY_MOLECULE: &str = "molecule";

/// One search result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: EntityId,
    pub score: f64,
}

/// Lifecycle metadata stored inside an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookkeeping {
    pub marker: u64,
    pub snapshot: String,
}

pub struct SearchSnapshot {
    pub searcher: Searcher,
    pub doc_ids: DocIdCache,
}

impl SearchSnapshot {
    fn new(searcher: Searcher) -> Self {
        let doc_ids = DocIdCache::for_searcher(&searcher);
        Self { searcher, doc_ids }
    }
}

pub struct TextIndex {
    dir: PathBuf,
    index: Index,
    fields: SchemaFields,
    reader: IndexReader,
    snapshot: RwLock<Arc<SearchSnapshot>>,
}

impl TextIndex {
    /// Create an empty index in `dir` (created if missing).
    pub fn create(dir: &Path, analyzer: TextAnalyzer) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let fields = SchemaFields::new();
        let index = Index::create_in_dir(dir, fields.schema.clone())?;
        Self::from_index(dir, index, fields, analyzer)
    }

    /// Open the index stored in `dir`.
    pub fn open(dir: &Path, analyzer: TextAnalyzer) -> Result<Self> {
        if !Self::exists(dir) {
            return Err(FtsError::IndexNotFound(dir.display().to_string()));
        }
        let index = Index::open_in_dir(dir)?;
        let fields = SchemaFields::from_schema(index.schema())
            .map_err(|e| FtsError::Corrupted(format!("{}: {}", dir.display(), e)))?;
        Self::from_index(dir, index, fields, analyzer)
    }

    pub fn exists(dir: &Path) -> bool {
        dir.join("meta.json").is_file()
    }

    fn from_index(
        dir: &Path,
        index: Index,
        fields: SchemaFields,
        analyzer: TextAnalyzer,
    ) -> Result<Self> {
        index.tokenizers().register(MOLECULE_TOKENIZER, analyzer);
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let snapshot = RwLock::new(Arc::new(SearchSnapshot::new(reader.searcher())));
        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            fields,
            reader,
            snapshot,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn writer(&self, heap_bytes: usize) -> Result<MoleculeWriter> {
        let writer: IndexWriter = self.index.writer(heap_bytes)?;
        Ok(MoleculeWriter {
            writer,
            fields: self.fields.clone(),
        })
    }

    /// Make the latest commit visible to searches.
    pub fn reload(&self) -> Result<()> {
        self.reader.reload()?;
        let fresh = Arc::new(SearchSnapshot::new(self.reader.searcher()));
        *self.snapshot.write() = fresh;
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<SearchSnapshot> {
        self.snapshot.read().clone()
    }

    /// Live documents in the current snapshot, bookkeeping included
    pub fn num_docs(&self) -> u64 {
        self.snapshot().searcher.num_docs()
    }

    /// Read the marker and the configuration snapshot. Each must exist
    /// exactly once.
    pub fn bookkeeping(&self) -> Result<Bookkeeping> {
        let snapshot = self.snapshot();
        let marker_text = self.single_value(&snapshot.searcher, KEY_LAST_INDEXED)?;
        let marker = marker_text.trim().parse::<u64>().map_err(|_| {
            FtsError::CorruptedSnapshot(format!("invalid marker value '{}'", marker_text))
        })?;
        let snapshot_text = self.single_value(&snapshot.searcher, KEY_MOLECULE)?;
        Ok(Bookkeeping {
            marker,
            snapshot: snapshot_text,
        })
    }

    fn single_value(&self, searcher: &Searcher, key: &'static str) -> Result<String> {
        let query = TermQuery::new(
            Term::from_field_text(self.fields.sysdata, key),
            IndexRecordOption::Basic,
        );
        let (count, top) = searcher.search(&query, &(Count, TopDocs::with_limit(2)))?;
        match count {
            0 => return Err(FtsError::MissingBookkeeping(key)),
            1 => {}
            n => return Err(FtsError::DuplicateBookkeeping { key, count: n }),
        }
        let (_, addr) = top
            .first()
            .copied()
            .ok_or(FtsError::MissingBookkeeping(key))?;
        let doc: TantivyDocument = searcher.doc(addr)?;
        doc.get_first(self.fields.value)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| FtsError::CorruptedSnapshot(format!("bookkeeping '{}' has no value", key)))
    }

    /// Ranked entity ids matching `query`.
    ///
    /// Scores are multiplied by each document's stored boost. An entity
    /// indexed more than once is reported once with its best score. Ties
    /// are broken by ascending id.
    ///
    /// Results are read page by page until `limit` distinct entities are
    /// collected or the matches run out, so repeated documents of one entity
    /// never crowd out the others.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let parser = QueryParser::for_index(&self.index, vec![self.fields.mol]);
        let query = parser.parse_query(query)?;

        let snapshot = self.snapshot();
        let page_size = limit.saturating_mul(2);
        let mut best: FxHashMap<EntityId, f64> = FxHashMap::default();
        let mut offset = 0usize;

        loop {
            let collector = TopDocs::with_limit(page_size).and_offset(offset).tweak_score(
                move |segment_reader: &SegmentReader| {
                    let boost = segment_reader.fast_fields().f64(FIELD_BOOST).ok();
                    move |doc: DocId, score: Score| {
                        let factor = boost.as_ref().and_then(|c| c.first(doc)).unwrap_or(1.0);
                        score as f64 * factor
                    }
                },
            );
            let page = snapshot.searcher.search(&query, &collector)?;
            let fetched = page.len();

            for (score, addr) in page {
                let Some(id) = snapshot.doc_ids.entity_id(&snapshot.searcher, addr)? else {
                    continue;
                };
                best.entry(id)
                    .and_modify(|s| *s = s.max(score))
                    .or_insert(score);
            }

            if fetched < page_size || best.len() >= limit {
                break;
            }
            offset += fetched;
        }

        let mut hits: Vec<SearchHit> = best
            .into_iter()
            .map(|(id, score)| SearchHit { id, score })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Writer for molecule and bookkeeping documents.
///
/// Nothing becomes visible before `commit`; dropping the writer discards
/// all pending documents.
pub struct MoleculeWriter {
    writer: IndexWriter,
    fields: SchemaFields,
}

impl MoleculeWriter {
    pub fn add_molecule(&mut self, id: EntityId, text: &str, boost: f64) -> Result<()> {
        self.writer.add_document(doc!(
            self.fields.id => id,
            self.fields.mol => text,
            self.fields.boost => boost,
        ))?;
        Ok(())
    }

    /// Replace the bookkeeping document `key`.
    pub fn put_bookkeeping(&mut self, key: &str, value: &str) -> Result<()> {
        self.writer
            .delete_term(Term::from_field_text(self.fields.sysdata, key));
        self.writer.add_document(doc!(
            self.fields.sysdata => key,
            self.fields.value => value,
        ))?;
        Ok(())
    }

    /// Commit atomically and wait for background merges to finish.
    pub fn commit(mut self) -> Result<()> {
        self.writer.commit()?;
        self.writer.wait_merging_threads()?;
        Ok(())
    }

    /// Discard everything added since the last commit.
    pub fn abort(mut self) -> Result<()> {
        self.writer.rollback()?;
        Ok(())
    }
}
