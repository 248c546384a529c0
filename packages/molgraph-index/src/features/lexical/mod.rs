//! Lexical Search - Tantivy molecule index
//!
//! # Module Structure
//!
//! - `schema`: document schema and cached field handles
//! - `tokenizer`: analyzer registry and identifier tokenizer
//! - `scorer`: named document boosts
//! - `doc_cache`: lock-free document → entity id cache
//! - `text_index`: index wrapper, writer, bookkeeping, search
//! - `sidecar`: per-index properties record

pub mod doc_cache;
pub mod schema;
pub mod scorer;
pub mod sidecar;
pub mod text_index;
pub mod tokenizer;

pub use doc_cache::DocIdCache;
pub use schema::{SchemaFields, MOLECULE_TOKENIZER};
pub use scorer::{DocumentScorer, ScorerRegistry, StaticScorer};
pub use sidecar::IndexProperties;
pub use text_index::{
    Bookkeeping, MoleculeWriter, SearchHit, SearchSnapshot, TextIndex, KEY_LAST_INDEXED,
    KEY_MOLECULE,
};
pub use tokenizer::{AnalyzerRegistry, IdentifierTokenizer};
