//! Common test utilities for molgraph-index
//!
//! Fixture graphs and a controller factory shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use molgraph_index::{
    AnalyzerRegistry, ControllerConfig, EntityId, IndexController, MemoryGraphStore,
    ScorerRegistry, StaticScorer,
};

pub const EX: &str = "http://example.org/";

/// Smallest heap tantivy accepts; keeps the tests light.
pub const TEST_HEAP: usize = 15_000_000;

pub fn iri(local: &str) -> String {
    format!("{}{}", EX, local)
}

/// Install a subscriber once so `RUST_LOG=debug` shows controller logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two books with titles and one blank-node author:
///
/// ```text
/// book1 -title-> "Rust in Action"@en
/// book1 -author-> _:a1 -name-> "Tim McNamara"
/// book2 -title-> "Programming Rust"@en
/// book2 -title-> "Programmieren mit Rust"@de
/// ```
pub struct Library {
    pub store: MemoryGraphStore,
    pub title: EntityId,
    pub author: EntityId,
    pub name: EntityId,
    pub book1: EntityId,
    pub book1_title: EntityId,
    pub author1: EntityId,
    pub author1_name: EntityId,
    pub book2: EntityId,
    pub book2_title: EntityId,
    pub book2_title_de: EntityId,
}

pub const BOOK1_TEXT: &str = "Rust in Action Tim McNamara";
pub const BOOK2_TEXT: &str = "Programming Rust Programmieren mit Rust";

pub fn library() -> Library {
    let mut store = MemoryGraphStore::new();
    let title = store.uri(&iri("title"));
    let author = store.uri(&iri("author"));
    let name = store.uri(&iri("name"));
    let book1 = store.uri(&iri("book1"));
    let book1_title = store.literal("Rust in Action", Some("en"));
    let author1 = store.blank("a1");
    let author1_name = store.literal("Tim McNamara", None);
    let book2 = store.uri(&iri("book2"));
    let book2_title = store.literal("Programming Rust", Some("en"));
    let book2_title_de = store.literal("Programmieren mit Rust", Some("de"));

    store.add(book1, title, book1_title);
    store.add(book1, author, author1);
    store.add(author1, name, author1_name);
    store.add(book2, title, book2_title);
    store.add(book2, title, book2_title_de);

    Library {
        store,
        title,
        author,
        name,
        book1,
        book1_title,
        author1,
        author1_name,
        book2,
        book2_title,
        book2_title_de,
    }
}

impl Library {
    /// Append a book with one title; returns the book id.
    pub fn add_book(&mut self, local: &str, title: &str) -> EntityId {
        let book = self.store.uri(&iri(local));
        let literal = self.store.literal(title, Some("en"));
        self.store.add(book, self.title, literal);
        book
    }
}

pub fn test_config(dir: &Path) -> ControllerConfig {
    ControllerConfig::new(dir)
        .writer_heap_bytes(TEST_HEAP)
        .progress_interval(5)
}

pub fn controller(dir: &Path) -> IndexController {
    init_tracing();
    IndexController::open(
        test_config(dir),
        AnalyzerRegistry::with_builtins(),
        popularity_scorers(),
    )
    .unwrap()
}

/// `popularity` boosts entity 4 (book1 in [`library`]) tenfold.
pub fn popularity_scorers() -> ScorerRegistry {
    let mut scorers = ScorerRegistry::new();
    scorers.register(Arc::new(StaticScorer::new("popularity", 1.0).with_score(4, 10.0)));
    scorers
}

/// Books become documents holding the literals within one hop.
pub fn configure_books(ctrl: &IndexController) {
    ctrl.set_param("index", "uri").unwrap();
    ctrl.set_param("include", "literal").unwrap();
    ctrl.set_param("molecule_size", "1").unwrap();
}

pub fn hit_ids(hits: &[molgraph_index::SearchHit]) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = hits.iter().map(|h| h.id).collect();
    ids.sort_unstable();
    ids
}
