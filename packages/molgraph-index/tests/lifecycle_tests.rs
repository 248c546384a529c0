//! Index lifecycle integration tests
//!
//! Full build, incremental update, single add, discovery and shutdown
//! against real tantivy indexes in temporary directories.

mod common;

use std::fs;

use common::*;
use molgraph_index::features::fingerprint::text_hash;
use molgraph_index::features::lexical::{IndexProperties, TextIndex, KEY_MOLECULE};
use molgraph_index::{
    AddOutcome, AnalyzerRegistry, ErrorClass, Fingerprint, FtsError, IndexState, SkipReason,
    UpdateOutcome,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn library_fingerprint(lib: &Library) -> Fingerprint {
    Fingerprint::fold_entity(lib.book1, text_hash(BOOK1_TEXT))
        ^ Fingerprint::fold_entity(lib.book2, text_hash(BOOK2_TEXT))
}

// ═══════════════════════════════════════════════════════════════════════════
// Full build
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_build_and_search() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);

    assert_eq!(ctrl.state("books"), IndexState::Unbuilt);
    let report = ctrl.create_index("books", &lib.store).unwrap();

    assert_eq!(report.scanned, 10);
    assert_eq!(report.marker, 10);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.fingerprint, library_fingerprint(&lib));
    assert_eq!(ctrl.state("books"), IndexState::Operational);
    assert_eq!(ctrl.index_fingerprint("books").unwrap(), report.fingerprint);

    let hits = ctrl.search("books", "mcnamara", 10).unwrap();
    assert_eq!(hit_ids(&hits), vec![lib.book1]);

    let hits = ctrl.search("books", "rust", 10).unwrap();
    assert_eq!(hit_ids(&hits), vec![lib.book1, lib.book2]);

    // Temporary and adjacency artifacts are gone
    assert!(dir.path().join("books").is_dir());
    assert!(!dir.path().join("books.temp").exists());
    assert!(!dir.path().join("books.old").exists());
}

#[test]
fn test_search_limits() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();

    assert_eq!(ctrl.search("books", "rust", 1).unwrap().len(), 1);
    assert!(ctrl.search("books", "rust", 0).unwrap().is_empty());
    assert!(ctrl.search("books", "nothing_matches_this", 10).unwrap().is_empty());
}

#[test]
fn test_invalid_query() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();

    let err = ctrl.search("books", "(rust", 10).unwrap_err();
    assert!(matches!(err, FtsError::InvalidQuery(_)));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[test]
fn test_default_index_uses_reserved_directory() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();

    // Defaults: literals are documents and render themselves
    let report = ctrl.create_index("", &lib.store).unwrap();
    assert_eq!(report.indexed, 4);
    assert!(dir.path().join("@default").is_dir());

    let hits = ctrl.search("", "programmieren", 10).unwrap();
    assert_eq!(hit_ids(&hits), vec![lib.book2_title_de]);
}

#[test]
fn test_rebuild_replaces_index() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();

    ctrl.set_param("exclude_predicates", &iri("author")).unwrap();
    let report = ctrl.create_index("books", &lib.store).unwrap();
    assert_eq!(report.indexed, 2);

    assert!(ctrl.search("books", "mcnamara", 10).unwrap().is_empty());
    assert_eq!(
        hit_ids(&ctrl.search("books", "action", 10).unwrap()),
        vec![lib.book1]
    );
    assert!(!dir.path().join("books.old").exists());
}

// ═══════════════════════════════════════════════════════════════════════════
// Rejections
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_read_only_store_rejected() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    lib.store.set_read_only(true);

    let err = ctrl.create_index("books", &lib.store).unwrap_err();
    assert!(matches!(err, FtsError::ReadOnly));
    assert_eq!(err.class(), ErrorClass::Configuration);
    assert_eq!(ctrl.state("books"), IndexState::Unbuilt);
    assert!(!dir.path().join("books").exists());
}

#[test]
fn test_invalid_index_name_rejected() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();

    for name in ["my-books", "books.temp", "../escape"] {
        let err = ctrl.create_index(name, &lib.store).unwrap_err();
        assert!(matches!(err, FtsError::InvalidIndexName(_)), "{}", name);
    }
    assert!(ctrl.index_names().is_empty());
}

#[test]
fn test_unknown_scorer_and_analyzer_rejected_before_build() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();

    ctrl.set_param("scorer", "nope").unwrap();
    let err = ctrl.create_index("books", &lib.store).unwrap_err();
    assert!(matches!(err, FtsError::UnknownScorer(_)));

    ctrl.set_param("scorer", "").unwrap();
    ctrl.set_param("analyzer", "klingon").unwrap();
    let err = ctrl.create_index("books", &lib.store).unwrap_err();
    assert!(matches!(err, FtsError::UnknownAnalyzer(_)));

    assert_eq!(ctrl.state("books"), IndexState::Unbuilt);
    assert!(!dir.path().join("books").exists());
    assert!(!dir.path().join("books.temp").exists());
}

#[test]
fn test_update_and_add_require_existing_index() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();

    assert!(matches!(
        ctrl.update_index("books", &lib.store),
        Err(FtsError::IndexNotFound(_))
    ));
    assert!(matches!(
        ctrl.add_to_index("books", lib.book1, &lib.store),
        Err(FtsError::IndexNotFound(_))
    ));
    assert!(matches!(
        ctrl.search("books", "rust", 10),
        Err(FtsError::IndexNotFound(_))
    ));
}

#[test]
fn test_failed_rebuild_keeps_previous_index() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    let first = ctrl.create_index("books", &lib.store).unwrap();

    // A plain file where the build directory should go
    fs::write(dir.path().join("books.temp"), b"in the way").unwrap();

    let err = ctrl.create_index("books", &lib.store).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Storage);
    assert_eq!(ctrl.state("books"), IndexState::Operational);
    assert_eq!(ctrl.index_fingerprint("books").unwrap(), first.fingerprint);
    assert_eq!(
        hit_ids(&ctrl.search("books", "mcnamara", 10).unwrap()),
        vec![lib.book1]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Incremental update
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_update_without_new_entities_is_noop() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    let report = ctrl.create_index("books", &lib.store).unwrap();

    let outcome = ctrl.update_index("books", &lib.store).unwrap();
    assert_eq!(outcome, UpdateOutcome::UpToDate { marker: 10 });
    assert_eq!(ctrl.index_fingerprint("books").unwrap(), report.fingerprint);
    assert_eq!(ctrl.state("books"), IndexState::Operational);
}

#[test]
fn test_update_indexes_new_entities() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    configure_books(&ctrl);
    let built = ctrl.create_index("books", &lib.store).unwrap();

    let book3 = lib.add_book("book3", "Rust Atomics and Locks");
    let outcome = ctrl.update_index("books", &lib.store).unwrap();

    let delta = Fingerprint::fold_entity(book3, text_hash("Rust Atomics and Locks"));
    match outcome {
        UpdateOutcome::Updated(report) => {
            assert_eq!(report.scanned, 2);
            assert_eq!(report.indexed, 1);
            assert_eq!(report.marker, 12);
            assert_eq!(report.fingerprint, delta);
        }
        other => panic!("expected an update, got {:?}", other),
    }
    assert_eq!(
        ctrl.index_fingerprint("books").unwrap(),
        built.fingerprint ^ delta
    );
    assert_eq!(
        hit_ids(&ctrl.search("books", "atomics", 10).unwrap()),
        vec![book3]
    );

    assert_eq!(
        ctrl.update_index("books", &lib.store).unwrap(),
        UpdateOutcome::UpToDate { marker: 12 }
    );
}

#[test]
fn test_update_uses_stored_configuration() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();

    // With degree 0 a book would render nothing; the stored degree 1 wins
    ctrl.set_param("molecule_size", "0").unwrap();
    ctrl.set_param("index", "literal").unwrap();
    let book3 = lib.add_book("book3", "Zero To Production");

    match ctrl.update_index("books", &lib.store).unwrap() {
        UpdateOutcome::Updated(report) => assert_eq!(report.indexed, 1),
        other => panic!("expected an update, got {:?}", other),
    }
    assert_eq!(
        hit_ids(&ctrl.search("books", "production", 10).unwrap()),
        vec![book3]
    );
}

#[test]
fn test_corrupted_snapshot_aborts_update() {
    let dir = TempDir::new().unwrap();
    let mut lib = library();
    {
        let ctrl = controller(dir.path());
        configure_books(&ctrl);
        ctrl.create_index("books", &lib.store).unwrap();
        ctrl.shutdown();
    }
    {
        let analyzer = AnalyzerRegistry::with_builtins().get("standard").unwrap();
        let index = TextIndex::open(&dir.path().join("books"), analyzer).unwrap();
        let mut writer = index.writer(TEST_HEAP).unwrap();
        writer.put_bookkeeping(KEY_MOLECULE, "{\"degree\":").unwrap();
        writer.commit().unwrap();
    }

    let ctrl = controller(dir.path());
    lib.add_book("book3", "Hands-on Rust");

    let err = ctrl.update_index("books", &lib.store).unwrap_err();
    assert!(matches!(err, FtsError::CorruptedSnapshot(_)));
    assert_eq!(err.class(), ErrorClass::Consistency);
    assert_eq!(ctrl.state("books"), IndexState::Operational);

    let err = ctrl.add_to_index("books", lib.book1, &lib.store).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Consistency);

    // Still searchable
    assert_eq!(
        hit_ids(&ctrl.search("books", "mcnamara", 10).unwrap()),
        vec![lib.book1]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Single add
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_add_to_index_outcomes() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    configure_books(&ctrl);
    let built = ctrl.create_index("books", &lib.store).unwrap();

    let book3 = lib.add_book("book3", "Rust Atomics and Locks");
    let book3_title = book3 + 1;
    let book4 = lib.add_book("book4", "Rust in Action Second Edition");
    lib.store.merge(lib.book1, book4);

    let delta = Fingerprint::fold_entity(book3, text_hash("Rust Atomics and Locks"));
    assert_eq!(
        ctrl.add_to_index("books", book3, &lib.store).unwrap(),
        AddOutcome::Indexed {
            fingerprint_delta: delta
        }
    );
    assert_eq!(
        ctrl.add_to_index("books", book3_title, &lib.store).unwrap(),
        AddOutcome::Skipped(SkipReason::NotEligible)
    );
    assert_eq!(
        ctrl.add_to_index("books", book4, &lib.store).unwrap(),
        AddOutcome::Skipped(SkipReason::NotCanonical)
    );
    assert_eq!(
        ctrl.add_to_index("books", lib.title, &lib.store).unwrap(),
        AddOutcome::Skipped(SkipReason::EmptyMolecule)
    );
    for id in [0, 999] {
        assert!(matches!(
            ctrl.add_to_index("books", id, &lib.store),
            Err(FtsError::UnknownEntity(_))
        ));
    }

    assert_eq!(
        ctrl.index_fingerprint("books").unwrap(),
        built.fingerprint ^ delta
    );
    assert_eq!(
        hit_ids(&ctrl.search("books", "atomics", 10).unwrap()),
        vec![book3]
    );
}

#[test]
fn test_add_does_not_advance_marker() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();

    let book3 = lib.add_book("book3", "Rust Atomics and Locks");
    ctrl.add_to_index("books", book3, &lib.store).unwrap();

    // The update still walks 11..=12 and indexes book3 a second time
    match ctrl.update_index("books", &lib.store).unwrap() {
        UpdateOutcome::Updated(report) => {
            assert_eq!(report.marker, 12);
            assert_eq!(report.indexed, 1);
        }
        other => panic!("expected an update, got {:?}", other),
    }

    // Duplicate documents collapse into one hit
    let hits = ctrl.search("books", "atomics", 10).unwrap();
    assert_eq!(hit_ids(&hits), vec![book3]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Scorers and analyzers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_scorer_boosts_ranking() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    ctrl.set_param("scorer", "popularity").unwrap();
    ctrl.create_index("books", &lib.store).unwrap();

    let hits = ctrl.search("books", "rust", 10).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, lib.book1);
    assert!(hits[0].score > hits[1].score);

    ctrl.set_param("scorer", "popularity:squared").unwrap();
    ctrl.create_index("squared", &lib.store).unwrap();
    let hits = ctrl.search("squared", "rust", 10).unwrap();
    assert_eq!(hits[0].id, lib.book1);
}

#[test]
fn test_analyzer_recorded_and_reused() {
    let dir = TempDir::new().unwrap();
    let lib = library();
    {
        let ctrl = controller(dir.path());
        configure_books(&ctrl);
        ctrl.set_param("analyzer", "english").unwrap();
        ctrl.create_index("books", &lib.store).unwrap();

        // Stemming: "programs" and "Programming" share a stem
        assert_eq!(
            hit_ids(&ctrl.search("books", "programs", 10).unwrap()),
            vec![lib.book2]
        );
        ctrl.shutdown();
    }

    let props = IndexProperties::load_or_default(&dir.path().join("books"), "standard");
    assert_eq!(props.analyzer, "english");
    assert_eq!(props.version, "1");

    let ctrl = controller(dir.path());
    assert_eq!(
        hit_ids(&ctrl.search("books", "programs", 10).unwrap()),
        vec![lib.book2]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Discovery and shutdown
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_reopen_discovers_indexes() {
    let dir = TempDir::new().unwrap();
    let lib = library();
    let fingerprint = {
        let ctrl = controller(dir.path());
        ctrl.create_index("", &lib.store).unwrap();
        configure_books(&ctrl);
        ctrl.create_index("books", &lib.store).unwrap();
        let fp = ctrl.fingerprint();
        ctrl.shutdown();
        fp
    };

    fs::create_dir_all(dir.path().join("not-an-index")).unwrap();
    fs::create_dir_all(dir.path().join("books.temp")).unwrap();
    fs::create_dir_all(dir.path().join("empty")).unwrap();

    let ctrl = controller(dir.path());
    assert_eq!(ctrl.index_names(), vec!["".to_string(), "books".to_string()]);
    assert_eq!(ctrl.state("books"), IndexState::Operational);
    assert_eq!(ctrl.state("empty"), IndexState::Unbuilt);
    assert_eq!(ctrl.fingerprint(), fingerprint);
    assert_eq!(
        hit_ids(&ctrl.search("books", "mcnamara", 10).unwrap()),
        vec![lib.book1]
    );
}

#[test]
fn test_interrupted_swap_recovered_on_open() {
    let dir = TempDir::new().unwrap();
    let lib = library();
    {
        let ctrl = controller(dir.path());
        configure_books(&ctrl);
        ctrl.create_index("books", &lib.store).unwrap();
        ctrl.shutdown();
    }
    // Crash between "move live aside" and "move new into place"
    fs::rename(dir.path().join("books"), dir.path().join("books.old")).unwrap();

    let ctrl = controller(dir.path());
    assert_eq!(ctrl.index_names(), vec!["books".to_string()]);
    assert!(!dir.path().join("books.old").exists());
}

#[test]
fn test_controller_fingerprint_combines_indexes() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    ctrl.create_index("first", &lib.store).unwrap();
    ctrl.create_index("second", &lib.store).unwrap();

    let fp = library_fingerprint(&lib).value();
    let expected = Fingerprint(text_hash("first").wrapping_add(fp))
        ^ Fingerprint(text_hash("second").wrapping_add(fp));
    assert_eq!(ctrl.fingerprint(), expected);
    assert_ne!(ctrl.fingerprint(), Fingerprint::EMPTY);
}

#[test]
fn test_shutdown_flushes_and_rejects() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let lib = library();
    configure_books(&ctrl);
    let report = ctrl.create_index("books", &lib.store).unwrap();

    ctrl.shutdown();
    ctrl.shutdown();

    let props = IndexProperties::load_or_default(&dir.path().join("books"), "standard");
    assert_eq!(props.fingerprint, report.fingerprint.value());
    assert_eq!(props.analyzer, "standard");

    assert_eq!(ctrl.state("books"), IndexState::ShutDown);
    assert!(matches!(
        ctrl.search("books", "rust", 10),
        Err(FtsError::ShutDown)
    ));
    assert!(matches!(
        ctrl.create_index("books", &lib.store),
        Err(FtsError::ShutDown)
    ));
    assert!(matches!(
        ctrl.set_param("molecule_size", "2"),
        Err(FtsError::ShutDown)
    ));
}

#[test]
fn test_search_during_update_sees_committed_state() {
    let dir = TempDir::new().unwrap();
    let ctrl = controller(dir.path());
    let mut lib = library();
    configure_books(&ctrl);
    ctrl.create_index("books", &lib.store).unwrap();
    for i in 0..50 {
        lib.add_book(&format!("extra{}", i), &format!("Rust volume {}", i));
    }

    std::thread::scope(|s| {
        let searcher = s.spawn(|| {
            for _ in 0..20 {
                let hits = ctrl.search("books", "mcnamara", 10).unwrap();
                assert_eq!(hit_ids(&hits), vec![lib.book1]);
            }
        });
        ctrl.update_index("books", &lib.store).unwrap();
        searcher.join().unwrap();
    });

    assert_eq!(ctrl.search("books", "volume", 100).unwrap().len(), 50);
}
