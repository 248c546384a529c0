//! Index lifecycle controller
//!
//! Owns every named index under the data directory and runs the three
//! mutating operations against them:
//!
//! - `create_index`: full build into `<dir>.temp`, then directory swap
//! - `update_index`: index entities above the stored marker, one commit
//! - `add_to_index`: index one entity, marker untouched
//!
//! Mutations of one index are serialized through its [`IndexState`];
//! searches never wait for them and keep reading the last committed
//! snapshot until the mutation commits.
//!
//! Index `""` is the default index and lives in [`DEFAULT_INDEX_DIR`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use molgraph_storage::SqliteAdjacencyTable;
use parking_lot::{Mutex, RwLock};
use tantivy::tokenizer::TextAnalyzer;
use tracing::{debug, error, info, warn};

use super::params::IndexParams;
use super::state::IndexState;
use super::swap::{self, ADJACENCY_SUFFIX, TEMP_SUFFIX};
use crate::config::{ConfigError, ControllerConfig};
use crate::errors::{FtsError, Result};
use crate::features::fingerprint::{text_hash, Fingerprint};
use crate::features::lexical::{
    AnalyzerRegistry, DocumentScorer, IndexProperties, MoleculeWriter, ScorerRegistry, SearchHit,
    TextIndex, KEY_LAST_INDEXED, KEY_MOLECULE,
};
use crate::features::molecule::{MoleculeBuilder, MoleculeConfig, NeighborSource};
use crate::shared::models::EntityId;
use crate::shared::ports::GraphStore;

/// Directory name of the index called `""`
pub const DEFAULT_INDEX_DIR: &str = "@default";

/// Result of a full build or an update that indexed something
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub name: String,
    /// Entity ids examined
    pub scanned: u64,
    /// Documents written
    pub indexed: u64,
    /// Marker stored in the index after the operation
    pub marker: u64,
    /// Full build: fingerprint of the new index. Update: the XOR delta.
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(BuildReport),
    /// The marker already covers every entity; nothing was written
    UpToDate { marker: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Kind rejected by the index filter
    NotEligible,
    /// Not the canonical representative of its class
    NotCanonical,
    /// Rendering produced no text
    EmptyMolecule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Indexed { fingerprint_delta: Fingerprint },
    Skipped(SkipReason),
}

struct ManagedIndex {
    text: TextIndex,
    properties: Mutex<IndexProperties>,
}

impl ManagedIndex {
    /// Fold `delta` into the stored fingerprint and persist the sidecar.
    fn absorb(&self, delta: Fingerprint) -> Fingerprint {
        let mut props = self.properties.lock();
        props.fingerprint ^= delta.value();
        if let Err(e) = props.store(self.text.dir()) {
            warn!(dir = %self.text.dir().display(), error = %e, "Failed to persist index properties");
        }
        Fingerprint(props.fingerprint)
    }
}

pub struct IndexController {
    config: ControllerConfig,
    analyzers: AnalyzerRegistry,
    scorers: ScorerRegistry,
    params: RwLock<IndexParams>,
    indexes: RwLock<HashMap<String, Arc<ManagedIndex>>>,
    states: Mutex<HashMap<String, IndexState>>,
    shut_down: AtomicBool,
}

impl IndexController {
    /// Validate `config` and open every index found under its data
    /// directory. Unreadable indexes are logged and skipped.
    pub fn open(
        config: ControllerConfig,
        analyzers: AnalyzerRegistry,
        scorers: ScorerRegistry,
    ) -> Result<Self> {
        config.validate()?;
        if !analyzers.contains(&config.default_analyzer) {
            return Err(ConfigError::UnknownAnalyzer(config.default_analyzer.clone()).into());
        }
        fs::create_dir_all(&config.data_dir)?;

        let controller = Self {
            config,
            analyzers,
            scorers,
            params: RwLock::new(IndexParams::default()),
            indexes: RwLock::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        };
        controller.discover()?;
        Ok(controller)
    }

    fn discover(&self) -> Result<()> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(base) = dir_name.strip_suffix(swap::OLD_SUFFIX) {
                if index_name_of_dir(base).is_some() {
                    swap::recover_orphan(&self.config.data_dir.join(base));
                    names.push(base.to_string());
                }
                continue;
            }
            names.push(dir_name);
        }
        names.sort();
        names.dedup();

        for dir_name in names {
            let Some(name) = index_name_of_dir(&dir_name) else {
                continue;
            };
            let dir = self.config.data_dir.join(&dir_name);
            if !TextIndex::exists(&dir) {
                continue;
            }
            let props = IndexProperties::load_or_default(&dir, &self.config.default_analyzer);
            let Some(analyzer) = self.analyzers.get(&props.analyzer) else {
                error!(index = %dir_name, analyzer = %props.analyzer, "Skipping index with unknown analyzer");
                continue;
            };
            match TextIndex::open(&dir, analyzer) {
                Ok(text) => {
                    info!(index = %dir_name, docs = text.num_docs(), "Opened index");
                    self.register(name, text, props);
                }
                Err(e) => error!(index = %dir_name, error = %e, "Skipping unreadable index"),
            }
        }
        Ok(())
    }

    fn register(&self, name: &str, text: TextIndex, properties: IndexProperties) {
        let managed = Arc::new(ManagedIndex {
            text,
            properties: Mutex::new(properties),
        });
        self.indexes.write().insert(name.to_string(), managed);
        self.states
            .lock()
            .insert(name.to_string(), IndexState::Operational);
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Parameters and introspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Set one build parameter. Takes effect at the next full build;
    /// `scorer` also applies to updates and single adds.
    pub fn set_param(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_running()?;
        self.params.write().set(key, value)
    }

    pub fn param(&self, key: &str) -> Result<String> {
        self.params.read().get(key)
    }

    pub fn state(&self, name: &str) -> IndexState {
        if self.shut_down.load(Ordering::Acquire) {
            return IndexState::ShutDown;
        }
        self.states
            .lock()
            .get(name)
            .copied()
            .unwrap_or(IndexState::Unbuilt)
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fingerprint of one index.
    pub fn index_fingerprint(&self, name: &str) -> Result<Fingerprint> {
        let managed = self.managed(name)?;
        let fp = managed.properties.lock().fingerprint;
        Ok(Fingerprint(fp))
    }

    /// Combined fingerprint of all open indexes, sensitive to which index
    /// holds which content.
    pub fn fingerprint(&self) -> Fingerprint {
        self.indexes
            .read()
            .iter()
            .fold(Fingerprint::EMPTY, |acc, (name, managed)| {
                let fp = managed.properties.lock().fingerprint;
                acc ^ Fingerprint(text_hash(name).wrapping_add(fp))
            })
    }

    /// Run `query` against index `name`. `limit` is clamped to the
    /// configured maximum.
    pub fn search(&self, name: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let managed = self.managed(name)?;
        managed
            .text
            .search(query, limit.min(self.config.max_search_results))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Full build
    // ═══════════════════════════════════════════════════════════════════════

    pub fn create_index(&self, name: &str, store: &dyn GraphStore) -> Result<BuildReport> {
        self.ensure_running()?;
        validate_index_name(name)?;
        if store.is_read_only() {
            return Err(FtsError::ReadOnly);
        }

        let params = self.params.read().clone();
        let analyzer_name = params
            .analyzer
            .clone()
            .unwrap_or_else(|| self.config.default_analyzer.clone());
        let analyzer = self
            .analyzers
            .get(&analyzer_name)
            .ok_or_else(|| FtsError::UnknownAnalyzer(analyzer_name.clone()))?;
        let scorer = self.scorers.resolve(params.scorer.as_deref().unwrap_or(""))?;

        let dir = self.index_dir(name);
        let config = params.resolve(store, &dir);

        let previous = self.begin(name, IndexState::can_build, IndexState::Building)?;
        info!(index = name, degree = config.degree, analyzer = %analyzer_name, "Starting full build");

        let temp = swap::sibling(&dir, TEMP_SUFFIX);
        let result = self
            .build_into(name, &temp, &config, analyzer.clone(), scorer.as_deref(), store)
            .and_then(|report| {
                let text = swap::swap_in(&dir, &temp, |live| TextIndex::open(live, analyzer))?;
                Ok((report, text))
            });

        match result {
            Ok((report, text)) => {
                let props = IndexProperties::new(analyzer_name, report.fingerprint.value());
                if let Err(e) = props.store(&dir) {
                    warn!(dir = %dir.display(), error = %e, "Failed to persist index properties");
                }
                self.register(name, text, props);
                info!(
                    index = name,
                    indexed = report.indexed,
                    fingerprint = %report.fingerprint,
                    "Full build complete"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(rm) = swap::remove_dir_if_exists(&temp) {
                    warn!(dir = %temp.display(), error = %rm, "Failed to remove partial build");
                }
                self.set_state(name, previous);
                error!(index = name, error = %e, "Full build failed");
                Err(e)
            }
        }
    }

    /// Build a complete index in `temp` and commit it.
    fn build_into(
        &self,
        name: &str,
        temp: &Path,
        config: &MoleculeConfig,
        analyzer: TextAnalyzer,
        scorer: Option<&dyn DocumentScorer>,
        store: &dyn GraphStore,
    ) -> Result<BuildReport> {
        swap::remove_dir_if_exists(temp)?;
        let text = TextIndex::create(temp, analyzer)?;
        let mut writer = text.writer(self.config.writer_heap_bytes)?;
        let builder = MoleculeBuilder::new(config, store);
        let count = store.entity_count();

        let (indexed, fingerprint) = if config.degree > 0 {
            let path = swap::sibling(&config.data_dir, ADJACENCY_SUFFIX);
            let mut table =
                SqliteAdjacencyTable::open(&path, count + 1, count + 1, config.entity_bits)?;
            let scanned = builder.materialize(&mut table).map_err(FtsError::from).and_then(|edges| {
                debug!(index = name, edges, "Adjacency table materialized");
                let source = NeighborSource::Adjacency(&table);
                self.scan(name, &builder, &mut writer, source, scorer, store, count)
            });
            table.close();
            if let Err(e) = fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Adjacency file not removed");
            }
            scanned?
        } else {
            self.scan(name, &builder, &mut writer, NeighborSource::Store, scorer, store, count)?
        };

        let snapshot = config.to_snapshot();
        let reparsed = MoleculeConfig::from_snapshot(&snapshot)
            .map_err(|e| FtsError::CorruptedSnapshot(e.to_string()))?;
        if reparsed.to_snapshot() != snapshot {
            return Err(FtsError::CorruptedSnapshot(
                "configuration does not survive a snapshot round trip".to_string(),
            ));
        }
        writer.put_bookkeeping(KEY_LAST_INDEXED, &count.to_string())?;
        writer.put_bookkeeping(KEY_MOLECULE, &snapshot)?;
        writer.commit()?;

        Ok(BuildReport {
            name: name.to_string(),
            scanned: count,
            indexed,
            marker: count,
            fingerprint,
        })
    }

    fn scan(
        &self,
        name: &str,
        builder: &MoleculeBuilder<'_>,
        writer: &mut MoleculeWriter,
        source: NeighborSource<'_>,
        scorer: Option<&dyn DocumentScorer>,
        store: &dyn GraphStore,
        count: u64,
    ) -> Result<(u64, Fingerprint)> {
        let mut fingerprint = Fingerprint::EMPTY;
        let mut indexed = 0u64;
        for id in 1..=count {
            if eligibility(builder.config(), store, id).is_ok() {
                let text = builder.build_full(id, source)?;
                if !text.is_empty() {
                    writer.add_molecule(id, &text, boost(scorer, id))?;
                    fingerprint.add_entity(id, &text);
                    indexed += 1;
                }
            }
            self.report_progress(name, id, count, indexed);
        }
        Ok((indexed, fingerprint))
    }

    fn report_progress(&self, name: &str, processed: u64, total: u64, indexed: u64) {
        if processed % self.config.progress_interval == 0 {
            info!(index = name, processed, total, indexed, "Indexing progress");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Incremental update and single add
    // ═══════════════════════════════════════════════════════════════════════

    /// Index every entity above the stored marker.
    pub fn update_index(&self, name: &str, store: &dyn GraphStore) -> Result<UpdateOutcome> {
        self.ensure_running()?;
        let managed = self.managed(name)?;
        if store.is_read_only() {
            return Err(FtsError::ReadOnly);
        }
        let scorer = self.current_scorer()?;

        self.begin(name, IndexState::can_update, IndexState::Updating)?;
        let result = self.run_update(name, &managed, scorer.as_deref(), store);
        self.set_state(name, IndexState::Operational);

        match &result {
            Ok(UpdateOutcome::UpToDate { marker }) => {
                info!(index = name, marker, "Index already up to date")
            }
            Ok(UpdateOutcome::Updated(report)) => info!(
                index = name,
                indexed = report.indexed,
                marker = report.marker,
                "Update complete"
            ),
            Err(e) => error!(index = name, error = %e, "Update failed"),
        }
        result
    }

    fn run_update(
        &self,
        name: &str,
        managed: &ManagedIndex,
        scorer: Option<&dyn DocumentScorer>,
        store: &dyn GraphStore,
    ) -> Result<UpdateOutcome> {
        let bookkeeping = managed.text.bookkeeping()?;
        let config = MoleculeConfig::from_snapshot(&bookkeeping.snapshot)
            .map_err(|e| FtsError::CorruptedSnapshot(e.to_string()))?;
        let count = store.entity_count();
        if bookkeeping.marker >= count {
            return Ok(UpdateOutcome::UpToDate {
                marker: bookkeeping.marker,
            });
        }

        let builder = MoleculeBuilder::new(&config, store);
        let mut writer = managed.text.writer(self.config.writer_heap_bytes)?;
        let mut delta = Fingerprint::EMPTY;
        let mut indexed = 0u64;
        for id in bookkeeping.marker + 1..=count {
            if eligibility(&config, store, id).is_ok() {
                if let Some(text) = builder.build_incremental(id)? {
                    writer.add_molecule(id, &text, boost(scorer, id))?;
                    delta.add_entity(id, &text);
                    indexed += 1;
                }
            }
            self.report_progress(name, id, count, indexed);
        }
        writer.put_bookkeeping(KEY_LAST_INDEXED, &count.to_string())?;
        writer.commit()?;
        managed.text.reload()?;
        managed.absorb(delta);

        Ok(UpdateOutcome::Updated(BuildReport {
            name: name.to_string(),
            scanned: count - bookkeeping.marker,
            indexed,
            marker: count,
            fingerprint: delta,
        }))
    }

    /// Index one entity with the stored configuration. The marker is
    /// neither read nor advanced.
    pub fn add_to_index(
        &self,
        name: &str,
        id: EntityId,
        store: &dyn GraphStore,
    ) -> Result<AddOutcome> {
        self.ensure_running()?;
        let managed = self.managed(name)?;
        if store.is_read_only() {
            return Err(FtsError::ReadOnly);
        }
        if id == 0 || id > store.entity_count() {
            return Err(FtsError::UnknownEntity(id));
        }
        let scorer = self.current_scorer()?;

        self.begin(name, IndexState::can_update, IndexState::Updating)?;
        let result = self.run_add(&managed, id, scorer.as_deref(), store);
        self.set_state(name, IndexState::Operational);

        match &result {
            Ok(outcome) => debug!(index = name, id, outcome = ?outcome, "Single add"),
            Err(e) => error!(index = name, id, error = %e, "Single add failed"),
        }
        result
    }

    fn run_add(
        &self,
        managed: &ManagedIndex,
        id: EntityId,
        scorer: Option<&dyn DocumentScorer>,
        store: &dyn GraphStore,
    ) -> Result<AddOutcome> {
        let snapshot = managed.text.bookkeeping()?.snapshot;
        let config = MoleculeConfig::from_snapshot(&snapshot)
            .map_err(|e| FtsError::CorruptedSnapshot(e.to_string()))?;
        if let Err(reason) = eligibility(&config, store, id) {
            return Ok(AddOutcome::Skipped(reason));
        }
        let Some(text) = MoleculeBuilder::new(&config, store).build_incremental(id)? else {
            return Ok(AddOutcome::Skipped(SkipReason::EmptyMolecule));
        };

        let mut writer = managed.text.writer(self.config.writer_heap_bytes)?;
        writer.add_molecule(id, &text, boost(scorer, id))?;
        writer.commit()?;
        managed.text.reload()?;

        let mut delta = Fingerprint::EMPTY;
        delta.add_entity(id, &text);
        managed.absorb(delta);
        Ok(AddOutcome::Indexed {
            fingerprint_delta: delta,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shutdown
    // ═══════════════════════════════════════════════════════════════════════

    /// Persist every sidecar and release all indexes. Later operations
    /// fail with [`FtsError::ShutDown`]. Calling it again does nothing.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let indexes: Vec<(String, Arc<ManagedIndex>)> = self.indexes.write().drain().collect();
        let mut states = self.states.lock();
        for (name, managed) in indexes {
            let props = managed.properties.lock().clone();
            match props.store(managed.text.dir()) {
                Ok(()) => debug!(index = %name, "Index properties flushed"),
                Err(e) => warn!(index = %name, error = %e, "Failed to flush index properties"),
            }
            states.insert(name, IndexState::ShutDown);
        }
        info!("Index controller shut down");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(FtsError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn managed(&self, name: &str) -> Result<Arc<ManagedIndex>> {
        self.ensure_running()?;
        self.indexes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FtsError::IndexNotFound(dir_name_of_index(name).to_string()))
    }

    fn current_scorer(&self) -> Result<Option<Arc<dyn DocumentScorer>>> {
        let name = self.params.read().scorer.clone().unwrap_or_default();
        self.scorers.resolve(&name)
    }

    fn index_dir(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(dir_name_of_index(name))
    }

    /// Move `name` to `next` if `allowed` accepts its current state.
    fn begin(
        &self,
        name: &str,
        allowed: fn(IndexState) -> bool,
        next: IndexState,
    ) -> Result<IndexState> {
        let mut states = self.states.lock();
        let current = states.get(name).copied().unwrap_or(IndexState::Unbuilt);
        if !allowed(current) {
            return Err(FtsError::Locked(format!(
                "index '{}' is {}",
                dir_name_of_index(name),
                current
            )));
        }
        states.insert(name.to_string(), next);
        Ok(current)
    }

    fn set_state(&self, name: &str, state: IndexState) {
        self.states.lock().insert(name.to_string(), state);
    }
}

fn eligibility(
    config: &MoleculeConfig,
    store: &dyn GraphStore,
    id: EntityId,
) -> std::result::Result<(), SkipReason> {
    match store.kind_of(id) {
        Some(kind) if config.index_filter.accepts(kind) => {}
        _ => return Err(SkipReason::NotEligible),
    }
    if store.canonical(id) != id {
        return Err(SkipReason::NotCanonical);
    }
    Ok(())
}

fn boost(scorer: Option<&dyn DocumentScorer>, id: EntityId) -> f64 {
    scorer.map_or(1.0, |s| s.score(id))
}

/// Index names are ASCII letters, digits and `_`; the empty name is the
/// default index.
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(FtsError::InvalidIndexName(name.to_string()))
    }
}

fn dir_name_of_index(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_INDEX_DIR
    } else {
        name
    }
}

fn index_name_of_dir(dir_name: &str) -> Option<&str> {
    if dir_name == DEFAULT_INDEX_DIR {
        Some("")
    } else if !dir_name.is_empty() && validate_index_name(dir_name).is_ok() {
        Some(dir_name)
    } else {
        None
    }
}
