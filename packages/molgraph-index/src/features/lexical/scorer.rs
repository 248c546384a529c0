//! Document scorers
//!
//! A scorer assigns a static boost to each center entity (for example a
//! precomputed rank). The boost is stored with the molecule document and
//! multiplies the text score at query time.
//!
//! Scorers are resolved by name from a [`ScorerRegistry`]. `none` (or an
//! empty name) disables boosting; `<name>:squared` squares the named
//! scorer's output.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{FtsError, Result};
use crate::shared::models::EntityId;

pub const SQUARED_SUFFIX: &str = ":squared";

pub trait DocumentScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, id: EntityId) -> f64;
}

/// Scores from a fixed table
#[derive(Debug, Clone)]
pub struct StaticScorer {
    name: String,
    scores: FxHashMap<EntityId, f64>,
    default: f64,
}

impl StaticScorer {
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            scores: FxHashMap::default(),
            default,
        }
    }

    pub fn with_score(mut self, id: EntityId, score: f64) -> Self {
        self.scores.insert(id, score);
        self
    }
}

impl DocumentScorer for StaticScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, id: EntityId) -> f64 {
        self.scores.get(&id).copied().unwrap_or(self.default)
    }
}

struct SquaredScorer {
    name: String,
    inner: Arc<dyn DocumentScorer>,
}

impl DocumentScorer for SquaredScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, id: EntityId) -> f64 {
        let s = self.inner.score(id);
        s * s
    }
}

#[derive(Clone, Default)]
pub struct ScorerRegistry {
    scorers: FxHashMap<String, Arc<dyn DocumentScorer>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the scorer's own name, replacing any previous one.
    pub fn register(&mut self, scorer: Arc<dyn DocumentScorer>) {
        self.scorers.insert(scorer.name().to_string(), scorer);
    }

    /// `Ok(None)` when boosting is disabled.
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<dyn DocumentScorer>>> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        if let Some(base) = name.strip_suffix(SQUARED_SUFFIX) {
            let inner = self
                .scorers
                .get(base)
                .cloned()
                .ok_or_else(|| FtsError::UnknownScorer(name.to_string()))?;
            return Ok(Some(Arc::new(SquaredScorer {
                name: name.to_string(),
                inner,
            })));
        }
        self.scorers
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| FtsError::UnknownScorer(name.to_string()))
    }
}
