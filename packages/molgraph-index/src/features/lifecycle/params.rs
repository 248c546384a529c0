//! Build parameters
//!
//! Parameters are set one key at a time and validated immediately; a
//! rejected value leaves the previous one in place. IRI lists are kept as
//! text and resolved against the graph store only when a build starts.

use std::path::Path;

use tracing::debug;

use crate::errors::{FtsError, Result};
use crate::features::molecule::{
    ExcludePattern, FlagFilter, IncludeFilter, IndexFilter, LanguageFilter, MoleculeConfig,
};
use crate::shared::ports::GraphStore;

pub const PARAM_MOLECULE_SIZE: &str = "molecule_size";
pub const PARAM_INDEX: &str = "index";
pub const PARAM_INCLUDE: &str = "include";
pub const PARAM_EXCLUDE: &str = "exclude";
pub const PARAM_EXCLUDE_FLAGS: &str = "exclude_flags";
pub const PARAM_LANGUAGES: &str = "languages";
pub const PARAM_INCLUDE_PREDICATES: &str = "include_predicates";
pub const PARAM_EXCLUDE_PREDICATES: &str = "exclude_predicates";
pub const PARAM_INCLUDE_ENTITIES: &str = "include_entities";
pub const PARAM_EXCLUDE_ENTITIES: &str = "exclude_entities";
pub const PARAM_ANALYZER: &str = "analyzer";
pub const PARAM_SCORER: &str = "scorer";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexParams {
    pub degree: u32,
    pub index_filter: IndexFilter,
    pub include_filter: IncludeFilter,
    pub exclude: Option<ExcludePattern>,
    pub exclude_flags: u32,
    pub languages: Option<LanguageFilter>,
    pub include_predicates: Option<Vec<String>>,
    pub exclude_predicates: Option<Vec<String>>,
    pub include_entities: Option<Vec<String>>,
    pub exclude_entities: Option<Vec<String>>,
    /// `None` falls back to the controller's default analyzer
    pub analyzer: Option<String>,
    pub scorer: Option<String>,
}

impl IndexParams {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let trimmed = value.trim();
        match key {
            PARAM_MOLECULE_SIZE => {
                self.degree = trimmed
                    .parse()
                    .map_err(|_| FtsError::invalid_parameter(key, value))?;
            }
            PARAM_INDEX => self.index_filter = IndexFilter::parse(value),
            PARAM_INCLUDE => self.include_filter = IncludeFilter::parse(value),
            PARAM_EXCLUDE => {
                self.exclude = if trimmed.is_empty() {
                    None
                } else {
                    Some(compile(value, self.exclude_flags)?)
                };
            }
            PARAM_EXCLUDE_FLAGS => {
                let flags = ExcludePattern::parse_flags(trimmed)
                    .ok_or_else(|| FtsError::invalid_parameter(key, value))?;
                if let Some(current) = &self.exclude {
                    self.exclude = Some(compile(current.source(), flags)?);
                }
                self.exclude_flags = flags;
            }
            PARAM_LANGUAGES => self.languages = LanguageFilter::parse(value),
            PARAM_INCLUDE_PREDICATES => self.include_predicates = parse_iri_list(key, value)?,
            PARAM_EXCLUDE_PREDICATES => self.exclude_predicates = parse_iri_list(key, value)?,
            PARAM_INCLUDE_ENTITIES => self.include_entities = parse_iri_list(key, value)?,
            PARAM_EXCLUDE_ENTITIES => self.exclude_entities = parse_iri_list(key, value)?,
            PARAM_ANALYZER => self.analyzer = non_empty(trimmed),
            PARAM_SCORER => self.scorer = non_empty(trimmed),
            other => return Err(FtsError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    /// Current value of `key` in the form `set` accepts.
    pub fn get(&self, key: &str) -> Result<String> {
        let list = |l: &Option<Vec<String>>| l.as_ref().map(|v| v.join(" ")).unwrap_or_default();
        Ok(match key {
            PARAM_MOLECULE_SIZE => self.degree.to_string(),
            PARAM_INDEX => self.index_filter.to_config_string(),
            PARAM_INCLUDE => self.include_filter.to_config_string(),
            PARAM_EXCLUDE => self
                .exclude
                .as_ref()
                .map(|p| p.source().to_string())
                .unwrap_or_default(),
            PARAM_EXCLUDE_FLAGS => flag_letters(self.exclude_flags),
            PARAM_LANGUAGES => self
                .languages
                .as_ref()
                .map(LanguageFilter::to_config_string)
                .unwrap_or_default(),
            PARAM_INCLUDE_PREDICATES => list(&self.include_predicates),
            PARAM_EXCLUDE_PREDICATES => list(&self.exclude_predicates),
            PARAM_INCLUDE_ENTITIES => list(&self.include_entities),
            PARAM_EXCLUDE_ENTITIES => list(&self.exclude_entities),
            PARAM_ANALYZER => self.analyzer.clone().unwrap_or_default(),
            PARAM_SCORER => self.scorer.clone().unwrap_or_default(),
            other => return Err(FtsError::UnknownParameter(other.to_string())),
        })
    }

    /// Resolve IRIs against `store` into a molecule configuration for the
    /// index stored in `index_dir`. Unknown IRIs are dropped.
    pub fn resolve(&self, store: &dyn GraphStore, index_dir: &Path) -> MoleculeConfig {
        let ids = |list: &Option<Vec<String>>| {
            list.as_ref().map(|iris| {
                MoleculeConfig::id_list(iris.iter().filter_map(|iri| {
                    let id = store.resolve(iri);
                    if id.is_none() {
                        debug!(iri = %iri, "Dropping unknown IRI from list");
                    }
                    id
                }))
            })
        };

        MoleculeConfig {
            degree: self.degree,
            index_filter: self.index_filter,
            include_filter: self.include_filter,
            languages: self.languages.clone(),
            exclude: self.exclude.clone(),
            include_predicates: ids(&self.include_predicates),
            exclude_predicates: ids(&self.exclude_predicates),
            include_entities: ids(&self.include_entities),
            exclude_entities: ids(&self.exclude_entities),
            data_dir: index_dir.to_path_buf(),
            entity_bits: store.entity_id_bits(),
        }
    }
}

fn compile(source: &str, flags: u32) -> Result<ExcludePattern> {
    ExcludePattern::new(source, flags).map_err(|e| FtsError::InvalidPattern {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}

fn flag_letters(flags: u32) -> String {
    [
        ('i', ExcludePattern::CASE_INSENSITIVE),
        ('m', ExcludePattern::MULTI_LINE),
        ('s', ExcludePattern::DOT_MATCHES_NEW_LINE),
        ('x', ExcludePattern::IGNORE_WHITESPACE),
    ]
    .iter()
    .filter(|(_, bit)| flags & bit != 0)
    .map(|(letter, _)| *letter)
    .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse `<iri1>, iri2 <iri3>`. Empty input means "no list".
fn parse_iri_list(param: &str, value: &str) -> Result<Option<Vec<String>>> {
    let mut iris = Vec::new();
    for token in value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let iri = match (token.strip_prefix('<'), token.ends_with('>')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => token,
            _ => {
                return Err(FtsError::malformed_list(
                    param,
                    format!("unbalanced brackets in '{}'", token),
                ))
            }
        };
        if iri.is_empty() || !iri.contains(':') || iri.contains(['<', '>']) {
            return Err(FtsError::malformed_list(
                param,
                format!("'{}' is not an absolute IRI", token),
            ));
        }
        iris.push(iri.to_string());
    }
    Ok((!iris.is_empty()).then_some(iris))
}
