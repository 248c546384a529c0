//! Molecule configuration
//!
//! Everything molecule construction depends on, in resolved form. A full
//! build persists this configuration inside the index; updates rebuild it
//! from that snapshot and nothing else, so `to_snapshot` after
//! `from_snapshot` must reproduce the stored text exactly.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::filter::{FlagFilter, IncludeFilter, IndexFilter};
use super::pattern::ExcludePattern;
use crate::features::snapshot::{decode, encode, SnapshotError, SnapshotValue};
use crate::shared::models::EntityId;

/// Language restriction for literals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageFilter {
    pub tags: BTreeSet<String>,
    /// Admit literals without a language tag
    pub allow_missing: bool,
}

impl LanguageFilter {
    /// Parse `"en, de, none"`. An empty value means no restriction.
    pub fn parse(value: &str) -> Option<Self> {
        let mut filter = LanguageFilter::default();
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("none") {
                filter.allow_missing = true;
            } else {
                filter.tags.insert(token.to_ascii_lowercase());
            }
        }
        if filter.tags.is_empty() && !filter.allow_missing {
            None
        } else {
            Some(filter)
        }
    }

    pub fn accepts(&self, language: Option<&str>) -> bool {
        match language {
            None => self.allow_missing,
            Some(tag) => self.tags.contains(&tag.to_ascii_lowercase()),
        }
    }

    pub fn to_config_string(&self) -> String {
        let mut parts: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        if self.allow_missing {
            parts.push("none");
        }
        parts.join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeConfig {
    /// Hop budget; blank nodes are traversed for free
    pub degree: u32,
    pub index_filter: IndexFilter,
    pub include_filter: IncludeFilter,
    /// `None` admits every literal
    pub languages: Option<LanguageFilter>,
    pub exclude: Option<ExcludePattern>,
    // Sorted, deduplicated id lists; `None` means no list
    pub include_predicates: Option<Vec<EntityId>>,
    pub exclude_predicates: Option<Vec<EntityId>>,
    /// Persisted with the configuration; traversal does not consult it
    pub include_entities: Option<Vec<EntityId>>,
    pub exclude_entities: Option<Vec<EntityId>>,
    /// Directory of the index this configuration belongs to
    pub data_dir: PathBuf,
    pub entity_bits: u32,
}

impl Default for MoleculeConfig {
    fn default() -> Self {
        Self {
            degree: 0,
            index_filter: IndexFilter::default(),
            include_filter: IncludeFilter::default(),
            languages: None,
            exclude: None,
            include_predicates: None,
            exclude_predicates: None,
            include_entities: None,
            exclude_entities: None,
            data_dir: PathBuf::new(),
            entity_bits: 40,
        }
    }
}

impl MoleculeConfig {
    /// Normalize an id list: sorted ascending, no duplicates.
    pub fn id_list(ids: impl IntoIterator<Item = EntityId>) -> Vec<EntityId> {
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn predicate_allowed(&self, predicate: EntityId) -> bool {
        if let Some(include) = &self.include_predicates {
            if include.binary_search(&predicate).is_err() {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_predicates {
            if exclude.binary_search(&predicate).is_ok() {
                return false;
            }
        }
        true
    }

    pub fn entity_excluded(&self, entity: EntityId) -> bool {
        self.exclude_entities
            .as_ref()
            .is_some_and(|list| list.binary_search(&entity).is_ok())
    }

    pub fn language_allowed(&self, language: Option<&str>) -> bool {
        self.languages
            .as_ref()
            .map_or(true, |filter| filter.accepts(language))
    }

    pub fn value_excluded(&self, value: &str) -> bool {
        self.exclude.as_ref().is_some_and(|p| p.is_match(value))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Snapshot
    // ═══════════════════════════════════════════════════════════════════════

    pub fn to_snapshot(&self) -> String {
        encode(&self.to_snapshot_value())
    }

    pub fn from_snapshot(text: &str) -> Result<Self, SnapshotError> {
        Self::from_snapshot_value(&decode(text)?)
    }

    fn to_snapshot_value(&self) -> SnapshotValue {
        let mut entries = vec![
            (
                "entity_bits".to_string(),
                SnapshotValue::str(self.entity_bits.to_string()),
            ),
            (
                "degree".to_string(),
                SnapshotValue::str(self.degree.to_string()),
            ),
            (
                "include_filter".to_string(),
                flags_value(&self.include_filter),
            ),
            ("index_filter".to_string(), flags_value(&self.index_filter)),
        ];

        if let Some(pattern) = &self.exclude {
            let flags = match pattern.flags() {
                0 => SnapshotValue::Gap,
                f => SnapshotValue::str(f.to_string()),
            };
            entries.push((
                "exclude".to_string(),
                SnapshotValue::Arr(vec![SnapshotValue::str(pattern.source()), flags]),
            ));
        }

        let allow_missing = self.languages.as_ref().is_some_and(|l| l.allow_missing);
        entries.push((
            "allow_missing_language".to_string(),
            SnapshotValue::str(allow_missing.to_string()),
        ));
        if let Some(languages) = &self.languages {
            entries.push((
                "languages".to_string(),
                SnapshotValue::Arr(languages.tags.iter().map(SnapshotValue::str).collect()),
            ));
        }

        entries.push((
            "data_dir".to_string(),
            SnapshotValue::str(self.data_dir.to_string_lossy()),
        ));

        let lists = [
            ("include_predicates", &self.include_predicates),
            ("exclude_predicates", &self.exclude_predicates),
            ("include_entities", &self.include_entities),
            ("exclude_entities", &self.exclude_entities),
        ];
        for (key, list) in lists {
            if let Some(ids) = list {
                entries.push((
                    key.to_string(),
                    SnapshotValue::Arr(ids.iter().map(|id| SnapshotValue::str(id.to_string())).collect()),
                ));
            }
        }

        SnapshotValue::Map(entries)
    }

    fn from_snapshot_value(value: &SnapshotValue) -> Result<Self, SnapshotError> {
        if !matches!(value, SnapshotValue::Map(_)) {
            return Err(SnapshotError::new("configuration must be a map", 0));
        }

        let exclude = match value.get("exclude") {
            None => None,
            Some(v) => {
                let items = v
                    .as_array()
                    .filter(|items| items.len() == 2)
                    .ok_or_else(|| invalid("exclude"))?;
                let source = items[0].as_str().ok_or_else(|| invalid("exclude"))?;
                let flags = match &items[1] {
                    SnapshotValue::Gap => 0,
                    other => parse_number::<u32>(other, "exclude")?,
                };
                let pattern = ExcludePattern::new(source, flags)
                    .map_err(|e| SnapshotError::new(format!("exclude: {}", e), 0))?;
                Some(pattern)
            }
        };

        let allow_missing = parse_bool(required(value, "allow_missing_language")?, "allow_missing_language")?;
        let languages = match value.get("languages") {
            None if allow_missing => Some(LanguageFilter {
                tags: BTreeSet::new(),
                allow_missing,
            }),
            None => None,
            Some(v) => {
                let tags = strings(v, "languages")?
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                Some(LanguageFilter {
                    tags,
                    allow_missing,
                })
            }
        };

        Ok(Self {
            degree: parse_number(required(value, "degree")?, "degree")?,
            index_filter: parse_flags(required(value, "index_filter")?, "index_filter")?,
            include_filter: parse_flags(required(value, "include_filter")?, "include_filter")?,
            languages,
            exclude,
            include_predicates: id_list(value, "include_predicates")?,
            exclude_predicates: id_list(value, "exclude_predicates")?,
            include_entities: id_list(value, "include_entities")?,
            exclude_entities: id_list(value, "exclude_entities")?,
            data_dir: PathBuf::from(
                required(value, "data_dir")?
                    .as_str()
                    .ok_or_else(|| invalid("data_dir"))?,
            ),
            entity_bits: parse_number(required(value, "entity_bits")?, "entity_bits")?,
        })
    }
}

fn flags_value<F: FlagFilter>(filter: &F) -> SnapshotValue {
    SnapshotValue::Map(
        F::FLAGS
            .iter()
            .zip(filter.values())
            .map(|(name, on)| (name.to_string(), SnapshotValue::str(on.to_string())))
            .collect(),
    )
}

fn invalid(key: &str) -> SnapshotError {
    SnapshotError::new(format!("invalid value for '{}'", key), 0)
}

fn required<'a>(map: &'a SnapshotValue, key: &str) -> Result<&'a SnapshotValue, SnapshotError> {
    map.get(key)
        .ok_or_else(|| SnapshotError::new(format!("missing '{}'", key), 0))
}

fn parse_number<T: std::str::FromStr>(value: &SnapshotValue, key: &str) -> Result<T, SnapshotError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(key))
}

fn parse_bool(value: &SnapshotValue, key: &str) -> Result<bool, SnapshotError> {
    match value.as_str() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(invalid(key)),
    }
}

fn parse_flags<F: FlagFilter>(value: &SnapshotValue, key: &str) -> Result<F, SnapshotError> {
    let mut values = [false; 3];
    for (idx, name) in F::FLAGS.iter().enumerate() {
        let flag = value
            .get(name)
            .ok_or_else(|| SnapshotError::new(format!("missing flag '{}' in '{}'", name, key), 0))?;
        values[idx] = parse_bool(flag, key)?;
    }
    Ok(F::from_values(values))
}

fn strings<'a>(value: &'a SnapshotValue, key: &str) -> Result<Vec<&'a str>, SnapshotError> {
    value
        .as_array()
        .ok_or_else(|| invalid(key))?
        .iter()
        .map(|item| item.as_str().ok_or_else(|| invalid(key)))
        .collect()
}

fn id_list(map: &SnapshotValue, key: &str) -> Result<Option<Vec<EntityId>>, SnapshotError> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let ids = strings(value, key)?
        .into_iter()
        .map(|s| s.parse::<EntityId>().map_err(|_| invalid(key)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(MoleculeConfig::id_list(ids)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full_config() -> MoleculeConfig {
        MoleculeConfig {
            degree: 2,
            index_filter: IndexFilter::parse("uri,literal"),
            include_filter: IncludeFilter::parse("uri,centre,literal"),
            languages: LanguageFilter::parse("en, DE, none"),
            exclude: Some(
                ExcludePattern::new("skip\"me\\\\", ExcludePattern::CASE_INSENSITIVE).unwrap(),
            ),
            include_predicates: Some(MoleculeConfig::id_list([9, 3, 3])),
            exclude_predicates: Some(vec![]),
            include_entities: Some(vec![4]),
            exclude_entities: Some(vec![7, 8]),
            data_dir: PathBuf::from("/data/fts/books"),
            entity_bits: 32,
        }
    }

    #[test]
    fn test_language_filter_parse() {
        assert_eq!(LanguageFilter::parse(""), None);
        assert_eq!(LanguageFilter::parse(" , "), None);

        let only_missing = LanguageFilter::parse("NONE").unwrap();
        assert!(only_missing.allow_missing);
        assert!(only_missing.tags.is_empty());
        assert!(only_missing.accepts(None));
        assert!(!only_missing.accepts(Some("en")));
    }

    #[test]
    fn test_language_filter_accepts() {
        let de = LanguageFilter::parse("de").unwrap();
        assert!(de.accepts(Some("de")));
        assert!(de.accepts(Some("DE")));
        assert!(!de.accepts(Some("en")));
        assert!(!de.accepts(None));
    }

    #[test]
    fn test_no_language_restriction_admits_all() {
        let config = MoleculeConfig::default();
        assert!(config.language_allowed(None));
        assert!(config.language_allowed(Some("fr")));
    }

    #[test]
    fn test_predicate_lists() {
        let mut config = MoleculeConfig::default();
        assert!(config.predicate_allowed(5));

        config.include_predicates = Some(vec![2, 5]);
        assert!(config.predicate_allowed(5));
        assert!(!config.predicate_allowed(3));

        config.exclude_predicates = Some(vec![5]);
        assert!(!config.predicate_allowed(5));
        assert!(config.predicate_allowed(2));
    }

    #[test]
    fn test_entity_exclusion() {
        let config = full_config();
        assert!(config.entity_excluded(7));
        assert!(!config.entity_excluded(4));
    }

    #[test]
    fn test_snapshot_key_order() {
        let text = MoleculeConfig::default().to_snapshot();
        assert_eq!(
            text,
            concat!(
                r#"{"entity_bits":"40","degree":"0","#,
                r#""include_filter":{"uri":"false","centre":"false","literal":"true"},"#,
                r#""index_filter":{"uri":"false","bnode":"false","literal":"true"},"#,
                r#""allow_missing_language":"false","data_dir":""}"#
            )
        );
    }

    #[test]
    fn test_snapshot_roundtrip_full() {
        let config = full_config();
        let text = config.to_snapshot();
        let restored = MoleculeConfig::from_snapshot(&text).unwrap();
        assert_eq!(restored, config);
        assert_eq!(restored.to_snapshot(), text);

        let pattern = restored.exclude.as_ref().unwrap();
        assert_eq!(pattern.source(), "skip\"me\\\\");
        assert!(pattern.is_match("SKIP\"me\\"));
    }

    #[test]
    fn test_exclude_without_flags_uses_gap() {
        let config = MoleculeConfig {
            exclude: Some(ExcludePattern::new("x", 0).unwrap()),
            ..MoleculeConfig::default()
        };
        let text = config.to_snapshot();
        assert!(text.contains(r#""exclude":["x",~]"#));
        assert_eq!(MoleculeConfig::from_snapshot(&text).unwrap(), config);
    }

    #[test]
    fn test_only_missing_language_roundtrip() {
        let config = MoleculeConfig {
            languages: LanguageFilter::parse("none"),
            ..MoleculeConfig::default()
        };
        let text = config.to_snapshot();
        assert_eq!(MoleculeConfig::from_snapshot(&text).unwrap(), config);
    }

    #[test]
    fn test_snapshot_missing_key() {
        let err = MoleculeConfig::from_snapshot(r#"{"degree":"1"}"#).unwrap_err();
        assert!(err.message.contains("allow_missing_language") || err.message.contains("missing"));
    }

    #[test]
    fn test_snapshot_bad_values() {
        let base = MoleculeConfig::default().to_snapshot();
        assert!(MoleculeConfig::from_snapshot(&base.replace(r#""degree":"0""#, r#""degree":"x""#)).is_err());
        assert!(MoleculeConfig::from_snapshot(&base.replace(r#""uri":"false""#, r#""uri":"maybe""#)).is_err());
        assert!(MoleculeConfig::from_snapshot("[]").is_err());
        assert!(MoleculeConfig::from_snapshot("{").is_err());
    }

    #[test]
    fn test_snapshot_invalid_regex_rejected() {
        let text = MoleculeConfig::default()
            .to_snapshot()
            .replace(r#""allow_missing"#, r#""exclude":["(",~],"allow_missing"#);
        assert!(MoleculeConfig::from_snapshot(&text).is_err());
    }
}
