//! Kind filters
//!
//! `IndexFilter` decides which entity kinds may become index documents.
//! `IncludeFilter` decides which visited nodes contribute text to a molecule.
//!
//! Both parse the same way: a comma separated list where each token turns on
//! every flag it starts with, so `"uris, literals"` enables `uri` and
//! `literal`.

use tracing::warn;

use crate::shared::models::EntityKind;

/// Boolean flags parsed from a comma separated parameter.
pub trait FlagFilter: Sized {
    const FLAGS: [&'static str; 3];

    /// Extra spellings accepted for a flag: (alias, flag)
    const ALIASES: &'static [(&'static str, &'static str)] = &[];

    fn from_values(values: [bool; 3]) -> Self;

    fn values(&self) -> [bool; 3];

    fn parse(config: &str) -> Self {
        let mut values = [false; 3];
        for token in config.split(',') {
            let token = token.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }
            let token = Self::ALIASES
                .iter()
                .find(|(alias, _)| token.starts_with(alias))
                .map(|(_, flag)| flag.to_string())
                .unwrap_or(token);

            let mut matched = false;
            for (idx, flag) in Self::FLAGS.iter().enumerate() {
                if token.starts_with(flag) {
                    values[idx] = true;
                    matched = true;
                }
            }
            if !matched {
                warn!(token = %token, flags = ?Self::FLAGS, "Ignoring unknown filter token");
            }
        }
        Self::from_values(values)
    }

    /// Enabled flag names joined by `,`
    fn to_config_string(&self) -> String {
        Self::FLAGS
            .iter()
            .zip(self.values())
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Which entity kinds become index documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFilter {
    pub uri: bool,
    pub bnode: bool,
    pub literal: bool,
}

impl IndexFilter {
    pub fn accepts(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Uri => self.uri,
            EntityKind::BlankNode => self.bnode,
            EntityKind::Literal => self.literal,
        }
    }
}

impl Default for IndexFilter {
    fn default() -> Self {
        Self::parse("literals")
    }
}

impl FlagFilter for IndexFilter {
    const FLAGS: [&'static str; 3] = ["uri", "bnode", "literal"];

    fn from_values([uri, bnode, literal]: [bool; 3]) -> Self {
        Self {
            uri,
            bnode,
            literal,
        }
    }

    fn values(&self) -> [bool; 3] {
        [self.uri, self.bnode, self.literal]
    }
}

/// Which visited nodes contribute text to a molecule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeFilter {
    pub uri: bool,
    pub centre: bool,
    pub literal: bool,
}

impl Default for IncludeFilter {
    fn default() -> Self {
        Self::parse("literals")
    }
}

impl FlagFilter for IncludeFilter {
    const FLAGS: [&'static str; 3] = ["uri", "centre", "literal"];
    const ALIASES: &'static [(&'static str, &'static str)] = &[("center", "centre")];

    fn from_values([uri, centre, literal]: [bool; 3]) -> Self {
        Self {
            uri,
            centre,
            literal,
        }
    }

    fn values(&self) -> [bool; 3] {
        [self.uri, self.centre, self.literal]
    }
}
