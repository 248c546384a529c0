//! Graph entity and statement models

use std::fmt;

/// Internal entity id. Ids start at 1.
pub type EntityId = u64;

/// Reserved id meaning "no entity" (and "any" in a pattern position).
pub const NO_ENTITY: EntityId = 0;

/// Kind tag of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Uri,
    BlankNode,
    Literal,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Uri => "uri",
            EntityKind::BlankNode => "bnode",
            EntityKind::Literal => "literal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of an entity as seen by molecule rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityValue {
    Uri {
        namespace: String,
        local_name: String,
    },
    BlankNode {
        label: String,
    },
    Literal {
        lexical: String,
        language: Option<String>,
    },
}

impl EntityValue {
    /// Split an IRI after its last `#`, `/` or `:`.
    ///
    /// `http://example.com/ns#Thing` -> (`http://example.com/ns#`, `Thing`)
    pub fn uri(iri: &str) -> Self {
        let split = iri.rfind(['#', '/', ':']).map(|i| i + 1).unwrap_or(0);
        EntityValue::Uri {
            namespace: iri[..split].to_string(),
            local_name: iri[split..].to_string(),
        }
    }

    pub fn literal(lexical: impl Into<String>, language: Option<&str>) -> Self {
        EntityValue::Literal {
            lexical: lexical.into(),
            language: language.map(|l| l.to_ascii_lowercase()),
        }
    }

    pub fn blank(label: impl Into<String>) -> Self {
        EntityValue::BlankNode {
            label: label.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityValue::Uri { .. } => EntityKind::Uri,
            EntityValue::BlankNode { .. } => EntityKind::BlankNode,
            EntityValue::Literal { .. } => EntityKind::Literal,
        }
    }

    /// Text a molecule shows for this value: local name or lexical form.
    pub fn display_text(&self) -> &str {
        match self {
            EntityValue::Uri { local_name, .. } => local_name,
            EntityValue::BlankNode { label } => label,
            EntityValue::Literal { lexical, .. } => lexical,
        }
    }

    /// Full IRI for URIs
    pub fn iri(&self) -> Option<String> {
        match self {
            EntityValue::Uri {
                namespace,
                local_name,
            } => Some(format!("{}{}", namespace, local_name)),
            _ => None,
        }
    }
}

/// Statement (subject, predicate, object, context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: EntityId,
    pub predicate: EntityId,
    pub object: EntityId,
    pub context: EntityId,
}

impl Statement {
    pub fn new(subject: EntityId, predicate: EntityId, object: EntityId) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: NO_ENTITY,
        }
    }
}

/// Statement pattern; `None` is a wildcard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementPattern {
    pub subject: Option<EntityId>,
    pub predicate: Option<EntityId>,
    pub object: Option<EntityId>,
    pub context: Option<EntityId>,
}

impl StatementPattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(subject: EntityId) -> Self {
        Self {
            subject: Some(subject),
            ..Self::default()
        }
    }

    pub fn matches(&self, st: &Statement) -> bool {
        self.subject.map_or(true, |s| s == st.subject)
            && self.predicate.map_or(true, |p| p == st.predicate)
            && self.object.map_or(true, |o| o == st.object)
            && self.context.map_or(true, |c| c == st.context)
    }
}
