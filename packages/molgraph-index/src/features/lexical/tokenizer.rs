//! Analyzers for molecule text
//!
//! # Built-in analyzers
//!
//! - `standard`: split on non-alphanumerics, drop very long tokens, lowercase
//! - `whitespace`: split on whitespace only, case preserved
//! - `english`: `standard` plus English stemming
//! - `identifier`: camelCase / snake_case aware splitting, lowercased
//!
//! The analyzer of an index is picked by name at build time and registered
//! under [`MOLECULE_TOKENIZER`](super::schema::MOLECULE_TOKENIZER) every time
//! the index is opened.

use std::collections::HashMap;

use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer, Token,
    TokenStream, Tokenizer, WhitespaceTokenizer,
};

const MAX_TOKEN_LEN: usize = 40;

/// Identifier-aware tokenizer.
///
/// Local names of predicates and classes are usually compound words:
/// - `hasAuthor` → `["has", "Author"]`
/// - `birth_date` → `["birth", "date"]`
/// - `XMLLiteral` → `["XML", "Literal"]`
/// - `rdf:type` → `["rdf", "type"]`
#[derive(Clone, Default)]
pub struct IdentifierTokenizer;

impl Tokenizer for IdentifierTokenizer {
    type TokenStream<'a> = IdentifierTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        IdentifierTokenStream {
            tokens: split_identifiers(text),
            current_index: 0,
        }
    }
}

pub struct IdentifierTokenStream {
    tokens: Vec<Token>,
    current_index: usize,
}

fn split_identifiers(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<char> = None;

    let emit = |tokens: &mut Vec<Token>, from: usize, to: usize| {
        if from < to {
            tokens.push(Token {
                offset_from: from,
                offset_to: to,
                position: tokens.len(),
                text: text[from..to].to_string(),
                position_length: 1,
            });
        }
    };

    for (idx, &(i, ch)) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if let Some(s) = start.take() {
                emit(&mut tokens, s, i);
            }
            prev = None;
            continue;
        }

        match (start, prev) {
            (Some(s), Some(p)) => {
                let next_is_lower = chars
                    .get(idx + 1)
                    .is_some_and(|(_, c)| c.is_lowercase());
                // camelCase, HTTPSConnection, utf8Decoder
                let boundary = (p.is_lowercase() && ch.is_uppercase())
                    || (p.is_uppercase() && ch.is_uppercase() && next_is_lower)
                    || (p.is_ascii_digit() && ch.is_uppercase());
                if boundary {
                    emit(&mut tokens, s, i);
                    start = Some(i);
                }
            }
            _ => start = Some(i),
        }
        prev = Some(ch);
    }

    if let Some(s) = start {
        emit(&mut tokens, s, text.len());
    }
    tokens
}

impl TokenStream for IdentifierTokenStream {
    fn advance(&mut self) -> bool {
        if self.current_index < self.tokens.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.current_index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.current_index - 1]
    }
}

/// Named analyzers available to index builds.
#[derive(Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<String, TextAnalyzer>,
}

impl AnalyzerRegistry {
    /// Registry holding only the built-in analyzers
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            analyzers: HashMap::new(),
        };
        registry.register(
            "standard",
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .build(),
        );
        registry.register("whitespace", TextAnalyzer::from(WhitespaceTokenizer::default()));
        registry.register(
            "english",
            TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(Stemmer::new(Language::English))
                .build(),
        );
        registry.register(
            "identifier",
            TextAnalyzer::builder(IdentifierTokenizer)
                .filter(LowerCaser)
                .build(),
        );
        registry
    }

    /// Add or replace an analyzer.
    pub fn register(&mut self, name: impl Into<String>, analyzer: TextAnalyzer) {
        self.analyzers.insert(name.into(), analyzer);
    }

    pub fn get(&self, name: &str) -> Option<TextAnalyzer> {
        self.analyzers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.analyzers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
