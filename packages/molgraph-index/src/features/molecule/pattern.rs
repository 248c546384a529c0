//! Exclusion pattern applied to rendered values

use std::fmt;

use regex::{Regex, RegexBuilder};

/// Regular expression that removes a rendered value when it matches the
/// whole value.
#[derive(Clone)]
pub struct ExcludePattern {
    source: String,
    flags: u32,
    regex: Regex,
}

impl ExcludePattern {
    pub const CASE_INSENSITIVE: u32 = 1;
    pub const MULTI_LINE: u32 = 2;
    pub const DOT_MATCHES_NEW_LINE: u32 = 4;
    pub const IGNORE_WHITESPACE: u32 = 8;
    const ALL_FLAGS: u32 = 0b1111;

    const LETTERS: [(char, u32); 4] = [
        ('i', Self::CASE_INSENSITIVE),
        ('m', Self::MULTI_LINE),
        ('s', Self::DOT_MATCHES_NEW_LINE),
        ('x', Self::IGNORE_WHITESPACE),
    ];

    pub fn new(source: &str, flags: u32) -> Result<Self, regex::Error> {
        if flags & !Self::ALL_FLAGS != 0 {
            return Err(regex::Error::Syntax(format!(
                "unsupported pattern flags {:#x}",
                flags
            )));
        }
        // Bare source first: `a)|(b` only parses once wrapped.
        Self::compile(source, flags)?;
        let regex = Self::compile(&format!(r"\A(?:{})\z", source), flags)?;
        Ok(Self {
            source: source.to_string(),
            flags,
            regex,
        })
    }

    fn compile(pattern: &str, flags: u32) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(flags & Self::CASE_INSENSITIVE != 0)
            .multi_line(flags & Self::MULTI_LINE != 0)
            .dot_matches_new_line(flags & Self::DOT_MATCHES_NEW_LINE != 0)
            .ignore_whitespace(flags & Self::IGNORE_WHITESPACE != 0)
            .build()
    }

    /// Parse flag letters such as `"is"`. `None` on an unknown letter.
    pub fn parse_flags(letters: &str) -> Option<u32> {
        letters.trim().chars().try_fold(0u32, |acc, ch| {
            Self::LETTERS
                .iter()
                .find(|(letter, _)| *letter == ch.to_ascii_lowercase())
                .map(|(_, bit)| acc | bit)
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for ExcludePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for ExcludePattern {}

impl fmt::Debug for ExcludePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludePattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_value_match_only() {
        let p = ExcludePattern::new("foo", 0).unwrap();
        assert!(p.is_match("foo"));
        assert!(!p.is_match("foobar"));
        assert!(!p.is_match("a foo"));
    }

    #[test]
    fn test_alternation_is_grouped() {
        let p = ExcludePattern::new("a|b", 0).unwrap();
        assert!(p.is_match("a"));
        assert!(p.is_match("b"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn test_case_insensitive_flag() {
        let p = ExcludePattern::new("hello", ExcludePattern::CASE_INSENSITIVE).unwrap();
        assert!(p.is_match("HeLLo"));
    }

    #[test]
    fn test_multi_line_keeps_whole_value_semantics() {
        let p = ExcludePattern::new("a$", ExcludePattern::MULTI_LINE).unwrap();
        assert!(p.is_match("a"));
        assert!(!p.is_match("a\nb"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ExcludePattern::new("(", 0).is_err());
        assert!(ExcludePattern::new("a", 1 << 7).is_err());
    }

    #[test]
    fn test_unbalanced_groups_rejected() {
        assert!(ExcludePattern::new("a)|(b", 0).is_err());
        assert!(ExcludePattern::new("x)(?:y", 0).is_err());
        assert!(ExcludePattern::new(r"skip\", 0).is_err());
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(ExcludePattern::parse_flags(""), Some(0));
        assert_eq!(
            ExcludePattern::parse_flags("iS"),
            Some(ExcludePattern::CASE_INSENSITIVE | ExcludePattern::DOT_MATCHES_NEW_LINE)
        );
        assert_eq!(ExcludePattern::parse_flags("q"), None);
    }

    #[test]
    fn test_equality_ignores_compiled_form() {
        let a = ExcludePattern::new("x+", 0).unwrap();
        let b = ExcludePattern::new("x+", 0).unwrap();
        let c = ExcludePattern::new("x+", ExcludePattern::CASE_INSENSITIVE).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
