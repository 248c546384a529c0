//! Snapshot value encoder/decoder
//!
//! # Grammar
//!
//! ```text
//! value := string | array | map | '~'
//! string := '"' (char | '\"' | '\\' | '\n' | '\t' | '\r')* '"'
//! array := '[' (value (',' value)*)? ']'
//! map := '{' (string ':' value (',' string ':' value)*)? '}'
//! ```
//!
//! `~` is a gap and may only appear inside arrays. The encoder emits no
//! whitespace; the decoder skips whitespace between tokens. Encoding is
//! deterministic, so decode-then-encode reproduces the input of a previous
//! encode byte for byte.

use std::fmt::Write as _;

use thiserror::Error;

const GAP: char = '~';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotValue {
    /// Omitted array position
    Gap,
    Str(String),
    Arr(Vec<SnapshotValue>),
    /// Entries keep their insertion order
    Map(Vec<(String, SnapshotValue)>),
}

impl SnapshotValue {
    pub fn str(s: impl Into<String>) -> Self {
        SnapshotValue::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SnapshotValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[SnapshotValue]> {
        match self {
            SnapshotValue::Arr(items) => Some(items),
            _ => None,
        }
    }

    /// First entry named `key` of a map
    pub fn get(&self, key: &str) -> Option<&SnapshotValue> {
        match self {
            SnapshotValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {position}")]
pub struct SnapshotError {
    pub message: String,
    pub position: usize,
}

impl SnapshotError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════════════════════

pub fn encode(value: &SnapshotValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &SnapshotValue) {
    match value {
        SnapshotValue::Gap => out.push(GAP),
        SnapshotValue::Str(s) => write_string(out, s),
        SnapshotValue::Arr(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        SnapshotValue::Map(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// ═══════════════════════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════════════════════

pub fn decode(text: &str) -> Result<SnapshotValue, SnapshotError> {
    let mut parser = Parser { text, pos: 0 };
    let value = parser.value(false)?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(SnapshotError::new("trailing characters", parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), SnapshotError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(SnapshotError::new(
                format!("expected '{}', found '{}'", want, c),
                self.pos - c.len_utf8(),
            )),
            None => Err(SnapshotError::new(
                format!("expected '{}', found end of input", want),
                self.pos,
            )),
        }
    }

    fn value(&mut self, in_array: bool) -> Result<SnapshotValue, SnapshotError> {
        self.skip_ws();
        match self.peek() {
            Some('"') => Ok(SnapshotValue::Str(self.string()?)),
            Some('[') => self.array(),
            Some('{') => self.map(),
            Some(GAP) if in_array => {
                self.pos += 1;
                Ok(SnapshotValue::Gap)
            }
            Some(c) => Err(SnapshotError::new(format!("unexpected '{}'", c), self.pos)),
            None => Err(SnapshotError::new("unexpected end of input", self.pos)),
        }
    }

    fn array(&mut self) -> Result<SnapshotValue, SnapshotError> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(SnapshotValue::Arr(items));
        }
        loop {
            items.push(self.value(true)?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(SnapshotValue::Arr(items)),
                _ => return Err(SnapshotError::new("unterminated array", self.pos)),
            }
        }
    }

    fn map(&mut self) -> Result<SnapshotValue, SnapshotError> {
        self.expect('{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(SnapshotValue::Map(entries));
        }
        loop {
            self.skip_ws();
            if self.peek() != Some('"') {
                return Err(SnapshotError::new("map key must be a string", self.pos));
            }
            let key = self.string()?;
            self.expect(':')?;
            let value = self.value(false)?;
            entries.push((key, value));
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(SnapshotValue::Map(entries)),
                _ => return Err(SnapshotError::new("unterminated map", self.pos)),
            }
        }
    }

    fn string(&mut self) -> Result<String, SnapshotError> {
        let start = self.pos;
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('u') => out.push(self.unicode_escape()?),
                    _ => return Err(SnapshotError::new("invalid escape", self.pos)),
                },
                Some(c) => out.push(c),
                None => return Err(SnapshotError::new("unterminated string", start)),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, SnapshotError> {
        let start = self.pos;
        let hex = self
            .text
            .get(start..start + 4)
            .ok_or_else(|| SnapshotError::new("short unicode escape", start))?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| SnapshotError::new("invalid unicode escape", start))?;
        self.pos += 4;
        char::from_u32(code).ok_or_else(|| SnapshotError::new("invalid code point", start))
    }
}
