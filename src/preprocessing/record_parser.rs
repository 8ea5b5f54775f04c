//! Tolerant parser for serialized record lists
//!
//! Semi-structured movie columns store a Python-literal list of mappings per
//! cell, e.g. `[{'id': 35, 'name': 'Comedy'}]`. Null cells and anything that
//! does not parse as a list of mappings yield no records rather than an error,
//! so a single bad row never fails a whole column.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::CharIndices;

/// Nesting limit for lists and mappings inside one cell
const MAX_DEPTH: usize = 64;

/// A parsed literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<LiteralValue>),
    Dict(IndexMap<String, LiteralValue>),
}

impl LiteralValue {
    fn write_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Str(v) => write!(f, "'{}'", v),
            other => write!(f, "{}", other),
        }
    }
}

/// Python-style rendering; top-level strings are written bare
impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => f.write_str("None"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Int(v) => write!(f, "{}", v),
            LiteralValue::Float(v) => write!(f, "{:?}", v),
            LiteralValue::Str(v) => f.write_str(v),
            LiteralValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_nested(f)?;
                }
                f.write_str("]")
            }
            LiteralValue::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}': ", key)?;
                    value.write_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Identifying key of a record: an integer id or a code such as `"US"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(v) => write!(f, "{}", v),
            RecordKey::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(v: i64) -> Self {
        RecordKey::Int(v)
    }
}

impl From<&str> for RecordKey {
    fn from(v: &str) -> Self {
        RecordKey::Str(v.to_string())
    }
}

/// One mapping from a record list, fields kept in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedRecord {
    fields: IndexMap<String, LiteralValue>,
}

impl TaggedRecord {
    /// Build a record from `(field, value)` pairs
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, LiteralValue)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Raw value of a field
    pub fn get(&self, field: &str) -> Option<&LiteralValue> {
        self.fields.get(field)
    }

    /// Field read as an identifying key. Only integers and strings qualify.
    pub fn key(&self, field: &str) -> Option<RecordKey> {
        match self.fields.get(field)? {
            LiteralValue::Int(v) => Some(RecordKey::Int(*v)),
            LiteralValue::Str(v) => Some(RecordKey::Str(v.clone())),
            _ => None,
        }
    }

    /// Field read as text
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            LiteralValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Field rendered as text whatever its type; `None` only when absent
    pub fn label(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.fields.get(field)? {
            LiteralValue::Str(v) => Some(Cow::Borrowed(v.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Display name (`name` field)
    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Display name, with non-text names such as `None` rendered
    pub fn name_label(&self) -> Option<Cow<'_, str>> {
        self.label("name")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of parsing one cell
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCell {
    /// The cell held a well-formed list of mappings (possibly empty)
    Records(Vec<TaggedRecord>),
    /// Null, non-text or malformed cell
    Empty,
}

impl ParsedCell {
    pub fn into_records(self) -> Vec<TaggedRecord> {
        match self {
            ParsedCell::Records(records) => records,
            ParsedCell::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParsedCell::Records(records) => records.is_empty(),
            ParsedCell::Empty => true,
        }
    }
}

/// Parse one raw cell into records, `Empty` on null or malformed input
pub fn parse_cell(raw: Option<&str>) -> ParsedCell {
    let Some(text) = raw else {
        return ParsedCell::Empty;
    };

    match parse_literal(text) {
        Some(LiteralValue::List(items)) => items
            .into_iter()
            .map(|item| match item {
                LiteralValue::Dict(fields) => Some(TaggedRecord { fields }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map_or(ParsedCell::Empty, ParsedCell::Records),
        _ => ParsedCell::Empty,
    }
}

/// Parse one raw cell into records, empty on null or malformed input
pub fn parse(raw: Option<&str>) -> Vec<TaggedRecord> {
    parse_cell(raw).into_records()
}

/// Parse a single Python literal. `None` when the text is not a complete literal.
pub fn parse_literal(text: &str) -> Option<LiteralValue> {
    match LiteralParser::new(text).parse_document() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::trace!(position = err.position, "unparseable record literal");
            None
        }
    }
}

#[derive(Debug)]
struct SyntaxError {
    position: usize,
}

type ParseResult<T> = std::result::Result<T, SyntaxError>;

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0, depth: 0 }
    }

    fn parse_document(mut self) -> ParseResult<LiteralValue> {
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.pos != self.input.len() {
            return Err(self.error());
        }
        Ok(value)
    }

    fn error(&self) -> SyntaxError {
        SyntaxError { position: self.pos }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error());
        }
        Ok(())
    }

    fn parse_value(&mut self) -> ParseResult<LiteralValue> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'[') => self.parse_sequence(b'[', b']').map(LiteralValue::List),
            Some(b'(') => self.parse_sequence(b'(', b')').map(LiteralValue::List),
            Some(b'{') => self.parse_dict(),
            Some(quote @ (b'\'' | b'"')) => self.parse_string(quote).map(LiteralValue::Str),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.parse_number(),
            Some(b) if b.is_ascii_alphabetic() => self.parse_keyword(),
            _ => Err(self.error()),
        }
    }

    fn parse_sequence(&mut self, open: u8, close: u8) -> ParseResult<Vec<LiteralValue>> {
        self.enter()?;
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error()),
            }
        }
        self.depth -= 1;
        Ok(items)
    }

    fn parse_dict(&mut self) -> ParseResult<LiteralValue> {
        self.enter()?;
        self.expect(b'{')?;
        let mut fields = IndexMap::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                break;
            }
            let key = match self.parse_value()? {
                LiteralValue::Str(s) => s,
                LiteralValue::Int(i) => i.to_string(),
                _ => return Err(self.error()),
            };
            self.expect(b':')?;
            let value = self.parse_value()?;
            fields.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error()),
            }
        }
        self.depth -= 1;
        Ok(LiteralValue::Dict(fields))
    }

    fn parse_string(&mut self, quote: u8) -> ParseResult<String> {
        // skip the opening quote
        self.pos += 1;
        let input: &'a str = self.input;
        let start = self.pos;
        let mut chars = input[start..].char_indices();
        let mut out = String::new();

        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    let (_, escaped) = chars.next().ok_or_else(|| self.error())?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' | '\'' | '"' => out.push(escaped),
                        '\n' => {}
                        'x' => out.push(self.hex_escape(&mut chars, 2)?),
                        'u' => out.push(self.hex_escape(&mut chars, 4)?),
                        'U' => out.push(self.hex_escape(&mut chars, 8)?),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                '\n' => {
                    self.pos = start + offset;
                    return Err(self.error());
                }
                c if c.is_ascii() && c as u8 == quote => {
                    self.pos = start + offset + 1;
                    return Ok(out);
                }
                c => out.push(c),
            }
        }

        self.pos = input.len();
        Err(self.error())
    }

    fn hex_escape(&self, chars: &mut CharIndices<'_>, digits: usize) -> ParseResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, c) = chars.next().ok_or_else(|| self.error())?;
            let digit = c.to_digit(16).ok_or_else(|| self.error())?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error())
    }

    fn parse_number(&mut self) -> ParseResult<LiteralValue> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'-' | b'+' if matches!(self.input.as_bytes()[self.pos - 1], b'e' | b'E') => {
                    self.pos += 1
                }
                _ => break,
            }
        }

        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let parsed = if is_float {
            text.parse::<f64>().ok().map(LiteralValue::Float)
        } else {
            text.parse::<i64>()
                .ok()
                .map(LiteralValue::Int)
                .or_else(|| text.parse::<f64>().ok().map(LiteralValue::Float))
        };
        parsed.ok_or_else(|| self.error())
    }

    fn parse_keyword(&mut self) -> ParseResult<LiteralValue> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "None" | "null" => Ok(LiteralValue::None),
            "True" | "true" => Ok(LiteralValue::Bool(true)),
            "False" | "false" => Ok(LiteralValue::Bool(false)),
            _ => Err(SyntaxError { position: start }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_single_record() {
        let records = parse(Some("[{'id': 35, 'name': 'Comedy'}]"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key("id"), Some(RecordKey::Int(35)));
        assert_eq!(records[0].name(), Some("Comedy"));
    }

    #[test]
    fn test_parse_multiple_records_with_codes() {
        let raw = "[{'iso_3166_1': 'US', 'name': 'United States of America'}, \
                   {'iso_3166_1': 'FR', 'name': 'France'}]";
        let records = parse(Some(raw));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key("iso_3166_1"), Some(RecordKey::from("FR")));
    }

    #[test]
    fn test_parse_crew_record() {
        let raw = "[{'credit_id': '52fe4', 'department': 'Directing', 'gender': 2, \
                   'id': 7, 'job': 'Director', 'name': 'X', 'profile_path': None}]";
        let records = parse(Some(raw));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text("job"), Some("Director"));
        assert_eq!(records[0].get("profile_path"), Some(&LiteralValue::None));
        assert_eq!(records[0].len(), 7);
    }

    #[test]
    fn test_label_renders_non_text_fields() {
        let raw = "[{'id': 3, 'name': None, 'flags': [True, 'x'], 'job': 'Editor'}]";
        let records = parse(Some(raw));
        let record = &records[0];
        assert_eq!(record.name(), None);
        assert_eq!(record.name_label().as_deref(), Some("None"));
        assert_eq!(record.label("job").as_deref(), Some("Editor"));
        assert_eq!(record.label("id").as_deref(), Some("3"));
        assert_eq!(record.label("flags").as_deref(), Some("[True, 'x']"));
        assert_eq!(record.label("department"), None);
    }

    #[test]
    fn test_parse_double_quoted_with_apostrophe() {
        let records = parse(Some(r#"[{'id': 1, 'name': "Schindler's Films"}]"#));
        assert_eq!(records[0].name(), Some("Schindler's Films"));
    }

    #[test]
    fn test_parse_escapes_and_unicode() {
        let records = parse(Some(r"[{'id': 2, 'name': 'L\'Atelier \xe9 Métropole'}]"));
        assert_eq!(records[0].name(), Some("L'Atelier é Métropole"));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_eq!(parse_cell(Some("[]")), ParsedCell::Records(Vec::new()));
        assert!(parse_cell(Some("[]")).is_empty());
    }

    #[test]
    fn test_null_is_empty() {
        assert_eq!(parse_cell(None), ParsedCell::Empty);
    }

    #[test]
    fn test_malformed_is_empty() {
        for raw in [
            "",
            "   ",
            "[{'id': 1, 'name': 'Foo'",
            "[{'id': 1 'name': 'Foo'}]",
            "[{'id': 1, 'name': 'Foo'}] trailing",
            "{'id': 1}",
            "[1, 2, 3]",
            "nan",
            "[{'id': undefined}]",
            "[{'name': 'unterminated}]",
        ] {
            assert_eq!(parse_cell(Some(raw)), ParsedCell::Empty, "input: {:?}", raw);
        }
    }

    #[test]
    fn test_trailing_comma_tolerated() {
        let records = parse(Some("[{'id': 1, 'name': 'Foo',},]"));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_literal("-12"), Some(LiteralValue::Int(-12)));
        assert_eq!(parse_literal("1.5e3"), Some(LiteralValue::Float(1500.0)));
        assert_eq!(parse_literal("1_000"), Some(LiteralValue::Int(1000)));
        assert_eq!(parse_literal("-"), None);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 5), "]".repeat(MAX_DEPTH + 5));
        assert_eq!(parse_cell(Some(&deep)), ParsedCell::Empty);
    }

    #[test]
    fn test_record_key_display() {
        assert_eq!(RecordKey::Int(35).to_string(), "35");
        assert_eq!(RecordKey::from("en").to_string(), "en");
    }

    proptest! {
        #[test]
        fn prop_parser_never_panics(raw in "\\PC{0,64}") {
            let _ = parse_cell(Some(&raw));
        }

        #[test]
        fn prop_well_formed_records_round_trip(id in 0i64..1_000_000, name in "[A-Za-z ]{1,20}") {
            let raw = format!("[{{'id': {}, 'name': '{}'}}]", id, name);
            let records = parse(Some(&raw));
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(records[0].key("id"), Some(RecordKey::Int(id)));
            prop_assert_eq!(records[0].name(), Some(name.as_str()));
        }
    }
}
