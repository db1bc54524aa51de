//! Structural repair and field salvage for damaged record files.
//!
//! Recovery is a ladder. A document that parses is returned as is. One that
//! does not is repaired syntactically (comments removed, trailing commas
//! dropped, bare keys quoted) and parsed again. When that also fails, the
//! scalar fields that can still be found are salvaged and handed to
//! [`Record::reconstruct`](super::Record::reconstruct).

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

/// How a recovered record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryMethod {
    /// The file parsed without intervention.
    Intact,
    /// Syntax repair made the file parse; content is preserved.
    Repaired,
    /// The record was rebuilt from salvaged fields; content may be lost.
    Reconstructed,
}

impl RecoveryMethod {
    /// Returns a stable label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intact => "intact",
            Self::Repaired => "repaired",
            Self::Reconstructed => "reconstructed",
        }
    }
}

/// A record produced by the recovery ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered<R> {
    /// The recovered record.
    pub record: R,
    /// How it was obtained.
    pub method: RecoveryMethod,
}

impl<R> Recovered<R> {
    /// Returns `true` when the record was synthesized from salvaged fields
    /// rather than parsed from the stored document.
    #[must_use]
    pub const fn reconstructed(&self) -> bool {
        matches!(self.method, RecoveryMethod::Reconstructed)
    }
}

/// Fields recovered from a document that no longer parses as its record
/// type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Salvage {
    fields: Map<String, Value>,
}

impl Salvage {
    /// Salvages fields from `text`.
    ///
    /// Well-formed JSON objects contribute their top-level fields. Anything
    /// else is scanned for `"key": scalar` pairs; the first occurrence of a
    /// key wins.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(text) {
            return Self { fields };
        }
        Self {
            fields: scan_scalar_fields(text),
        }
    }

    /// Returns the number of salvaged fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when nothing could be salvaged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the raw salvaged value of `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns `key` as a non-blank string.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns `key` parsed as an RFC 3339 timestamp.
    #[must_use]
    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.string(key)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    /// Returns `key` parsed as a UUID.
    #[must_use]
    pub fn uuid(&self, key: &str) -> Option<Uuid> {
        self.string(key).and_then(|raw| Uuid::parse_str(raw).ok())
    }

    /// Returns `key` as an unsigned integer.
    #[must_use]
    pub fn unsigned(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    /// Returns `key` deserialized as `T`, if it has that shape.
    #[must_use]
    pub fn parse<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Applies syntax repairs that keep the document's content.
#[must_use]
pub(crate) fn repair_json(text: &str) -> String {
    let uncommented = strip_comments(text);
    let key_pattern = Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)(\s*:)").ok();
    let comma_pattern = Regex::new(r",(\s*[}\]])").ok();
    map_outside_strings(&uncommented, |segment| {
        let quoted = key_pattern.as_ref().map_or_else(
            || segment.to_owned(),
            |pattern| pattern.replace_all(segment, r#"${1}"${2}"${3}"#).into_owned(),
        );
        comma_pattern.as_ref().map_or_else(
            || quoted.clone(),
            |pattern| pattern.replace_all(&quoted, "${1}").into_owned(),
        )
    })
}

/// Removes `//` line comments and `/* */` block comments outside strings.
fn strip_comments(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut scanner = StringScanner::default();
    while let Some(current) = chars.next() {
        if scanner.in_string {
            scanner.advance(current);
            output.push(current);
            continue;
        }
        match (current, chars.peek()) {
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
                output.push(' ');
            }
            _ => {
                scanner.advance(current);
                output.push(current);
            }
        }
    }
    output
}

/// Rewrites every run of text outside string literals with `transform`,
/// copying string literals verbatim.
fn map_outside_strings(text: &str, transform: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(text.len());
    let mut segment = String::new();
    let mut scanner = StringScanner::default();
    for current in text.chars() {
        let was_in_string = scanner.in_string;
        scanner.advance(current);
        if was_in_string {
            output.push(current);
        } else if scanner.in_string {
            output.push_str(&transform(&segment));
            segment.clear();
            output.push(current);
        } else {
            segment.push(current);
        }
    }
    output.push_str(&transform(&segment));
    output
}

#[derive(Debug, Default)]
struct StringScanner {
    in_string: bool,
    escaped: bool,
}

impl StringScanner {
    const fn advance(&mut self, current: char) {
        if !self.in_string {
            self.in_string = current == '"';
            return;
        }
        if self.escaped {
            self.escaped = false;
        } else if current == '\\' {
            self.escaped = true;
        } else if current == '"' {
            self.in_string = false;
        }
    }
}

fn scan_scalar_fields(text: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    let Ok(pattern) = Regex::new(
        r#""([A-Za-z_][A-Za-z0-9_]*)"\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null)"#,
    ) else {
        return fields;
    };
    for captures in pattern.captures_iter(text) {
        let (Some(key), Some(raw)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        if fields.contains_key(key.as_str()) {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(raw.as_str()) {
            fields.insert(key.as_str().to_owned(), value);
        }
    }
    fields
}
