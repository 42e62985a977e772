//! Rows flowing through a command chain, and lazy field materialization.
//!
//! A row produced by storage usually carries only `raw`: one space-joined
//! record whose positional layout is described by the table header. Fields
//! are cut out of `raw` on first access and cached in `fields`, so a query
//! that references two fields of a wide record never splits the rest.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Positional field layout of raw records (`logformat` of a table).
pub type Header = Arc<[String]>;

/// Delimiter between tokens of a raw record.
pub const RAW_DELIMITER: char = ' ';

/// Field name under which the raw record is exposed in output.
pub const RAW_FIELD: &str = "_data";

/// Build a header from a `logformat` string (space-separated field names).
pub fn header_from_logformat(logformat: &str) -> Header {
    logformat
        .split_whitespace()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    fields: HashMap<String, Value>,
    raw: Option<String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// A row that only carries the compact record.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            fields: HashMap::new(),
            raw: Some(raw.into()),
        }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            raw: None,
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Materialized value only; never touches `raw`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.raw.is_none()
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_raw(&mut self, raw: Option<String>) {
        self.raw = raw;
    }

    pub fn take_raw(&mut self) -> Option<String> {
        self.raw.take()
    }

    /// Resolve `field`, extracting it from the raw record when needed.
    ///
    /// Order: materialized key, then the header position in `raw`. An
    /// extracted token is cached, so a second call never re-scans. A field
    /// missing from the header, or a raw record with too few tokens, is
    /// absent (`None`), which is not an error.
    pub fn resolve(&mut self, header: Option<&[String]>, field: &str) -> Option<&Value> {
        if self.fields.contains_key(field) {
            return self.fields.get(field);
        }

        let index = header?.iter().position(|h| h == field)?;
        let token = token_at(self.raw.as_deref()?, index)?.to_string();
        self.fields.insert(field.to_string(), Value::Str(token));
        self.fields.get(field)
    }

    /// Same as `resolve`, returning an owned copy.
    pub fn resolve_cloned(&mut self, header: Option<&[String]>, field: &str) -> Option<Value> {
        self.resolve(header, field).cloned()
    }

    /// Rough footprint for budget accounting.
    pub fn approx_bytes(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|(k, v)| 32 + k.len() + v.approx_bytes())
            .sum();
        48 + fields + self.raw.as_ref().map(|r| r.len()).unwrap_or(0)
    }

    /// Stable-ordered JSON object; the raw record appears as `_data` unless a
    /// field of that name was materialized.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj: BTreeMap<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        if let Some(raw) = &self.raw {
            obj.entry(RAW_FIELD.to_string())
                .or_insert_with(|| serde_json::Value::String(raw.clone()));
        }
        serde_json::Value::Object(obj.into_iter().collect())
    }
}

/// The `index`-th delimiter-separated token of `raw`, or `None` when the
/// record has fewer tokens.
fn token_at(raw: &str, index: usize) -> Option<&str> {
    let mut start = 0usize;
    for _ in 0..index {
        let skip = raw[start..].find(RAW_DELIMITER)?;
        start += skip + RAW_DELIMITER.len_utf8();
    }
    let rest = &raw[start..];
    match rest.find(RAW_DELIMITER) {
        Some(end) => Some(&rest[..end]),
        None => Some(rest),
    }
}
