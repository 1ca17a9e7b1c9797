//! Canonical client identifiers.
//!
//! Client codes come from systems that disagree on typing: one export emits
//! `1023`, another `1023.0`, a third `" 1023 "`. All of them must land on the
//! same key before any set comparison, and missing codes must never match.

use crate::schema::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A normalized client code: trimmed, lower-cased, with float artefacts
/// removed. Two rows refer to the same client iff their `ClientId`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub type ClientSet = BTreeSet<ClientId>;

/// Normalizes a raw cell into a client key, or `None` when the cell holds
/// no identifier (null, NaN, blank text).
///
/// Floats are truncated, not rounded: `1023.9` becomes `"1023"`. Zero is a
/// valid identifier.
pub fn normalize_identifier(raw: &CellValue) -> Option<ClientId> {
    let rendered = match raw {
        CellValue::Empty => return None,
        CellValue::Number(n) if !n.is_finite() => return None,
        CellValue::Number(n) => render_truncated(*n),
        CellValue::Int(i) => i.to_string(),
        CellValue::Text(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };

    if rendered.is_empty() {
        return None;
    }

    Some(ClientId(rendered.to_lowercase()))
}

/// Integer rendering of a float with no intermediate integer cast, so codes
/// beyond the `i64` range keep distinct keys. `-0` renders as `0`.
fn render_truncated(n: f64) -> String {
    let truncated = n.trunc();
    if truncated == 0.0 {
        return "0".to_string();
    }
    format!("{:.0}", truncated)
}

/// Normalizes a key that is already a string.
pub fn normalize_key(raw: &str) -> Option<ClientId> {
    normalize_identifier(&CellValue::Text(raw.to_string()))
}

/// Builds a set from raw cells, silently dropping absent identifiers.
pub fn client_set<'a, I>(cells: I) -> ClientSet
where
    I: IntoIterator<Item = &'a CellValue>,
{
    cells.into_iter().filter_map(normalize_identifier).collect()
}
