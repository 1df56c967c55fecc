//! Table/column identifiers.
//!
//! Tabular identifiers are case-insensitive. A column is rendered in the canonical DAX form
//! `'Table'[Column]` (single quotes inside the table name are doubled, `]` inside the column name
//! is doubled), and equality, hashing and ordering all operate on that rendering.

use crate::error::{RelationshipError, RelationshipResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A fully-qualified column: `(table, column)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullName {
    pub table: String,
    pub column: String,
}

impl FullName {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Canonical `'Table'[Column]` rendering.
    pub fn canonical(&self) -> String {
        format_column_ref(&self.table, &self.column)
    }

    pub fn is_blank(&self) -> bool {
        self.table.trim().is_empty() || self.column.trim().is_empty()
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl PartialEq for FullName {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FullName {}

impl PartialOrd for FullName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FullName {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_case_insensitive(&self.canonical(), &other.canonical())
    }
}

impl Hash for FullName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_case(&self.canonical()).hash(state);
    }
}

impl FromStr for FullName {
    type Err = RelationshipError;

    fn from_str(s: &str) -> RelationshipResult<Self> {
        parse_column_ref(s)
    }
}

/// One directed edge of the relationship graph: `foreign` (the "many" side) references `primary`
/// (the "one" side).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipPair {
    pub primary: FullName,
    pub foreign: FullName,
}

impl RelationshipPair {
    pub fn new(primary: FullName, foreign: FullName) -> Self {
        Self { primary, foreign }
    }

    pub fn primary_table(&self) -> &str {
        &self.primary.table
    }

    pub fn foreign_table(&self) -> &str {
        &self.foreign.table
    }
}

impl fmt::Display for RelationshipPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.foreign, self.primary)
    }
}

/// Case-insensitive table name comparison.
pub fn table_eq(a: &str, b: &str) -> bool {
    cmp_case_insensitive(a, b) == Ordering::Equal
}

/// Key used for case-insensitive lookups of table ids.
pub(crate) fn fold_case(name: &str) -> String {
    if name.is_ascii() {
        return name.to_ascii_uppercase();
    }
    name.chars().flat_map(char::to_uppercase).collect()
}

fn cmp_case_insensitive(a: &str, b: &str) -> Ordering {
    if a.is_ascii() && b.is_ascii() {
        let a = a.bytes().map(|c| c.to_ascii_uppercase());
        let b = b.bytes().map(|c| c.to_ascii_uppercase());
        return a.cmp(b);
    }

    // Unicode-aware uppercasing so e.g. `ß` and `SS` compare equal.
    let a = a.chars().flat_map(char::to_uppercase);
    let b = b.chars().flat_map(char::to_uppercase);
    a.cmp(b)
}

pub fn format_column_ref(table: &str, column: &str) -> String {
    format!("'{}'[{}]", table.replace('\'', "''"), column.replace(']', "]]"))
}

/// Parse `'Table'[Column]` or `Table[Column]`.
pub fn parse_column_ref(text: &str) -> RelationshipResult<FullName> {
    let invalid = |reason: &str| RelationshipError::InvalidName {
        text: text.to_string(),
        reason: reason.to_string(),
    };

    let s = text.trim();
    let (table, rest) = if let Some(quoted) = s.strip_prefix('\'') {
        let mut table = String::new();
        let mut chars = quoted.char_indices();
        let mut end = None;
        while let Some((idx, ch)) = chars.next() {
            if ch != '\'' {
                table.push(ch);
                continue;
            }
            if quoted[idx + 1..].starts_with('\'') {
                table.push('\'');
                chars.next();
                continue;
            }
            end = Some(idx + 1);
            break;
        }
        let end = end.ok_or_else(|| invalid("unterminated table name"))?;
        (table, quoted[end..].trim_start())
    } else {
        let open = s.find('[').ok_or_else(|| invalid("missing '['"))?;
        (s[..open].trim().to_string(), &s[open..])
    };

    let inner = rest
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| invalid("expected [Column]"))?;
    if inner.replace("]]", "").contains(']') {
        return Err(invalid("unescaped ']' in column name"));
    }
    let column = inner.replace("]]", "]");

    if table.is_empty() {
        return Err(invalid("empty table name"));
    }
    if column.is_empty() {
        return Err(invalid("empty column name"));
    }
    Ok(FullName::new(table, column))
}
