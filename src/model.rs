//! Data models for LinkedIn export records.
//!
//! Each record family arrives as a CSV file with its own header row, and
//! column sets drift between export generations. Raw rows are therefore
//! kept as ordered string mappings ([`RecordBatch`]); only the query layer
//! projects them into typed results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The record families recognized in a LinkedIn export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Authored posts and re-shares (`Shares.csv`).
    Posts,
    /// First-degree connections (`Connections.csv`).
    Connections,
    /// Comments left on other posts (`Comments.csv`).
    Comments,
    /// Reactions given (`Reactions.csv`). Not present in every export.
    Reactions,
}

impl RecordKind {
    /// All kinds in ingestion order.
    pub const ALL: [Self; 4] = [
        Self::Posts,
        Self::Connections,
        Self::Comments,
        Self::Reactions,
    ];

    /// Store table this kind is written to.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Posts => "shares",
            Self::Connections => "connections",
            Self::Comments => "comments",
            Self::Reactions => "reactions",
        }
    }

    /// CSV file name inside the export root.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Posts => "Shares.csv",
            Self::Connections => "Connections.csv",
            Self::Comments => "Comments.csv",
            Self::Reactions => "Reactions.csv",
        }
    }

    /// Whether a missing source file is expected rather than noteworthy.
    ///
    /// Older exports predate the reactions file, so its absence does not
    /// warrant a warning.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Reactions)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Posts => "posts",
            Self::Connections => "connections",
            Self::Comments => "comments",
            Self::Reactions => "reactions",
        };
        write!(f, "{name}")
    }
}

/// Parsed rows from one CSV file, keyed by the header row observed in
/// that file.
///
/// Ragged rows are normalized to the header width: extra fields are
/// dropped and missing trailing fields become `None`. A field that is
/// present but empty stays `Some("")`, which matters for `IS NOT NULL`
/// filters downstream.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RecordBatch {
    /// Create an empty batch with the given header.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Column names in file order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw rows, each exactly `columns().len()` wide.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, values: Vec<String>) {
        let mut row: Vec<Option<String>> = values.into_iter().map(Some).collect();
        row.truncate(self.columns.len());
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Look up a field by row index and column name.
    ///
    /// Returns `None` for unknown columns, out-of-range rows, and fields
    /// absent from a ragged row.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }
}

/// A post returned by the posts query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub date: Option<String>,
    pub commentary: Option<String>,
    pub link: Option<String>,
}

/// A connection returned by the connection queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
}

impl Connection {
    /// Display name, tolerating missing parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_string()
    }
}

/// A comment returned by the comments query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub date: Option<String>,
    pub body: Option<String>,
}

/// Row counts and provenance for the local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub posts: i64,
    pub connections: i64,
    pub comments: i64,
    pub reactions: i64,
    /// Archive the store was last loaded from, if recorded.
    pub last_loaded_archive: Option<String>,
    /// Modification time of that archive, if recorded.
    pub last_loaded_at: Option<chrono::DateTime<chrono::Utc>>,
}
