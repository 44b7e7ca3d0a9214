//! `SQLite` storage for LinkedIn export data.
//!
//! Tables mirror whatever columns the export CSVs carry, so the schema is
//! rebuilt per load from the observed headers rather than migrated. All
//! values are stored as TEXT; a `metadata` key/value table records which
//! archive the store was last loaded from.

use crate::model::{Comment, Connection, Post, RecordBatch, RecordKind, StoreStats};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OpenFlags, params, params_from_iter};
use std::path::Path;
use tracing::{info, warn};

/// Metadata key recording the source archive path.
const META_LAST_LOADED_ZIP: &str = "last_loaded_zip";
/// Metadata key recording the source archive's mtime (fractional seconds).
const META_LAST_LOADED_TIMESTAMP: &str = "last_loaded_timestamp";

/// Single-column lookup indexes created after each load.
///
/// Tables come and go with the export contents, so each statement is
/// applied only when its table exists. A table that exists without the
/// indexed column fails the statement; that is one of the per-step
/// failures the pipeline downgrades to a warning.
const LOOKUP_INDEXES: &[(&str, &str)] = &[
    (
        "shares",
        r#"CREATE INDEX IF NOT EXISTS idx_shares_commentary ON shares("ShareCommentary")"#,
    ),
    (
        "shares",
        r#"CREATE INDEX IF NOT EXISTS idx_shares_date ON shares("Date")"#,
    ),
    (
        "connections",
        r#"CREATE INDEX IF NOT EXISTS idx_connections_position ON connections("Position")"#,
    ),
    (
        "connections",
        r#"CREATE INDEX IF NOT EXISTS idx_connections_company ON connections("Company")"#,
    ),
    (
        "comments",
        r#"CREATE INDEX IF NOT EXISTS idx_comments_comment ON comments("Comment")"#,
    ),
    (
        "comments",
        r#"CREATE INDEX IF NOT EXISTS idx_comments_date ON comments("Date")"#,
    ),
];

/// Quote an identifier for direct inclusion in SQL.
///
/// Export headers contain spaces ("First Name") and are not under our
/// control, so every dynamic identifier goes through here.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn like_pattern(query: &str) -> String {
    format!("%{}%", query.to_lowercase())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
}

/// Best-effort read of the archive mtime recorded in a store.
///
/// Used to decide staleness before ingesting. Any failure reads as `0.0`
/// so the caller re-ingests: no store file, a file that is not a
/// database, a store without the metadata table, or an unparseable
/// value. The probe opens read-only and never creates or repairs the
/// store.
#[must_use]
pub fn last_ingested_timestamp(db_path: &Path) -> f64 {
    if !db_path.exists() {
        return 0.0;
    }

    let Ok(conn) = rusqlite::Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    ) else {
        return 0.0;
    };

    conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        params![META_LAST_LOADED_TIMESTAMP],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(0.0)
}

/// `SQLite` storage manager
pub struct Storage {
    conn: rusqlite::Connection,
}

impl Storage {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open store at {}", db_path.as_ref().display()))?;

        // Set pragmas for performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
        Ok(Self { conn })
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace the table for `kind` with the rows of `batch`.
    ///
    /// The table is dropped and recreated from the batch header, all in
    /// one transaction, so a failed load never leaves a half-written
    /// table behind. An empty batch writes nothing and leaves no table.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction or any insert fails.
    pub fn replace_batch(&mut self, kind: RecordKind, batch: &RecordBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let table = quote_ident(kind.table());
        let tx = self.conn.transaction()?;
        {
            tx.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;

            let column_defs: Vec<String> = batch
                .columns()
                .iter()
                .map(|c| format!("{} TEXT", quote_ident(c)))
                .collect();
            tx.execute(
                &format!("CREATE TABLE {table} ({})", column_defs.join(", ")),
                [],
            )?;

            let column_names: Vec<String> =
                batch.columns().iter().map(|c| quote_ident(c)).collect();
            let placeholders = vec!["?"; batch.columns().len()].join(", ");
            let insert_sql = format!(
                "INSERT INTO {table} ({}) VALUES ({placeholders})",
                column_names.join(", ")
            );

            let mut stmt = tx.prepare(&insert_sql)?;
            for row in batch.rows() {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!("Stored {} {} rows", batch.len(), kind);
        Ok(batch.len())
    }

    /// Create the lookup indexes for whichever tables the load produced.
    ///
    /// # Errors
    ///
    /// Individual index failures are logged and skipped; only an
    /// unrecoverable store failure is returned.
    pub fn create_lookup_indexes(&self) -> Result<()> {
        for (table, sql) in LOOKUP_INDEXES {
            if !self.table_exists(table)? {
                continue;
            }
            if let Err(e) = self.conn.execute(sql, []) {
                let err = anyhow::Error::new(e);
                if crate::error::is_store_fatal(&err) {
                    return Err(err.context(format!("Failed to index {table}")));
                }
                warn!("Failed to index {table}: {err}");
            }
        }
        Ok(())
    }

    /// Record which archive this store was loaded from.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata table cannot be written.
    pub fn record_loaded_archive(&self, archive: &Path, archive_mtime: f64) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2), (?3, ?4)",
            params![
                META_LAST_LOADED_ZIP,
                archive.display().to_string(),
                META_LAST_LOADED_TIMESTAMP,
                archive_mtime.to_string(),
            ],
        )?;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check whether a table exists in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn metadata_value(&self, key: &str) -> Result<Option<String>> {
        if !self.table_exists("metadata")? {
            return Ok(None);
        }
        let result = self.conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive substring search over post commentary and shared
    /// URLs, newest first.
    ///
    /// Rows without a date are excluded here (and only here) because the
    /// result contract is date-ordered.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_posts(&self, query: &str) -> Result<Vec<Post>> {
        if !self.table_exists("shares")? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT "Date", "ShareCommentary", "ShareLink"
            FROM shares
            WHERE (LOWER("ShareCommentary") LIKE ?1 OR LOWER("SharedUrl") LIKE ?1)
              AND "Date" IS NOT NULL
            ORDER BY "Date" DESC
            "#,
        )?;

        let posts = stmt
            .query_map(params![like_pattern(query)], |row| {
                Ok(Post {
                    date: row.get(0)?,
                    commentary: row.get(1)?,
                    link: row.get(2)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(posts)
    }

    /// Find connections, optionally narrowed by title and company
    /// substrings (case-insensitive, AND-combined), ordered by position.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_connections(
        &self,
        title: Option<&str>,
        company: Option<&str>,
    ) -> Result<Vec<Connection>> {
        if !self.table_exists("connections")? {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r#"SELECT "First Name", "Last Name", "Position", "Company" FROM connections WHERE 1=1"#,
        );
        let mut filters: Vec<String> = Vec::new();
        if let Some(title) = title {
            sql.push_str(r#" AND LOWER("Position") LIKE ?"#);
            filters.push(like_pattern(title));
        }
        if let Some(company) = company {
            sql.push_str(r#" AND LOWER("Company") LIKE ?"#);
            filters.push(like_pattern(company));
        }
        sql.push_str(r#" ORDER BY "Position""#);

        let mut stmt = self.conn.prepare(&sql)?;
        let connections = stmt
            .query_map(params_from_iter(filters.iter()), Self::connection_from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(connections)
    }

    /// Find connections whose position and company together contain every
    /// keyword (case-insensitive), ordered by position.
    ///
    /// Matching happens over the concatenation of both fields, so one
    /// keyword may hit the title while another hits the company.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_connections_by_keywords(&self, keywords: &[String]) -> Result<Vec<Connection>> {
        if !self.table_exists("connections")? {
            return Ok(Vec::new());
        }

        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT "First Name", "Last Name", "Position", "Company"
            FROM connections
            ORDER BY "Position"
            "#,
        )?;

        let connections = stmt
            .query_map([], Self::connection_from_row)?
            .filter_map(std::result::Result::ok)
            .filter(|conn: &Connection| {
                let haystack = format!(
                    "{} {}",
                    conn.position.as_deref().unwrap_or(""),
                    conn.company.as_deref().unwrap_or("")
                )
                .to_lowercase();
                lowered.iter().all(|kw| haystack.contains(kw.as_str()))
            })
            .collect();
        Ok(connections)
    }

    /// Case-insensitive substring search over comment bodies, newest
    /// first. Rows without a date are included and sort last.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_comments(&self, query: &str) -> Result<Vec<Comment>> {
        if !self.table_exists("comments")? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT "Date", "Comment"
            FROM comments
            WHERE LOWER("Comment") LIKE ?1
            ORDER BY "Date" DESC
            "#,
        )?;

        let comments = stmt
            .query_map(params![like_pattern(query)], |row| {
                Ok(Comment {
                    date: row.get(0)?,
                    body: row.get(1)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(comments)
    }

    /// Get store statistics: per-kind row counts plus load provenance.
    ///
    /// Absent tables count as zero rather than erroring, so stats work
    /// on a store loaded from a sparse export.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        for kind in RecordKind::ALL {
            let count = self.count_rows(kind.table())?;
            match kind {
                RecordKind::Posts => stats.posts = count,
                RecordKind::Connections => stats.connections = count,
                RecordKind::Comments => stats.comments = count,
                RecordKind::Reactions => stats.reactions = count,
            }
        }
        stats.last_loaded_archive = self.metadata_value(META_LAST_LOADED_ZIP)?;
        stats.last_loaded_at = self
            .metadata_value(META_LAST_LOADED_TIMESTAMP)?
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(timestamp_to_datetime);
        Ok(stats)
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn connection_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Connection> {
        Ok(Connection {
            first_name: row.get(0)?,
            last_name: row.get(1)?,
            position: row.get(2)?,
            company: row.get(3)?,
        })
    }
}
