//! Integration tests for lix.
//!
//! These tests verify end-to-end functionality including:
//! - Export archive discovery and staleness checks
//! - The full ingestion pipeline against real ZIP files
//! - Queries against the resulting store

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use lix::{
    error::LixError,
    ingest::{IngestOutcome, Ingestor},
    storage::{self, Storage},
    watch,
};

const T0: u64 = 1_750_000_000;

const SHARES_CSV: &str = "Date,ShareLink,ShareCommentary,SharedUrl\n\
2025-06-02 10:15,https://www.linkedin.com/feed/update/urn:li:share:1,Shipped the Rust rewrite of our ingestion service today,\n\
2025-05-20 08:00,https://www.linkedin.com/feed/update/urn:li:share:2,Worth a read on embedded databases,https://example.com/sqlite-deep-dive\n";

const CONNECTIONS_CSV: &str = "Notes:\n\
\"When exporting your connection data, you may notice that some of the email addresses are missing.\"\n\
\n\
First Name,Last Name,URL,Email Address,Company,Position,Connected On\n\
Ada,Lovelace,https://www.linkedin.com/in/ada,,Acme Corp,Senior Engineer,02 Jun 2025\n\
Grace,Hopper,https://www.linkedin.com/in/grace,,Other Inc,Engineer,15 May 2025\n";

const COMMENTS_CSV: &str = "Date,Link,Comment\n\
2025-05-30 09:12,https://www.linkedin.com/feed/update/urn:li:comment:1,Great point about Rust error handling\n";

const REACTIONS_CSV: &str = "Date,Type,Link\n\
2025-04-11 18:40,LIKE,https://www.linkedin.com/feed/update/urn:li:share:9\n";

fn set_mtime(path: &Path, unix_secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(unix_secs))
        .unwrap();
}

/// Build a ZIP at `path` from (entry name, content) pairs.
fn write_archive(path: &Path, entries: &[(String, String)], mtime_secs: u64) -> PathBuf {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    set_mtime(path, mtime_secs);
    path.to_path_buf()
}

fn prefixed(root: &str, name: &str) -> String {
    if root.is_empty() {
        name.to_string()
    } else {
        format!("{root}/{name}")
    }
}

/// A complete export with all four CSVs, optionally nested under `root`.
fn standard_export(dir: &Path, file_name: &str, root: &str, mtime_secs: u64) -> PathBuf {
    let entries = vec![
        (prefixed(root, "Shares.csv"), SHARES_CSV.to_string()),
        (prefixed(root, "Connections.csv"), CONNECTIONS_CSV.to_string()),
        (prefixed(root, "Comments.csv"), COMMENTS_CSV.to_string()),
        (prefixed(root, "Reactions.csv"), REACTIONS_CSV.to_string()),
    ];
    write_archive(&dir.join(file_name), &entries, mtime_secs)
}

fn test_paths(temp: &TempDir) -> (PathBuf, PathBuf) {
    (
        temp.path().join("exports"),
        temp.path().join("data").join("lix.db"),
    )
}

#[test]
fn test_locator_picks_newest_archive() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, _) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();

    assert_eq!(watch::find_latest_export(&watch_dir).unwrap(), None);

    standard_export(&watch_dir, "old.zip", "", T0);
    let newer = standard_export(&watch_dir, "new.zip", "", T0 + 50);

    assert_eq!(watch::find_latest_export(&watch_dir).unwrap(), Some(newer));
}

#[test]
fn test_full_ingestion_pipeline() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    let archive = standard_export(
        &watch_dir,
        "export.zip",
        "Complete_LinkedInDataExport_06-02-2025",
        T0,
    );

    let ingestor = Ingestor::new(&watch_dir, &db_path);
    let outcome = ingestor.ensure_current().unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Loaded {
            archive: archive.clone()
        }
    );

    let storage = Storage::open(&db_path).unwrap();
    let stats = storage.stats().unwrap();
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.comments, 1);
    assert_eq!(stats.reactions, 1);
    assert_eq!(
        stats.last_loaded_archive,
        Some(archive.display().to_string())
    );
    assert!(stats.last_loaded_at.is_some());
}

#[test]
fn test_reingest_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    standard_export(&watch_dir, "export.zip", "", T0);

    let ingestor = Ingestor::new(&watch_dir, &db_path);
    assert!(matches!(
        ingestor.ensure_current().unwrap(),
        IngestOutcome::Loaded { .. }
    ));

    let first = Storage::open(&db_path).unwrap().stats().unwrap();

    // Same archive, same mtime: nothing to do
    assert_eq!(ingestor.ensure_current().unwrap(), IngestOutcome::Fresh);

    let second = Storage::open(&db_path).unwrap().stats().unwrap();
    assert_eq!(first.posts, second.posts);
    assert_eq!(first.connections, second.connections);
    assert_eq!(first.comments, second.comments);
    assert_eq!(first.last_loaded_archive, second.last_loaded_archive);
}

#[test]
fn test_newer_archive_replaces_store_wholesale() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    standard_export(&watch_dir, "first.zip", "", T0);

    let ingestor = Ingestor::new(&watch_dir, &db_path);
    ingestor.ensure_current().unwrap();

    // A newer export containing only connections
    let entries = vec![("Connections.csv".to_string(), CONNECTIONS_CSV.to_string())];
    write_archive(&watch_dir.join("second.zip"), &entries, T0 + 100);

    assert!(matches!(
        ingestor.ensure_current().unwrap(),
        IngestOutcome::Loaded { .. }
    ));

    let storage = Storage::open(&db_path).unwrap();
    let stats = storage.stats().unwrap();
    assert_eq!(stats.posts, 0);
    assert_eq!(stats.comments, 0);
    assert_eq!(stats.reactions, 0);
    assert_eq!(stats.connections, 2);

    // No residual shares table means post searches come back empty
    assert!(storage.search_posts("rust").unwrap().is_empty());
}

#[test]
fn test_connections_preamble_is_skipped_exactly() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();

    let csv = "junk line 1\njunk line 2\njunk line 3\n\
First Name,Last Name,URL,Email Address,Company,Position,Connected On\n\
Ada,Lovelace,,,Acme Corp,Senior Engineer,02 Jun 2025\n";
    let entries = vec![("Connections.csv".to_string(), csv.to_string())];
    write_archive(&watch_dir.join("export.zip"), &entries, T0);

    Ingestor::new(&watch_dir, &db_path).ensure_current().unwrap();

    let storage = Storage::open(&db_path).unwrap();
    assert_eq!(storage.stats().unwrap().connections, 1);

    let found = storage.find_connections(Some("senior"), None).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_name(), "Ada Lovelace");
}

#[test]
fn test_staleness_check_triggers_only_on_newer_archive() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    let archive = standard_export(&watch_dir, "export.zip", "", T0);

    let ingestor = Ingestor::new(&watch_dir, &db_path);
    ingestor.ensure_current().unwrap();

    // Equal mtime: current
    assert_eq!(ingestor.pending_archive().unwrap(), None);

    // Bumped mtime: stale again
    set_mtime(&archive, T0 + 10);
    assert_eq!(ingestor.pending_archive().unwrap(), Some(archive));
}

#[test]
fn test_corrupt_store_triggers_full_reingest() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    standard_export(&watch_dir, "export.zip", "", T0);

    let ingestor = Ingestor::new(&watch_dir, &db_path);
    ingestor.ensure_current().unwrap();

    // Clobber the store; the probe must read 0 and re-ingest
    std::fs::write(&db_path, b"definitely not a sqlite database").unwrap();
    assert_eq!(storage::last_ingested_timestamp(&db_path), 0.0);

    assert!(matches!(
        ingestor.ensure_current().unwrap(),
        IngestOutcome::Loaded { .. }
    ));
    let stats = Storage::open(&db_path).unwrap().stats().unwrap();
    assert_eq!(stats.posts, 2);
}

#[test]
fn test_invalid_archive_is_fatal() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();

    let fake = watch_dir.join("export.zip");
    std::fs::write(&fake, "this is not a zip file").unwrap();
    set_mtime(&fake, T0);

    let err = Ingestor::new(&watch_dir, &db_path)
        .ensure_current()
        .unwrap_err();
    let lix = err.downcast_ref::<LixError>().unwrap();
    assert!(matches!(lix, LixError::InvalidArchive { .. }));
}

#[test]
fn test_empty_watch_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);

    let err = Ingestor::new(&watch_dir, &db_path)
        .pending_archive()
        .unwrap_err();
    let lix = err.downcast_ref::<LixError>().unwrap();
    assert!(matches!(lix, LixError::NoExportsFound { .. }));
}

#[test]
fn test_flat_archive_layout_is_supported() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    standard_export(&watch_dir, "export.zip", "", T0);

    Ingestor::new(&watch_dir, &db_path).ensure_current().unwrap();

    let stats = Storage::open(&db_path).unwrap().stats().unwrap();
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.connections, 2);
}

#[test]
fn test_missing_optional_reactions_is_silent() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();

    let entries = vec![
        ("Shares.csv".to_string(), SHARES_CSV.to_string()),
        ("Connections.csv".to_string(), CONNECTIONS_CSV.to_string()),
        ("Comments.csv".to_string(), COMMENTS_CSV.to_string()),
    ];
    write_archive(&watch_dir.join("export.zip"), &entries, T0);

    Ingestor::new(&watch_dir, &db_path).ensure_current().unwrap();

    let stats = Storage::open(&db_path).unwrap().stats().unwrap();
    assert_eq!(stats.posts, 2);
    assert_eq!(stats.reactions, 0);
}

#[test]
fn test_queries_after_ingest() {
    let temp = TempDir::new().unwrap();
    let (watch_dir, db_path) = test_paths(&temp);
    std::fs::create_dir_all(&watch_dir).unwrap();
    standard_export(&watch_dir, "export.zip", "", T0);

    Ingestor::new(&watch_dir, &db_path).ensure_current().unwrap();
    let storage = Storage::open(&db_path).unwrap();

    // Post search matches commentary, case-insensitively, newest first
    let posts = storage.search_posts("RUST").unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].commentary.as_deref().unwrap().contains("rewrite"));

    // Post search also matches the shared URL
    let posts = storage.search_posts("sqlite-deep-dive").unwrap();
    assert_eq!(posts.len(), 1);

    // Keyword search ANDs across the title+company concatenation
    let keywords = vec!["Engineer".to_string(), "Acme".to_string()];
    let found = storage.find_connections_by_keywords(&keywords).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_name(), "Ada Lovelace");

    // Title-only filter orders by position ascending
    let by_title = storage.find_connections(Some("engineer"), None).unwrap();
    assert_eq!(by_title.len(), 2);
    assert_eq!(by_title[0].position.as_deref(), Some("Engineer"));

    // Comment search
    let comments = storage.search_comments("error handling").unwrap();
    assert_eq!(comments.len(), 1);
}
