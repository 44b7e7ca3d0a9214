//! Export ingestion pipeline.
//!
//! Keeps the local store in sync with the newest archive in the watch
//! folder. Loads are wholesale: the store files are deleted up front and
//! rebuilt from scratch inside one run, so a crash mid-load leaves a
//! store that reads as stale and gets rebuilt on the next invocation.
//!
//! Error policy during a load: a bad CSV or a failed index is logged and
//! skipped, because one damaged file should not sink the rest of the
//! export. Unrecoverable store failures (disk full, corrupt database)
//! abort the run instead.

use crate::error::{self, LixError};
use crate::log_progress;
use crate::model::RecordKind;
use crate::parser::ExportParser;
use crate::storage::{self, Storage};
use crate::watch;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory prefix LinkedIn uses for the folder inside the export ZIP.
const EXPORT_DIR_PREFIX: &str = "Complete_LinkedInDataExport_";

/// Phases of one ingestion run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Extracting,
    Loading,
    Indexing,
    Finalizing,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extracting",
            Self::Loading => "loading",
            Self::Indexing => "indexing",
            Self::Finalizing => "finalizing",
        };
        write!(f, "{name}")
    }
}

/// Result of a freshness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The newest archive was loaded into a rebuilt store.
    Loaded { archive: PathBuf },
    /// The store already reflects the newest archive.
    Fresh,
}

/// Drives export discovery, staleness checks and store loading.
pub struct Ingestor {
    watch_dir: PathBuf,
    db_path: PathBuf,
}

impl Ingestor {
    pub fn new(watch_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            db_path: db_path.into(),
        }
    }

    /// Create the watch folder and the store's parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.watch_dir)
            .map_err(|e| LixError::path_error("create", &self.watch_dir, e))?;
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LixError::path_error("create", parent, e))?;
        }
        Ok(())
    }

    /// The archive that should be loaded, or `None` when the store is
    /// already current.
    ///
    /// The store is stale when the newest archive's mtime is greater
    /// than the recorded one, or when the store file is missing
    /// entirely.
    ///
    /// # Errors
    ///
    /// Returns [`LixError::NoExportsFound`] when the watch folder holds
    /// no export ZIPs at all.
    pub fn pending_archive(&self) -> Result<Option<PathBuf>> {
        self.ensure_dirs()?;
        let Some(archive) = watch::find_latest_export(&self.watch_dir)? else {
            return Err(LixError::no_exports(&self.watch_dir).into());
        };

        let archive_mtime = watch::modified_timestamp(&archive)?;
        let recorded = storage::last_ingested_timestamp(&self.db_path);
        if archive_mtime > recorded || !self.db_path.exists() {
            debug!(archive_mtime, recorded, "Store is stale");
            Ok(Some(archive))
        } else {
            debug!("Store is current");
            Ok(None)
        }
    }

    /// Make the store reflect the newest archive, loading it if stale.
    ///
    /// # Errors
    ///
    /// Returns an error when no archive exists, the archive is not a
    /// valid ZIP, or the store hits an unrecoverable failure.
    pub fn ensure_current(&self) -> Result<IngestOutcome> {
        match self.pending_archive()? {
            Some(archive) => {
                self.run(&archive)?;
                Ok(IngestOutcome::Loaded { archive })
            }
            None => Ok(IngestOutcome::Fresh),
        }
    }

    /// Rebuild the store from `archive` unconditionally.
    ///
    /// # Errors
    ///
    /// See [`Ingestor::ensure_current`].
    pub fn run(&self, archive: &Path) -> Result<()> {
        let guard = crate::logging::OperationGuard::new("ingest");
        info!("Loading {}", archive.display());
        match self.run_inner(archive) {
            Ok(()) => {
                guard.complete();
                Ok(())
            }
            Err(err) => {
                guard.fail(&err);
                Err(err)
            }
        }
    }

    fn run_inner(&self, archive: &Path) -> Result<()> {
        self.ensure_dirs()?;
        let archive_mtime = watch::modified_timestamp(archive)?;
        self.delete_store()?;

        enter_phase(IngestPhase::Extracting);
        let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
        extract_archive(archive, scratch.path())?;
        let export_root = locate_export_root(scratch.path())?;

        enter_phase(IngestPhase::Loading);
        let parser = ExportParser::new(&export_root);
        let mut store = Storage::open(&self.db_path)?;
        let total = RecordKind::ALL.len();
        for (step, kind) in RecordKind::ALL.into_iter().enumerate() {
            load_kind(&parser, &mut store, kind, step + 1, total)?;
        }

        enter_phase(IngestPhase::Indexing);
        store.create_lookup_indexes()?;

        enter_phase(IngestPhase::Finalizing);
        if let Err(err) = store.record_loaded_archive(archive, archive_mtime) {
            if error::is_store_fatal(&err) {
                return Err(err);
            }
            // Missing provenance means the next run reloads; it cannot
            // corrupt query results.
            warn!("Failed to record load metadata: {err}");
        }

        Ok(())
        // scratch and its extracted files are removed here on all paths
    }

    /// Remove the store file plus its WAL siblings.
    fn delete_store(&self) -> Result<()> {
        for path in [
            self.db_path.clone(),
            sibling(&self.db_path, "-wal"),
            sibling(&self.db_path, "-shm"),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(LixError::path_error("remove", &path, e).into()),
            }
        }
        Ok(())
    }
}

fn enter_phase(phase: IngestPhase) {
    debug!(phase = %phase, "Entering phase");
}

/// Load one record kind, downgrading per-file failures to warnings.
fn load_kind(
    parser: &ExportParser,
    store: &mut Storage,
    kind: RecordKind,
    step: usize,
    total: usize,
) -> Result<()> {
    match parser.parse(kind) {
        Ok(Some(batch)) if !batch.is_empty() => match store.replace_batch(kind, &batch) {
            Ok(count) => log_progress!(step, total, "Loaded {} {}", count, kind),
            Err(err) if error::is_store_fatal(&err) => {
                return Err(err.context(format!("Failed to store {kind}")));
            }
            Err(err) => warn!("Failed to store {kind}: {err}"),
        },
        Ok(Some(_)) => debug!("{} holds no data rows", kind.file_name()),
        Ok(None) if kind.is_optional() => debug!("{} not found, skipping", kind.file_name()),
        Ok(None) => warn!("{} not found, skipping", kind.file_name()),
        Err(err) => warn!("Failed to parse {}: {err}", kind.file_name()),
    }
    Ok(())
}

fn sibling(db_path: &Path, suffix: &str) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Extract `archive` into `dest`.
fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive).map_err(|e| LixError::path_error("open", archive, e))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| LixError::invalid_archive(archive, e.to_string()))?;
    zip.extract(dest)
        .map_err(|e| LixError::invalid_archive(archive, e.to_string()))?;
    debug!("Extracted {} entries", zip.len());
    Ok(())
}

/// Locate the export root inside an extracted archive.
///
/// LinkedIn wraps the CSVs in a `Complete_LinkedInDataExport_<date>`
/// folder; some exports place them at the ZIP root instead. When several
/// wrapper folders exist the lexically first wins.
fn locate_export_root(extracted: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(extracted)
        .map_err(|e| LixError::path_error("read", extracted, e))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(EXPORT_DIR_PREFIX))
        })
        .collect();
    candidates.sort();

    Ok(candidates
        .into_iter()
        .next()
        .unwrap_or_else(|| extracted.to_path_buf()))
}
