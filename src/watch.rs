//! Export archive discovery.
//!
//! LinkedIn delivers exports as ZIP files the user drops into a watch
//! folder. The newest ZIP by modification time is the one that counts;
//! names are not meaningful because LinkedIn reuses them across
//! re-downloads.

use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Find the newest export ZIP in the watch folder by modification time.
///
/// Returns `Ok(None)` when the folder holds no ZIP files. Entries that
/// cannot be read or stat'd are skipped rather than failing the scan.
/// Ties go to the first match in directory order.
///
/// # Errors
///
/// Returns an error only if the watch path cannot be expressed as a
/// glob pattern.
pub fn find_latest_export(watch_dir: &Path) -> Result<Option<PathBuf>> {
    let pattern = watch_dir.join("*.zip");
    let pattern = pattern.to_string_lossy();

    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in glob(&pattern).with_context(|| format!("Invalid watch pattern '{pattern}'"))? {
        let Ok(path) = entry else { continue };
        let Ok(modified) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(_, best)| modified > *best) {
            newest = Some((path, modified));
        }
    }

    if let Some((path, _)) = &newest {
        debug!(
            "Newest export in {}: {}",
            watch_dir.display(),
            path.display()
        );
    }
    Ok(newest.map(|(path, _)| path))
}

/// Modification time of `path` as fractional seconds since the Unix epoch.
///
/// # Errors
///
/// Returns an error if the file cannot be stat'd or predates the epoch.
pub fn modified_timestamp(path: &Path) -> Result<f64> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| crate::error::LixError::path_error("stat", path, e))?;
    let since_epoch = modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .with_context(|| format!("'{}' is modified before the Unix epoch", path.display()))?;
    Ok(since_epoch.as_secs_f64())
}
