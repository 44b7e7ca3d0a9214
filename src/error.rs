//! Custom error types for lix.
//!
//! Provides structured error handling with detailed context for better
//! diagnostics and user experience.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for lix operations.
///
/// Each variant provides specific context about what went wrong,
/// enabling better error messages and programmatic error handling.
#[derive(Error, Debug)]
pub enum LixError {
    // =========================================================================
    // Export Archive Errors
    // =========================================================================
    /// No export ZIP present in the watch folder.
    #[error(
        "No LinkedIn exports found in '{watch_dir}'.\nDownload your data export from LinkedIn and move the ZIP into that folder."
    )]
    NoExportsFound { watch_dir: PathBuf },

    /// The newest archive cannot be read as a ZIP file.
    #[error("'{path}' is not a readable export archive: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    /// Failed to parse an export data file.
    #[error("Failed to parse '{file}': {reason}")]
    ParseError { file: String, reason: String },

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Store operation failed.
    #[error("Store error: {0}")]
    StoreError(#[from] rusqlite::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },
}

/// Result type alias for lix operations.
pub type Result<T> = std::result::Result<T, LixError>;

impl LixError {
    /// Create a no-exports-found error.
    pub fn no_exports(watch_dir: impl Into<PathBuf>) -> Self {
        Self::NoExportsFound {
            watch_dir: watch_dir.into(),
        }
    }

    /// Create an invalid archive error.
    pub fn invalid_archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (user can fix it).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoExportsFound { .. } | Self::InvalidArchive { .. } | Self::ConfigError { .. }
        )
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoExportsFound { .. } => Some(
                "Request the export at linkedin.com: Settings → Data privacy → Get a copy of your data.",
            ),
            Self::InvalidArchive { .. } => {
                Some("Re-download the export; interrupted downloads leave truncated ZIPs behind.")
            }
            Self::ConfigError { .. } => {
                Some("Fix the TOML syntax or delete the config file to fall back to defaults.")
            }
            _ => None,
        }
    }
}

/// Classify a pipeline error as an unrecoverable storage failure.
///
/// Most per-step failures during ingestion are downgraded to warnings so
/// one bad file cannot sink the whole load. The exceptions are `SQLite`
/// failures that indicate the store itself is unusable; those must abort
/// the run.
#[must_use]
pub fn is_store_fatal(err: &anyhow::Error) -> bool {
    use rusqlite::ErrorCode;

    err.chain().any(|cause| {
        cause
            .downcast_ref::<rusqlite::Error>()
            .is_some_and(|sql_err| match sql_err {
                rusqlite::Error::SqliteFailure(e, _) => matches!(
                    e.code,
                    ErrorCode::DiskFull
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DatabaseCorrupt
                        | ErrorCode::NotADatabase
                ),
                _ => false,
            })
    })
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "No exports found")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
///
/// # Returns
/// A formatted error string ready for display.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LixError::no_exports("/home/user/.linkedin-exports");
        assert!(err.to_string().contains(".linkedin-exports"));
    }

    #[test]
    fn test_error_suggestions() {
        let err = LixError::invalid_archive("/tmp/export.zip", "not a zip");
        assert!(err.suggestion().is_some());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let lix_err: LixError = io_err.into();
        assert!(matches!(lix_err, LixError::IoError(_)));
    }

    #[test]
    fn test_from_rusqlite_error() {
        fn accepts_lix_error(_: LixError) {}
        let sqlite_err = rusqlite::Error::InvalidQuery;
        accepts_lix_error(sqlite_err.into());
    }

    // =========================================================================
    // Store Fatality Classification Tests
    // =========================================================================

    fn sqlite_failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some("simulated failure".to_string()),
        )
    }

    #[test]
    fn disk_full_is_fatal() {
        let err = anyhow::Error::new(sqlite_failure(rusqlite::ffi::SQLITE_FULL));
        assert!(is_store_fatal(&err));
    }

    #[test]
    fn corrupt_store_is_fatal() {
        let err = anyhow::Error::new(sqlite_failure(rusqlite::ffi::SQLITE_CORRUPT));
        assert!(is_store_fatal(&err));
    }

    #[test]
    fn not_a_database_is_fatal_even_under_context() {
        let err = anyhow::Error::new(sqlite_failure(rusqlite::ffi::SQLITE_NOTADB))
            .context("writing connections");
        assert!(is_store_fatal(&err));
    }

    #[test]
    fn ordinary_sql_errors_are_not_fatal() {
        let err = anyhow::Error::new(rusqlite::Error::InvalidQuery);
        assert!(!is_store_fatal(&err));

        let err = anyhow::Error::new(sqlite_failure(rusqlite::ffi::SQLITE_ERROR));
        assert!(!is_store_fatal(&err));
    }

    #[test]
    fn non_sql_errors_are_not_fatal() {
        let err = anyhow::anyhow!("some pipeline problem");
        assert!(!is_store_fatal(&err));
    }

    #[test]
    fn format_error_single_suggestion() {
        let output = format_error("Test Error", "Something went wrong", &["Try this"]);
        assert!(output.contains("Test Error"));
        assert!(output.contains("Something went wrong"));
        assert!(output.contains("Try this"));
    }

    #[test]
    fn format_error_multiple_suggestions() {
        let output = format_error(
            "Test Error",
            "Something went wrong",
            &["First option", "Second option"],
        );
        assert!(output.contains("First option"));
        assert!(output.contains("Second option"));
    }
}
