//! CLI definitions for lix.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lix - Local search over your LinkedIn data export
#[derive(Parser, Debug)]
#[command(name = "lix")]
#[command(version = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n  Built: ", env!("VERGEN_BUILD_TIMESTAMP"),
    "\n  Rustc: ", env!("VERGEN_RUSTC_SEMVER"),
    "\n  Target: ", env!("VERGEN_CARGO_TARGET_TRIPLE"),
))]
#[command(about = "Search your LinkedIn data export from the command line")]
#[command(long_about = r#"
lix (linkedin_find) - A command-line tool for keeping a local, searchable
copy of your LinkedIn data export.

Features:
  - Keyword search across posts, connections, and comments
  - Automatic refresh from the newest export ZIP in your watch folder
  - SQLite storage, rebuilt wholesale whenever a newer export appears
  - JSON and human-readable output formats

Quick start:
  1. Request your data export from linkedin.com/mypreferences
  2. Drop the downloaded ZIP into ~/.linkedin-exports
  3. Search: lix posts "rust"
"#)]
pub struct Cli {
    /// Folder scanned for export ZIPs
    #[arg(long, env = "LIX_WATCH", global = true)]
    pub watch: Option<PathBuf>,

    /// Path to the store file
    #[arg(long, env = "LIX_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search posts by keyword
    Posts(PostsArgs),

    /// Find connections by title and/or company
    Connections(ConnectionsArgs),

    /// Find connections matching every given keyword
    Keywords(KeywordsArgs),

    /// Search comments by keyword
    Comments(CommentsArgs),

    /// Show store statistics
    Stats,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct PostsArgs {
    /// Text to look for in post commentary and shared links
    pub query: String,
}

#[derive(Args, Debug)]
pub struct ConnectionsArgs {
    /// Filter by position/title substring
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Filter by company substring
    #[arg(long, short = 'c')]
    pub company: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeywordsArgs {
    /// Keywords that must all appear in a connection's title or company
    #[arg(required = true, num_args = 1..)]
    pub keywords: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    /// Text to look for in comment bodies
    pub query: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
