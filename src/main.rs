//! lix - LinkedIn data export search CLI
//!
//! Main entry point for the lix command-line tool.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use lix::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_cli_logging(cli.quiet, cli.verbose);

    let config = config::Config::load();
    if !config.output.colors {
        colored::control::set_override(false);
    }

    let watch_dir = cli.watch.clone().unwrap_or_else(|| config.watch_dir());
    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());
    let format = cli
        .format
        .clone()
        .unwrap_or_else(|| config.output.format.parse().unwrap_or_default());
    let quiet = cli.quiet || config.output.quiet;

    // Completions need no store, so skip the refresh path entirely
    if let Commands::Completions(args) = &cli.command {
        return cmd_completions(args.clone());
    }

    // Every query first brings the store up to date with the newest export
    if let Err(err) = refresh_store(&watch_dir, &db_path, quiet) {
        report_ingest_failure(&err);
        std::process::exit(1);
    }

    match &cli.command {
        Commands::Posts(args) => cmd_posts(&db_path, &format, args),
        Commands::Connections(args) => cmd_connections(&db_path, &format, args),
        Commands::Keywords(args) => cmd_keywords(&db_path, &format, args),
        Commands::Comments(args) => cmd_comments(&db_path, &format, args),
        Commands::Stats => cmd_stats(&db_path, &format),
        // Handled before the refresh above
        Commands::Completions(_) => Ok(()),
    }
}

/// Load the newest export if the store is stale, with a spinner.
fn refresh_store(watch_dir: &Path, db_path: &Path, quiet: bool) -> Result<()> {
    let ingestor = Ingestor::new(watch_dir, db_path);
    let Some(archive) = ingestor.pending_archive()? else {
        debug!("Store already reflects the newest export");
        return Ok(());
    };

    let label = archive_label(&archive);
    let spinner = (!quiet).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Loading {label}..."));
        pb
    });

    let result = ingestor.run(&archive);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result?;

    if !quiet {
        println!("{} Loaded {label}", "✓".green());
    }
    Ok(())
}

fn archive_label(archive: &Path) -> String {
    archive.file_name().map_or_else(
        || archive.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn report_ingest_failure(err: &anyhow::Error) {
    let suggestions: Vec<&str> = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<LixError>())
        .and_then(LixError::suggestion)
        .into_iter()
        .collect();
    eprintln!();
    eprintln!(
        "{}",
        format_error(
            "Could not refresh the store",
            &format!("{err:#}"),
            &suggestions
        )
    );
}

fn cmd_posts(db_path: &Path, format: &OutputFormat, args: &cli::PostsArgs) -> Result<()> {
    let storage = Storage::open(db_path)?;
    let posts = storage.search_posts(&args.query)?;

    if posts.is_empty() {
        println!("{}", "No posts found.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&posts)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&posts)?),
        OutputFormat::Text => {
            println!(
                "{} posts matching \"{}\":\n",
                posts.len().to_string().cyan(),
                args.query.bold()
            );
            for (i, post) in posts.iter().enumerate() {
                print_post(i + 1, post);
            }
        }
    }

    Ok(())
}

fn print_post(num: usize, post: &Post) {
    println!(
        "{}. {}",
        num.to_string().dimmed(),
        post.date.as_deref().unwrap_or("undated").dimmed()
    );

    if let Some(commentary) = post.commentary.as_deref() {
        for line in textwrap::wrap(&preview(commentary, PREVIEW_CHARS), 78) {
            println!("   {line}");
        }
    }

    match post.link.as_deref() {
        Some(link) if !link.is_empty() => println!("   {}", link.blue()),
        _ => {}
    }

    println!();
}

fn cmd_connections(
    db_path: &Path,
    format: &OutputFormat,
    args: &cli::ConnectionsArgs,
) -> Result<()> {
    // Empty filter strings mean "no filter"
    let title = args.title.as_deref().filter(|s| !s.is_empty());
    let company = args.company.as_deref().filter(|s| !s.is_empty());

    let storage = Storage::open(db_path)?;
    let connections = storage.find_connections(title, company)?;

    let heading = match (title, company) {
        (Some(t), Some(c)) => format!("title \"{t}\" at \"{c}\""),
        (Some(t), None) => format!("title \"{t}\""),
        (None, Some(c)) => format!("company \"{c}\""),
        (None, None) => "any title or company".to_string(),
    };
    print_connection_results(&connections, format, &heading)
}

fn cmd_keywords(db_path: &Path, format: &OutputFormat, args: &cli::KeywordsArgs) -> Result<()> {
    let storage = Storage::open(db_path)?;
    let connections = storage.find_connections_by_keywords(&args.keywords)?;

    let heading = args
        .keywords
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(" + ");
    print_connection_results(&connections, format, &heading)
}

fn print_connection_results(
    connections: &[Connection],
    format: &OutputFormat,
    heading: &str,
) -> Result<()> {
    if connections.is_empty() {
        println!("{}", "No connections found.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(connections)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(connections)?),
        OutputFormat::Text => {
            println!(
                "{} connections matching {heading}:\n",
                connections.len().to_string().cyan()
            );
            for (i, conn) in connections.iter().enumerate() {
                print_connection(i + 1, conn);
            }
        }
    }

    Ok(())
}

fn print_connection(num: usize, conn: &Connection) {
    let name = conn.full_name();
    let display_name = if name.is_empty() {
        "(unnamed)"
    } else {
        name.as_str()
    };

    println!("{}. {}", num.to_string().dimmed(), display_name.bold());
    println!(
        "   {} at {}",
        conn.position.as_deref().unwrap_or("Unknown position"),
        conn.company.as_deref().unwrap_or("Unknown company")
    );
    println!();
}

fn cmd_comments(db_path: &Path, format: &OutputFormat, args: &cli::CommentsArgs) -> Result<()> {
    let storage = Storage::open(db_path)?;
    let comments = storage.search_comments(&args.query)?;

    if comments.is_empty() {
        println!("{}", "No comments found.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&comments)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&comments)?),
        OutputFormat::Text => {
            println!(
                "{} comments matching \"{}\":\n",
                comments.len().to_string().cyan(),
                args.query.bold()
            );
            for (i, comment) in comments.iter().enumerate() {
                print_comment(i + 1, comment);
            }
        }
    }

    Ok(())
}

fn print_comment(num: usize, comment: &Comment) {
    println!(
        "{}. {}",
        num.to_string().dimmed(),
        comment.date.as_deref().unwrap_or("undated").dimmed()
    );

    if let Some(body) = comment.body.as_deref() {
        for line in textwrap::wrap(&preview(body, PREVIEW_CHARS), 78) {
            println!("   {line}");
        }
    }

    println!();
}

fn cmd_stats(db_path: &Path, format: &OutputFormat) -> Result<()> {
    let storage = Storage::open(db_path)?;
    let stats = storage.stats()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&stats)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("{}", "Export Statistics".bold().cyan());
            println!("{}", "─".repeat(40));
            println!("  {:<14} {:>10}", "Posts:", format_number(stats.posts));
            println!(
                "  {:<14} {:>10}",
                "Connections:",
                format_number(stats.connections)
            );
            println!("  {:<14} {:>10}", "Comments:", format_number(stats.comments));
            println!(
                "  {:<14} {:>10}",
                "Reactions:",
                format_number(stats.reactions)
            );
            println!("{}", "─".repeat(40));

            if let Some(archive) = &stats.last_loaded_archive {
                println!("  Loaded from: {}", archive.green());
            }
            println!(
                "  Loaded:      {}",
                format_optional_date(stats.last_loaded_at)
            );
            if let Ok(meta) = std::fs::metadata(db_path) {
                println!("  Store size:  {}", format_bytes(meta.len()));
            }
        }
    }

    Ok(())
}

fn cmd_completions(args: cli::CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "lix", &mut io::stdout());
    Ok(())
}
