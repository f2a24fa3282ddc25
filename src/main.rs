//! indexdelta - incremental change detection for source trees.
//!
//! Usage:
//!   idx status [PATH]          Show what changed since the last sync
//!   idx sync [PATH]            Record the current tree as processed
//!   idx forget <REL_PATH>      Drop one manifest entry
//!   idx export [PATH]          Dump the manifest to JSON
//!   idx --help                 Show help

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use itertools::Itertools;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

use indexdelta_core::{IndexConfig, Summary};
use indexdelta_reconcile::{
    ChangeKind, IndexPlan, Indexer, ManifestStore, ScanProgress, commit, prune_removed,
};

/// Metadata directory created under the root when `--metadata-dir` is absent.
const DEFAULT_METADATA_DIR: &str = ".indexdelta";

#[derive(Parser)]
#[command(
    name = "indexdelta",
    version,
    about = "Incremental change detection for source trees",
    long_about = "indexdelta remembers the content hash of every source file it has \
                  processed and reports which files were added, modified or removed \
                  since the last sync."
)]
struct Cli {
    /// Directory holding the manifest (defaults to <root>/.indexdelta)
    #[arg(long, global = true)]
    metadata_dir: Option<PathBuf>,

    /// Print progress lines to stderr while scanning
    #[arg(long, global = true)]
    progress: bool,

    /// Leave zero-length files out of the change set (indexed files that
    /// became empty are reported as removed)
    #[arg(long, global = true)]
    skip_empty: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show added, modified and removed files
    Status {
        /// Root of the source tree
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Also list unchanged files
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Record every added or modified file and drop removed ones
    Sync {
        /// Root of the source tree
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Remove one entry from the manifest
    Forget {
        /// Path relative to the root, with forward slashes
        rel_path: String,

        /// Root of the source tree
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Export manifest entries to JSON
    Export {
        /// Root of the source tree
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Status { path, all, format } => run_status(&cli, path, *all, *format)?,
        Command::Sync { path } => run_sync(&cli, path)?,
        Command::Forget { rel_path, root } => run_forget(&cli, root, rel_path)?,
        Command::Export { path, output } => run_export(&cli, path, output.as_deref())?,
    }

    Ok(())
}

/// Install the stderr subscriber. `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbose).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn level_for(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Canonical root and the manifest store that belongs to it.
fn open(cli: &Cli, path: &Path) -> Result<(PathBuf, ManifestStore)> {
    let root = path.canonicalize().context("Invalid path")?;
    let metadata_dir = cli
        .metadata_dir
        .clone()
        .unwrap_or_else(|| root.join(DEFAULT_METADATA_DIR));
    let store = ManifestStore::open_in(&metadata_dir)
        .with_context(|| format!("Failed to open manifest in {}", metadata_dir.display()))?;
    Ok((root, store))
}

/// Scan `root` and reconcile it against `store`, reporting progress if asked.
fn plan(cli: &Cli, root: &Path, store: &ManifestStore) -> Result<IndexPlan> {
    let mut config = IndexConfig::from_env(root).context("Invalid configuration")?;
    config.skip_empty |= cli.skip_empty;

    let indexer = Indexer::new(config);
    let reporter = cli.progress.then(|| spawn_reporter(indexer.subscribe()));

    eprintln!("Scanning {}...", root.display());
    let plan = indexer.plan(store).context("Scan failed");

    drop(indexer);
    if let Some(handle) = reporter {
        let _ = handle.join();
    }

    plan
}

/// Print each progress snapshot on its own stderr line until the run ends.
fn spawn_reporter(mut rx: broadcast::Receiver<ScanProgress>) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(progress) => eprintln!("{}", progress.render_line()),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Show the change set without touching the manifest.
fn run_status(cli: &Cli, path: &Path, all: bool, format: OutputFormat) -> Result<()> {
    let (root, store) = open(cli, path)?;
    let plan = plan(cli, &root, &store)?;
    store.close()?;

    let changes = &plan.changes;
    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" {}", root.display());
            println!(
                " {} added, {} modified, {} removed, {} unchanged",
                changes.added.len(),
                changes.modified.len(),
                changes.removed.len(),
                changes.unchanged.len()
            );
            println!(
                " {} read in {:.2}s",
                format_size(plan.progress.bytes_read),
                plan.progress.elapsed.as_secs_f64()
            );
            println!("{}", "─".repeat(60));

            if changes.is_clean() && !all {
                println!();
                println!(" Manifest is up to date.");
                return Ok(());
            }

            for (kind, paths) in [
                (ChangeKind::Added, &changes.added),
                (ChangeKind::Modified, &changes.modified),
                (ChangeKind::Removed, &changes.removed),
                (ChangeKind::Unchanged, &changes.unchanged),
            ] {
                if paths.is_empty() || (kind == ChangeKind::Unchanged && !all) {
                    continue;
                }
                println!();
                println!(" {} ({}):", kind, paths.len());
                for path in paths.iter().sorted() {
                    match plan.record(path) {
                        Some(record) => println!(
                            "   {:<50} {:>10}  {}",
                            path,
                            format_size(record.size),
                            format_timestamp(record.modified_at)
                        ),
                        None => println!("   {}", path),
                    }
                }
            }
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "root": root,
                "counts": changes.counts(),
                "changes": changes,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Mark the current tree as processed.
fn run_sync(cli: &Cli, path: &Path) -> Result<()> {
    let (root, store) = open(cli, path)?;
    let plan = plan(cli, &root, &store)?;

    let pruned = prune_removed(&store, &plan.changes).context("Failed to prune manifest")?;
    let mut recorded = 0;
    for record in plan.pending_records() {
        commit(&store, record, Summary::default())
            .with_context(|| format!("Failed to record {}", record.relative_path))?;
        recorded += 1;
    }
    store.close()?;

    eprintln!(
        "Recorded {} file(s), pruned {}, {} unchanged",
        recorded,
        pruned,
        plan.changes.unchanged.len()
    );
    Ok(())
}

/// Evict one manifest entry so the next status reports it as added.
fn run_forget(cli: &Cli, root: &Path, rel_path: &str) -> Result<()> {
    let (_, store) = open(cli, root)?;
    let removed = store.delete(rel_path)?;
    store.close()?;

    if removed {
        eprintln!("Forgot {}", rel_path);
    } else {
        eprintln!("{} is not in the manifest", rel_path);
    }
    Ok(())
}

/// Export every manifest entry to JSON.
fn run_export(cli: &Cli, path: &Path, output: Option<&Path>) -> Result<()> {
    let (_, store) = open(cli, path)?;
    let entries = store.entries()?;
    store.close()?;

    let json = serde_json::to_string_pretty(&entries)?;

    match output {
        Some(output_path) => {
            std::fs::write(output_path, json)?;
            eprintln!(
                "Exported {} entries to {}",
                entries.len(),
                output_path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Render a millisecond Unix timestamp as local time.
fn format_timestamp(millis: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(utc) => utc
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["idx", "status", "src", "--progress", "-vv"]);
        assert!(cli.progress);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Status { ref path, .. } if path == Path::new("src")));
    }

    #[test]
    fn test_forget_requires_path() {
        assert!(Cli::try_parse_from(["idx", "forget"]).is_err());
        let cli = Cli::try_parse_from(["idx", "forget", "src/a.js", "--root", "/repo"]).unwrap();
        assert!(matches!(cli.command, Command::Forget { ref rel_path, .. } if rel_path == "src/a.js"));
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), tracing::Level::WARN);
        assert_eq!(level_for(1), tracing::Level::INFO);
        assert_eq!(level_for(9), tracing::Level::TRACE);
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), "-");
        assert!(!format_timestamp(0).is_empty());
    }
}
