use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::{error, info, Level, LevelFilter};
use patchforge::block::extract_blocks;
use patchforge::commit::{commit_changes, CommitMode, CommitOptions};
use patchforge::plan::{apply_change_smartly, plan_changes};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply Markdown-described edits to a codebase using fuzzy-matched hunk location.",
    long_about = "Extracts file/diff/rename/delete/search-replace blocks from a Markdown file, locates each diff's hunks with fuzzy matching even under drift, and commits the result to a target directory."
)]
struct Args {
    /// Path to the input Markdown file describing the edits.
    input_file: PathBuf,

    /// Path to the target directory the edits apply to.
    target_dir: PathBuf,

    #[arg(short = 'n', long, help = "Show what would be done, but don't modify files.")]
    dry_run: bool,

    #[arg(long, help = "Abort on the first failed change instead of continuing.")]
    fail_fast: bool,

    #[arg(long, help = "Stage writes in a tempfile and rename into place.")]
    atomic: bool,

    #[arg(long, value_name = "EXT", help = "Back up modified files with this extension before overwriting.")]
    backup_ext: Option<String>,

    /// Increase logging verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        long_help = "Increase logging verbosity.\n-v for info, -vv for debug, -vvv for trace.\nBy default, only warnings and errors are shown."
    )]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();

    if !args.target_dir.is_dir() {
        anyhow::bail!("Target directory '{}' not found or is not a directory.", args.target_dir.display());
    }

    let content = fs::read_to_string(&args.input_file)
        .with_context(|| format!("Failed to read input file '{}'", args.input_file.display()))?;

    let blocks = extract_blocks(&content);
    if blocks.is_empty() {
        println!("No edit blocks found in the input file.");
        return Ok(());
    }

    println!();
    info!("Found {} edit block(s) to plan.", blocks.len());

    let planned = plan_changes(blocks, &args.target_dir, None);
    let mut changes = Vec::new();
    for plan in &planned {
        let (change, logs) = apply_change_smartly(plan, &args.target_dir, None, None);
        for line in logs {
            info!("{line}");
        }
        match change {
            Some(c) => changes.push(c),
            None => error!("--- could not generate content for {}", plan.file_path.display()),
        }
    }

    let options = CommitOptions {
        mode: if args.fail_fast { CommitMode::FailFast } else { CommitMode::BestEffort },
        atomic: args.atomic,
        dry_run: args.dry_run,
        backup_ext: args.backup_ext,
    };
    let summary = commit_changes(&args.target_dir, changes, options);

    println!("\n--- Summary ---");
    println!("Successful operations: {}", summary.success.len());
    println!("Failed operations:     {}", summary.failed.len());
    for path in &summary.failed {
        if let Some(msg) = summary.errors.get(path) {
            error!("--- FAILED {}: {}", path.display(), msg);
        }
    }
    if args.dry_run {
        println!("DRY RUN completed. No files were modified.");
    }

    if !summary.failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
