//! fsjet CLI entry point.
//!
//! Usage:
//!   fsjet inspect <path> [--checksum md5] [--mode] [--times] [--follow]
//!   fsjet tree [path] [--checksum sha256] [--relative-path]
//!   fsjet find [path] [-m PATTERN]... [--directories] [--no-files]
//!   fsjet copy <from> <to> [--overwrite] [-m PATTERN]...
//!   fsjet walk [path] [--max-depth N]
//!
//! Results are printed as JSON; `walk` prints one JSON object per line as
//! entries arrive. `--sync` uses the blocking API instead of the async one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use fsjet::{
    ChecksumAlgorithm, CopyOptions, FindOptions, InspectOptions, Jetpack, Overwrite, SymlinkMode,
    TreeOptions, WalkEntry, WalkOptions,
};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Inspect, walk, find and copy filesystem trees
#[derive(Parser, Debug)]
#[command(name = "fsjet", version)]
struct Cli {
    /// More logging on stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Use the blocking API instead of the async one
    #[arg(long, global = true)]
    sync: bool,

    /// Resolve relative paths against this directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SymlinkArgs {
    /// Follow symlinks instead of reporting them
    #[arg(short = 'L', long)]
    follow: bool,
}

impl SymlinkArgs {
    fn mode(&self) -> SymlinkMode {
        if self.follow {
            SymlinkMode::Follow
        } else {
            SymlinkMode::Report
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe a single path
    Inspect {
        path: PathBuf,
        /// md5, sha1, sha256 or sha512
        #[arg(long, value_name = "ALGO")]
        checksum: Option<ChecksumAlgorithm>,
        #[arg(long)]
        mode: bool,
        #[arg(long)]
        times: bool,
        #[arg(long)]
        absolute_path: bool,
        #[command(flatten)]
        symlinks: SymlinkArgs,
    },
    /// Nested description of a subtree with aggregated sizes
    Tree {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long, value_name = "ALGO")]
        checksum: Option<ChecksumAlgorithm>,
        #[arg(long)]
        relative_path: bool,
        #[arg(long)]
        times: bool,
        #[command(flatten)]
        symlinks: SymlinkArgs,
    },
    /// List paths under a directory that match patterns
    Find {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Pattern to match; repeat for several, prefix with ! to negate
        #[arg(short = 'm', long = "matching", value_name = "PATTERN", action = ArgAction::Append)]
        matching: Vec<String>,
        /// Include directories
        #[arg(long)]
        directories: bool,
        /// Leave files out
        #[arg(long)]
        no_files: bool,
        /// Only look at direct children
        #[arg(long)]
        no_recursive: bool,
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },
    /// Copy a file or a tree
    Copy {
        from: PathBuf,
        to: PathBuf,
        /// Replace existing destination files
        #[arg(long)]
        overwrite: bool,
        /// Only copy entries matching this pattern; repeatable
        #[arg(short = 'm', long = "matching", value_name = "PATTERN", action = ArgAction::Append)]
        matching: Vec<String>,
        #[arg(short = 'i', long)]
        ignore_case: bool,
    },
    /// Print every entry of a walk, one JSON object per line
    Walk {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(short = 'd', long, value_name = "NUM")]
        max_depth: Option<usize>,
        #[arg(long, value_name = "ALGO")]
        checksum: Option<ChecksumAlgorithm>,
        #[command(flatten)]
        symlinks: SymlinkArgs,
    },
}

/// A parsed command with its options resolved.
enum Job {
    Inspect(PathBuf, InspectOptions),
    Tree(PathBuf, TreeOptions),
    Find(PathBuf, FindOptions),
    Copy(PathBuf, PathBuf, CopyOptions),
    Walk(PathBuf, WalkOptions),
}

impl From<Command> for Job {
    fn from(command: Command) -> Self {
        match command {
            Command::Inspect {
                path,
                checksum,
                mode,
                times,
                absolute_path,
                symlinks,
            } => Job::Inspect(
                path,
                InspectOptions {
                    checksum,
                    mode,
                    times,
                    absolute_path,
                    symlinks: symlinks.mode(),
                },
            ),
            Command::Tree {
                path,
                checksum,
                relative_path,
                times,
                symlinks,
            } => Job::Tree(
                path,
                TreeOptions {
                    checksum,
                    relative_path,
                    symlinks: symlinks.mode(),
                    times,
                },
            ),
            Command::Find {
                path,
                matching,
                directories,
                no_files,
                no_recursive,
                ignore_case,
            } => {
                let defaults = FindOptions::default();
                Job::Find(
                    path,
                    FindOptions {
                        matching: if matching.is_empty() {
                            defaults.matching
                        } else {
                            matching
                        },
                        files: !no_files,
                        directories,
                        recursive: !no_recursive,
                        ignore_case,
                    },
                )
            }
            Command::Copy {
                from,
                to,
                overwrite,
                matching,
                ignore_case,
            } => Job::Copy(
                from,
                to,
                CopyOptions {
                    overwrite: Overwrite::from(overwrite),
                    matching: (!matching.is_empty()).then_some(matching),
                    ignore_case,
                },
            ),
            Command::Walk {
                path,
                max_depth,
                checksum,
                symlinks,
            } => Job::Walk(
                path,
                WalkOptions {
                    max_depth,
                    inspect: InspectOptions {
                        checksum,
                        symlinks: symlinks.mode(),
                        ..Default::default()
                    },
                },
            ),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "fsjet=info",
        1 => "fsjet=debug",
        _ => "fsjet=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            let code = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<fsjet::Error>())
                .map(fsjet::Error::code);
            match code {
                Some(code) => eprintln!("Error [{code}]: {e:#}"),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let jet = match &cli.cwd {
        Some(dir) => Jetpack::at(dir),
        None => Jetpack::new(),
    }
    .context("could not determine working directory")?;
    let job = Job::from(cli.command);
    tracing::debug!(cwd = %jet.cwd().display(), sync = cli.sync, "running");

    let output = if cli.sync {
        run_sync(&jet, job)?
    } else {
        // Single-threaded cooperative scheduling for the async API.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        runtime.block_on(run_async(&jet, job))?
    };

    if let Some(value) = output {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_sync(jet: &Jetpack, job: Job) -> Result<Option<Value>> {
    let value = match job {
        Job::Inspect(path, options) => serde_json::to_value(
            jet.inspect_sync(&path, &options)
                .with_context(|| format!("inspect {}", path.display()))?,
        )?,
        Job::Tree(path, options) => serde_json::to_value(
            jet.inspect_tree_sync(&path, &options)
                .with_context(|| format!("tree {}", path.display()))?,
        )?,
        Job::Find(path, options) => serde_json::to_value(
            jet.find_sync(&path, &options)
                .with_context(|| format!("find in {}", path.display()))?,
        )?,
        Job::Copy(from, to, options) => {
            jet.copy_sync(&from, &to, &options)
                .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
            return Ok(None);
        }
        Job::Walk(path, options) => {
            let mut out = std::io::stdout().lock();
            for entry in jet.walk_iter(&path, &options) {
                let entry = entry.with_context(|| format!("walk {}", path.display()))?;
                print_entry(&mut out, jet.cwd(), &entry)?;
            }
            return Ok(None);
        }
    };
    Ok(Some(value))
}

async fn run_async(jet: &Jetpack, job: Job) -> Result<Option<Value>> {
    let value = match job {
        Job::Inspect(path, options) => serde_json::to_value(
            jet.inspect(&path, &options)
                .await
                .with_context(|| format!("inspect {}", path.display()))?,
        )?,
        Job::Tree(path, options) => serde_json::to_value(
            jet.inspect_tree(&path, &options)
                .await
                .with_context(|| format!("tree {}", path.display()))?,
        )?,
        Job::Find(path, options) => serde_json::to_value(
            jet.find(&path, &options)
                .await
                .with_context(|| format!("find in {}", path.display()))?,
        )?,
        Job::Copy(from, to, options) => {
            jet.copy(&from, &to, &options)
                .await
                .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
            return Ok(None);
        }
        Job::Walk(path, options) => {
            let mut walk = jet.walk_stream(&path, &options);
            let mut out = std::io::stdout().lock();
            while let Some(entry) = walk.next().await {
                let entry = entry.with_context(|| format!("walk {}", path.display()))?;
                print_entry(&mut out, jet.cwd(), &entry)?;
            }
            return Ok(None);
        }
    };
    Ok(Some(value))
}

/// One walk entry as a JSON line, with its path shown relative to `cwd`.
fn print_entry(out: &mut impl Write, cwd: &Path, entry: &WalkEntry) -> Result<()> {
    let shown = fsjet::paths::relative(cwd, &entry.path);
    let shown = if shown.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        shown
    };
    let line = serde_json::json!({
        "path": shown,
        "depth": entry.depth,
        "entry": entry.descriptor,
    });
    writeln!(out, "{line}")?;
    Ok(())
}
