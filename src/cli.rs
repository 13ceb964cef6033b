use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::bucket::engine::Bucket;
use crate::bucket::paths::{MyrmPaths, resolve_paths};
use crate::bucket::report::Reporter;
use crate::bucket::settings::{AppSettings, SettingsOverrides, load_settings};
use crate::commands::{self, CommandReport};
use crate::env_loader;
use crate::logging::{self, Verbosity};

#[derive(Debug, Parser)]
#[command(
    name = "myrm",
    version,
    about = "Move files into a restorable bucket instead of deleting them"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Settings file (JSON5, or TOML when the extension is .toml)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Directory that holds removed items
    #[arg(long, global = true, value_name = "PATH")]
    bucket_path: Option<PathBuf>,

    /// File that stores the bucket history
    #[arg(long, global = true, value_name = "PATH")]
    bucket_history_path: Option<PathBuf>,

    /// Maximum bucket size in megabytes
    #[arg(long, global = true, value_name = "MB")]
    bucket_size: Option<u64>,

    /// Days to keep items before --timeout-cleanup deletes them
    #[arg(long, global = true, value_name = "DAYS")]
    bucket_timeout_cleanup: Option<u64>,

    /// Print debugging statements
    #[arg(long, global = true, conflicts_with_all = ["verbose", "silent"])]
    debug: bool,

    /// Print what is being done
    #[arg(long, global = true, conflicts_with = "silent")]
    verbose: bool,

    /// Print nothing but errors from the command itself
    #[arg(long, global = true)]
    silent: bool,

    /// Report what would happen without changing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    yes: bool,
}

impl GlobalArgs {
    fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else if self.silent {
            Verbosity::Silent
        } else {
            Verbosity::Normal
        }
    }

    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            settings_file: self.settings.clone(),
            bucket_path: self.bucket_path.clone(),
            bucket_history_path: self.bucket_history_path.clone(),
            bucket_size_mb: self.bucket_size,
            bucket_timeout_days: self.bucket_timeout_cleanup,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move items into the bucket, or delete them permanently with --force
    Rm {
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Treat FILES as directories and act on the paths under them that
        /// match this shell glob (e.g. '*.log' or 'sub/*.txt')
        #[arg(short, long, value_name = "GLOB")]
        regex: Option<String>,

        /// Delete permanently instead of moving into the bucket
        #[arg(short, long)]
        force: bool,
    },
    /// Show a page of the bucket history
    Show {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Restore items from the bucket by history index
    Restore {
        #[arg(required = true, value_name = "INDICES")]
        indices: Vec<u64>,
    },
    /// Maintain the bucket itself
    Bucket {
        #[arg(long)]
        create: bool,

        /// Delete everything in the bucket and clear the history
        #[arg(long)]
        cleanup: bool,

        /// Reconcile the history with the bucket contents
        #[arg(long)]
        check: bool,

        /// Delete items older than the retention period
        #[arg(long)]
        timeout_cleanup: bool,
    },
    /// Print the effective settings or write them to a file
    Settings {
        /// Write settings to PATH (default: the settings file location)
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        generate: Option<Option<PathBuf>>,
    },
}

fn open_bucket(paths: &MyrmPaths, settings: &AppSettings) -> Result<Bucket> {
    let reporter = Reporter::with_audit_log(&paths.audit_log);
    let bucket = Bucket::new(settings, reporter).with_context(|| {
        format!(
            "failed to open bucket history {}",
            settings.bucket_history_path.display()
        )
    })?;
    bucket.startup().with_context(|| {
        format!("failed to prepare bucket {}", settings.bucket_path.display())
    })?;
    Ok(bucket)
}

fn dispatch(
    command: Command,
    global: &GlobalArgs,
    paths: &MyrmPaths,
    settings: &AppSettings,
) -> Result<CommandReport> {
    match command {
        Command::Rm {
            files,
            regex,
            force,
        } => {
            let mut bucket = open_bucket(paths, settings)?;
            commands::rm::run(
                &mut bucket,
                &commands::rm::RmOptions {
                    files,
                    pattern: regex,
                    force,
                    dry_run: global.dry_run,
                    assume_yes: global.yes,
                },
            )
        }
        Command::Show { limit, page } => {
            let bucket = open_bucket(paths, settings)?;
            commands::show::run(&bucket, &commands::show::ShowOptions { limit, page })
        }
        Command::Restore { indices } => {
            let mut bucket = open_bucket(paths, settings)?;
            commands::restore::run(
                &mut bucket,
                &commands::restore::RestoreOptions {
                    indices,
                    dry_run: global.dry_run,
                },
            )
        }
        Command::Bucket {
            create,
            cleanup,
            check,
            timeout_cleanup,
        } => {
            let mut bucket = open_bucket(paths, settings)?;
            commands::maintain::run(
                &mut bucket,
                &commands::maintain::MaintainOptions {
                    create,
                    cleanup,
                    check,
                    timeout_cleanup,
                    dry_run: global.dry_run,
                    assume_yes: global.yes,
                },
            )
        }
        Command::Settings { generate } => commands::settings::run(
            paths,
            settings,
            &commands::settings::SettingsOptions {
                generate,
                dry_run: global.dry_run,
            },
        ),
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    logging::init(
        global.verbosity().level(global.dry_run),
        &logging::default_log_file(),
    );
    for var in env_loader::unknown_myrm_vars() {
        tracing::warn!(var = %var, "ignoring unrecognized environment variable");
    }

    let paths = resolve_paths()?;
    let settings = load_settings(&paths, &global.overrides()).context("failed to load settings")?;
    tracing::debug!(
        bucket = %settings.bucket_path.display(),
        history = %settings.bucket_history_path.display(),
        max_size = settings.bucket_size,
        storetime = settings.bucket_timeout_cleanup,
        "settings resolved"
    );

    let report = dispatch(cli.command, global, &paths, &settings)?;
    print!("{}", report.render());
    eprint!("{}", report.render_issues());
    report.into_result()?;
    Ok(())
}
