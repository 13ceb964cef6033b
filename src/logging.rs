use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Console verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Silent,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn level(self, dry_run: bool) -> LevelFilter {
        let level = match self {
            Self::Silent => LevelFilter::OFF,
            Self::Normal => LevelFilter::WARN,
            Self::Verbose => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        };
        // Dry runs always log at INFO or finer.
        if dry_run && level < LevelFilter::INFO {
            LevelFilter::INFO
        } else {
            level
        }
    }
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("myrm.log")
}

/// Install the global subscriber: stderr plus a plain-text copy in
/// `log_file`. `RUST_LOG` overrides `level` when set.
pub fn init(level: LevelFilter, log_file: &Path) {
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .ok()
        .map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(filter())
        });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
}
