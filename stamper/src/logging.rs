//! Log output to stderr and to a size-capped rotating file next to the settings.

use eyre::Context;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_LOG_FILE: &str = "error_log.txt";

const MAX_LOG_BYTES: usize = 10 * 1024 * 1024;
const LOG_BACKUPS: usize = 5;

/// `SCENE_STAMPER_LOG` if set, else [`DEFAULT_LOG_FILE`] in the working directory.
pub fn log_path() -> PathBuf {
    std::env::var_os("SCENE_STAMPER_LOG")
        .filter(|p| !p.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
}

/// Installs the global subscriber.
///
/// The level defaults to `INFO` and can be changed with `RUST_LOG`. Once the file reaches
/// 10 MiB it is moved to `<file>.1` (older backups shift up, keeping five).
pub fn init(file: &Path) -> eyre::Result<()> {
    let rotating = FileRotate::new(
        file,
        AppendCount::new(LOG_BACKUPS),
        ContentLimit::Bytes(MAX_LOG_BYTES),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(rotating))
                .with_ansi(false),
        )
        .try_init()
        .context("install tracing subscriber")
}
