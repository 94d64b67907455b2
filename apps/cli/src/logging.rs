//! Tracing setup for the CLI
//!
//! - Console: compact, to stderr so stdout stays clean for JSON output
//! - File: daily rotation under `<data dir>/mcpreg/logs/`

use std::path::PathBuf;

use mcpreg_core::branding;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "warn,mcpreg_core=info,mcpreg_storage=info";
const VERBOSE_FILTER: &str = "info,mcpreg_core=debug,mcpreg_storage=debug,mcpreg=debug";

fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(branding::SHORT_NAME)
}

fn logs_dir() -> PathBuf {
    app_data_dir().join("logs")
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .compact()
        .with_target(verbose);

    // A missing log directory only costs the file output
    let (file_layer, guard) = match file_writer() {
        Ok((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn file_writer() -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let logs_dir = logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    // mcpreg.2026-01-22.log
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(branding::LOG_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)?;
    Ok(tracing_appender::non_blocking(appender))
}
