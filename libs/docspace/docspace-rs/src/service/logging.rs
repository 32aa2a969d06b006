//! Tracing for a session: `docspace.log` under the writeable path, plus an
//! optional stdout copy. Only this crate's events are recorded.

use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::{env, fs, panic};

use chrono::{DateTime, Local};
use tracing::metadata::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter, fmt, Layer, Registry};

use crate::model::core_config::Config;
use crate::model::errors::{core_err_unexpected, DsResult};

pub static LOG_FILE: &str = "docspace.log";

/// Checked first, then the generic `LOG_LEVEL`.
pub static LEVEL_VAR: &str = "DOCSPACE_LOG_LEVEL";

const TARGET: &str = env!("CARGO_CRATE_NAME");

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init(config: &Config) -> DsResult<()> {
    if !config.logs {
        return Ok(());
    }

    let level =
        level_from(env::var(LEVEL_VAR).or_else(|_| env::var("LOG_LEVEL")).ok().as_deref());

    let mut layers: Vec<BoxedLayer> = vec![session_layer(
        tracing_appender::rolling::never(&config.writeable_path, LOG_FILE),
        config.colored_logs,
        level,
    )];
    if config.stdout_logs {
        layers.push(session_layer(std::io::stdout, config.colored_logs, level));
    }

    tracing::subscriber::set_global_default(Registry::default().with(layers))
        .map_err(core_err_unexpected)?;
    record_panics(PathBuf::from(&config.writeable_path));
    Ok(())
}

/// Unset or unparseable levels log at debug.
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(LevelFilter::DEBUG)
}

fn session_layer<W>(writer: W, ansi: bool, level: LevelFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::Layer::new()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(writer)
        .with_filter(level)
        .with_filter(filter::filter_fn(|metadata| metadata.target().starts_with(TARGET)))
        .boxed()
}

fn panic_log_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("docspace-panic-{}.log", at.format("%Y%m%d-%H%M%S")))
}

/// Panics land in the session log and in a file of their own next to it.
fn record_panics(dir: PathBuf) {
    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!("panic: {info}\n{backtrace}");

        let path = panic_log_path(&dir, Local::now());
        if let Err(err) = fs::write(&path, format!("{info}\n\n{backtrace}")) {
            eprintln!("panic: {info}; could not write {}: {err}", path.display());
        }
    }));
}

#[cfg(test)]
mod unit_tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn levels_fall_back_to_debug() {
        assert_eq!(level_from(Some("warn")), LevelFilter::WARN);
        assert_eq!(level_from(Some(" TRACE ")), LevelFilter::TRACE);
        assert_eq!(level_from(Some("loud")), LevelFilter::DEBUG);
        assert_eq!(level_from(None), LevelFilter::DEBUG);
    }

    #[test]
    fn panic_files_are_named_by_time() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            panic_log_path(Path::new("/var/docspace"), at),
            PathBuf::from("/var/docspace/docspace-panic-20260309-140507.log")
        );
    }
}
