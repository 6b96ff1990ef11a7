use anyhow::Result;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::{error, settings::Environment};

/// Configures tracing.
///
/// By default, tracing writes to stderr using the `fmt` subscriber which
/// produces log-like output. The CLI supports a repeating `--verbose` flag to
/// change the filter level from error .. trace (achieved with `-vvv`).
///
/// If logging is enabled (via `debug.log` in the config file), all events (no
/// filter) will be written to an hourly file in bunyan format instead.
/// Nothing is written to the console in that mode: at debug/trace level the
/// console output is far too noisy to share a stream with the resolved
/// credentials on stdout.
pub(crate) fn configure(verbose: u8, env: &Environment) -> Result<Option<WorkerGuard>> {
    let (non_blocking, guard) = match env.debug_log() {
        Some(ref path) => {
            let dirname = path.parent().ok_or(error::usage_error(format!(
                "{} is not in a directory",
                path.display()
            )))?;
            let prefix = path.file_name().ok_or(error::usage_error(format!(
                "{} does not have a filename",
                path.display()
            )))?;
            let file_appender = rolling::hourly(dirname, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    match non_blocking {
        Some(non_blocking) => {
            let formatting_layer = BunyanFormattingLayer::new("cloudshell".into(), non_blocking);
            Registry::default()
                .with(JsonStorageLayer)
                .with(formatting_layer)
                .try_init()?;
        }
        None => {
            let level = match verbose {
                0 => "error",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };

            let filter = EnvFilter::from_default_env()
                .add_directive("rustyline=off".parse()?)
                .add_directive(level.parse()?);

            // The credential document goes to stdout; keep logs off it.
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish()
                .try_init()?;
        }
    };

    Ok(guard)
}
