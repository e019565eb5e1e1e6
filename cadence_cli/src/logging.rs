//! Tracing subscriber setup: console layer plus optional rolling file layer.

use crate::cli::FILE_GUARD;
use cadence_config::Logging;
use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `--log-level`, which wins over `[logging] level`.
/// Console output goes to stderr so stdout stays machine-readable.
pub fn init(json: bool, cli_level: &str, cfg: Option<&Logging>) {
    let level = cfg
        .and_then(|l| l.level.as_deref())
        .filter(|_| cli_level == "info")
        .unwrap_or(cli_level)
        .to_string();
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
            .boxed()
    };

    let file = cfg.and_then(|l| l.file.as_deref()).map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "cadence.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match cfg.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => rolling::daily(dir, name),
            Some("hourly") => rolling::hourly(dir, name),
            _ => rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter())
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
