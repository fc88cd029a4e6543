//! Observability for the frame pipeline.
//!
//! A pipeline that silently degrades (pass-through on a bad expression, dropped
//! dangling bonds) needs its decisions to be visible. Everything here goes
//! through the `log` facade; `init_logging` installs the `env_logger` backend
//! once per process, and the `log_metric!` macro emits structured key/value
//! lines at debug level under the `molvis::metric` target.

use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Once;

use colored::Colorize;
use log::{Level, LevelFilter};

use crate::config::LoggingConfig;
use crate::error::MolvisError;

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use molvis_core::log_metric;
/// let atoms = 3;
/// log_metric!("event" = "pipeline_apply", "atoms" = atoms);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if ::log::log_enabled!(target: "molvis::metric", ::log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            ::log::debug!(target: "molvis::metric", "{{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs the process-wide logger described by `config`.
///
/// Only the first call has any effect; later calls return `Ok(())` without
/// touching the installed logger. Levels are colorized on stderr and left
/// plain when a log file is configured.
pub fn init_logging(config: &LoggingConfig) -> Result<(), MolvisError> {
    let level = LevelFilter::from_str(&config.level).map_err(|_| {
        MolvisError::InvalidParameters(format!("unknown log level '{}'", config.level))
    })?;

    let file = match &config.log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();
        builder.is_test(false);
        builder.filter_level(level);

        let colorize = file.is_none();
        builder.format(move |buf, record| {
            let label = record.level().to_string();
            if colorize {
                writeln!(buf, "[{}] {}", paint(record.level(), &label), record.args())
            } else {
                writeln!(buf, "[{}] {}", label, record.args())
            }
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        if let Err(err) = builder.try_init() {
            log::warn!("keeping the logger that was already installed: {}", err);
        }
    });
    Ok(())
}

fn paint(level: Level, label: &str) -> colored::ColoredString {
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.dimmed(),
    }
}
