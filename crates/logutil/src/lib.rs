//! Utilities for logging.

use tracing::Level;
use tracing::subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Log level derived from a `-v` style counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Info,
    Debug,
    Trace,
}

impl From<u8> for Verbosity {
    fn from(value: u8) -> Self {
        match value {
            0 => Verbosity::Info,
            1 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }
}

impl From<Verbosity> for Level {
    fn from(value: Verbosity) -> Self {
        match value {
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

/// Initialize a global tracing subscriber.
///
/// `RUST_LOG` directives are honored on top of the level derived from
/// `verbosity`. Calling this more than once is a no-op.
pub fn init(verbosity: impl Into<Verbosity>, mode: LoggingMode) {
    let level: Level = verbosity.into().into();
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(level))
        .with_span_events(FmtSpan::NONE)
        .with_file(true)
        .with_line_number(true);

    // Ignore the error, a subscriber is already set.
    let _ = match mode {
        LoggingMode::Json => subscriber::set_global_default(builder.json().finish()),
        LoggingMode::Pretty => subscriber::set_global_default(builder.pretty().finish()),
        LoggingMode::Compact => subscriber::set_global_default(builder.compact().finish()),
    };
}

/// Initialize a subscriber for tests.
///
/// Output goes through the test writer so it's only shown for failing tests.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_test_writer()
        .finish();
    let _ = subscriber::set_global_default(subscriber);
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}
