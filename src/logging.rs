//! Structured logging for sqlx-prepare
//!
//! Events carry structured fields so CI logs can be filtered per step.
//!
//! # Log Format Conventions
//!
//! - `step`: pipeline step ("clean", "prepare_dirs", "check", "finalize", "verify")
//! - `command`: the cargo command line being run
//! - `exit_code`: exit code of a finished command
//! - `path`: directory being touched
//! - `file_count` / `size_bytes`: totals for copied query files
//!
//! # Examples
//!
//! ```rust
//! use tracing::info;
//!
//! info!(
//!     step = "finalize",
//!     path = ".sqlx",
//!     file_count = 12,
//!     "prepared query cache written"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter, Layer,
};

/// Prints `<timestamp> LEVEL(sqlx-prepare): <fields>`
struct PrepareFormatter {
    with_ansi: bool,
}

fn level_color(level: &tracing::Level) -> &'static str {
    match *level {
        tracing::Level::ERROR => "\x1b[31m",
        tracing::Level::WARN => "\x1b[33m",
        tracing::Level::INFO => "\x1b[32m",
        tracing::Level::DEBUG => "\x1b[34m",
        tracing::Level::TRACE => "\x1b[35m",
    }
}

impl<S, N> FormatEvent<S, N> for PrepareFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let level = event.metadata().level();
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
        let (open, close) = if self.with_ansi {
            (level_color(level), "\x1b[0m")
        } else {
            ("", "")
        };

        write!(writer, "{timestamp} {open}{level:5}(sqlx-prepare){close}: ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn text_layer<S, W>(with_ansi: bool, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .event_format(PrepareFormatter { with_ansi })
        .with_writer(writer)
}

fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .with_writer(writer)
        .json()
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable with colors
    Pretty,
    /// Plain text for CI
    Compact,
    /// JSON lines for log aggregation
    Json,
}

impl LogFormat {
    /// Parse from `SQLX_PREPARE_LOG_FORMAT`, defaulting on `CI`
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var("SQLX_PREPARE_LOG_FORMAT").ok().as_deref(),
            std::env::var_os("CI").is_some(),
        )
    }

    fn parse(value: Option<&str>, ci: bool) -> Self {
        match value.unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: log level filter (default "info")
/// - `SQLX_PREPARE_LOG_FORMAT`: "pretty", "compact" or "json"
/// - `CI`: if set, defaults to compact format
///
/// Everything goes to stderr so cargo's own output stays readable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match LogFormat::from_env() {
        LogFormat::Json => registry.with(json_layer(io::stderr)).init(),
        text => registry
            .with(text_layer(text == LogFormat::Pretty, io::stderr))
            .init(),
    }
}

/// Standard field names for consistent logging
pub mod fields {
    /// Pipeline step, one of [`super::steps`]
    pub const STEP: &str = "step";
    /// Cargo command line
    pub const COMMAND: &str = "command";
    /// Exit code of a finished command
    pub const EXIT_CODE: &str = "exit_code";
    /// Directory being touched
    pub const PATH: &str = "path";
    /// Number of query files
    pub const FILE_COUNT: &str = "file_count";
    /// Size in bytes
    pub const SIZE_BYTES: &str = "size_bytes";
}

/// Step names used in the `step` field
pub mod steps {
    pub const CLEAN: &str = "clean";
    pub const PREPARE_DIRS: &str = "prepare_dirs";
    pub const CHECK: &str = "check";
    pub const FINALIZE: &str = "finalize";
    pub const VERIFY: &str = "verify";
}
