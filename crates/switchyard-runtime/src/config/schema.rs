//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_framework::DispatchOptions;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchyardConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Invocation host settings.
    #[serde(default)]
    pub runtime: HostConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log level `{s}`"))
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// One JSON object per line. Needs the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    /// Default, so stdout stays free for JSON-lines replies.
    #[default]
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for every target, one of `trace`, `debug`, `info`,
    /// `warn`, `error`.
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Per-target overrides, e.g. `switchyard_framework = "debug"`.
    pub filters: BTreeMap<String, String>,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include source file and line.
    pub file_location: bool,
    /// Log file, used when `output = "file"`.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.to_string(),
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            filters: BTreeMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// The parsed base level, `info` when it does not parse.
    pub fn base_level(&self) -> LogLevel {
        self.level.parse().unwrap_or_default()
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// What the host does with a queue batch that matched no trigger route.
///
/// Other kinds have no per-record reply and stay a not-found failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnroutedBatch {
    /// Acknowledge the batch with an empty failure report.
    #[default]
    Drop,
    /// Report every record as failed so the provider redelivers them.
    Retry,
}

/// Dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub recover_panics: bool,
    pub expose_error_details: bool,
    pub trace_routes: bool,
    /// Deadline given to each invocation that does not bring its own.
    pub default_timeout_ms: u64,
    pub unrouted_batch: UnroutedBatch,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let options = DispatchOptions::default();
        Self {
            recover_panics: options.recover_panics,
            expose_error_details: options.expose_error_details,
            trace_routes: options.trace_routes,
            default_timeout_ms: 30_000,
            unrouted_batch: UnroutedBatch::Drop,
        }
    }
}

impl DispatchConfig {
    /// The options an [`App`](switchyard_framework::App) is created with.
    pub fn options(&self) -> DispatchOptions {
        DispatchOptions {
            recover_panics: self.recover_panics,
            trace_routes: self.trace_routes,
            expose_error_details: self.expose_error_details,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

// =============================================================================
// Host
// =============================================================================

/// JSON-lines host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Longest accepted input line; longer lines are rejected and skipped.
    pub max_line_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 6 * 1024 * 1024,
        }
    }
}
