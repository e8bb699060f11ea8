//! Structured Logger
//!
//! Leveled, dual-sink logging: every emitted entry is written as a single
//! line to the console and appended to a per-run file under the logs
//! directory (`test-<YYYY-MM-DD>.log`).
//!
//! The logger is an explicit handle (`Arc<Logger>`) passed to every
//! component at construction. Each handle owns its own `tracing` dispatcher:
//! a reloadable level filter, a console `fmt` layer, a `tracing-appender`
//! file layer and an in-memory history layer. Sink failures are reported on
//! stderr and never propagate to the caller.

use crate::result::{ProbeError, ProbeResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, reload, Registry};

const LOG_TARGET: &str = "authprobe";

/// Default number of entries retained in memory
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// Log severity, ordered `Debug < Info < Warn < Error`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Step-by-step interaction detail
    Debug,
    /// Normal progress
    #[default]
    Info,
    /// Degraded but non-fatal conditions
    Warn,
    /// Failures
    Error,
}

impl LogLevel {
    /// All levels in ascending severity
    pub const ALL: [Self; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Upper-case tag used in log lines
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn from_tracing(level: Level) -> Self {
        if level == Level::ERROR {
            Self::Error
        } else if level == Level::WARN {
            Self::Warn
        } else if level == Level::INFO {
            Self::Info
        } else {
            Self::Debug
        }
    }

    const fn filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            other => Err(ProbeError::config(format!(
                "unknown log level '{other}' (expected DEBUG, INFO, WARN or ERROR)"
            ))),
        }
    }
}

/// A single emitted log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Optional structured payload
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    #[must_use]
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
        }
    }

    /// Render as `[timestamp] [LEVEL] message | data`
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "[{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        );
        if let Some(data) = &self.data {
            line.push_str(" | ");
            line.push_str(&data.to_string());
        }
        line
    }
}

/// Logger construction options
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level that is emitted
    pub level: LogLevel,
    /// Directory holding the per-run log file
    pub logs_dir: PathBuf,
    /// Write lines to stdout
    pub console: bool,
    /// Append lines to the log file
    pub file: bool,
    /// Number of recent entries kept in memory
    pub history_limit: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            logs_dir: PathBuf::from("./logs"),
            console: true,
            file: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl LoggerConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the logs directory
    #[must_use]
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = dir.into();
        self
    }

    /// Enable or disable the console sink
    #[must_use]
    pub const fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Enable or disable the file sink
    #[must_use]
    pub const fn with_file(mut self, enabled: bool) -> Self {
        self.file = enabled;
        self
    }
}

/// Path of the log file for a run started on `date`
#[must_use]
pub fn log_file_path(logs_dir: &Path, date: chrono::NaiveDate) -> PathBuf {
    logs_dir.join(format!("test-{}.log", date.format("%Y-%m-%d")))
}

/// Leveled dual-sink logger
pub struct Logger {
    dispatch: Dispatch,
    level: reload::Handle<LevelFilter, Registry>,
    file_path: Option<PathBuf>,
    history: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Logger {
    /// Create a logger, creating the logs directory and opening the log file.
    ///
    /// A directory or file that cannot be opened disables the file sink and
    /// is reported on stderr; construction itself never fails.
    #[must_use]
    pub fn new(config: LoggerConfig) -> Self {
        let (appender, file_path) = if config.file {
            let path = log_file_path(&config.logs_dir, Utc::now().date_naive());
            match open_appender(&config.logs_dir, &path) {
                Ok(appender) => (Some(appender), Some(path)),
                Err(message) => {
                    report_sink_failure(&format!(
                        "Error opening log file {}: {message}",
                        path.display()
                    ));
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let (filter, level) = reload::Layer::new(config.level.filter());
        let console = config.console.then(|| {
            fmt::layer()
                .event_format(LineFormat)
                .with_writer(std::io::stdout)
                .with_ansi(console::colors_enabled())
        });
        let file = appender.map(|appender| {
            fmt::layer()
                .event_format(LineFormat)
                .with_writer(appender)
                .with_ansi(false)
        });
        let history = Arc::new(Mutex::new(VecDeque::new()));
        let subscriber = Registry::default()
            .with(filter)
            .with(console)
            .with(file)
            .with(HistoryLayer {
                entries: Arc::clone(&history),
                limit: config.history_limit,
            });

        Self {
            dispatch: Dispatch::new(subscriber),
            level,
            file_path,
            history,
        }
    }

    /// Logger that only keeps entries in memory (no console, no file)
    #[must_use]
    pub fn in_memory(level: LogLevel) -> Self {
        Self::new(
            LoggerConfig::new()
                .with_level(level)
                .with_console(false)
                .with_file(false),
        )
    }

    /// Current minimum level
    #[must_use]
    pub fn level(&self) -> LogLevel {
        let filter = self.level.with_current(|f| *f).unwrap_or(LevelFilter::INFO);
        filter
            .into_level()
            .map_or(LogLevel::Error, LogLevel::from_tracing)
    }

    /// Change the minimum level
    pub fn set_level(&self, level: LogLevel) {
        if let Err(e) = self.level.reload(level.filter()) {
            report_sink_failure(&format!("Error changing log level: {e}"));
        }
    }

    /// Whether a call at `level` would be emitted
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// Path of the open log file, if the file sink is active
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Emit an entry if `level` passes the filter
    pub fn log(&self, level: LogLevel, message: &str, data: Option<serde_json::Value>) {
        if !self.enabled(level) {
            return;
        }
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        let data = data.as_str();
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Debug => tracing::event!(target: LOG_TARGET, Level::DEBUG, data, "{message}"),
            LogLevel::Info => tracing::event!(target: LOG_TARGET, Level::INFO, data, "{message}"),
            LogLevel::Warn => tracing::event!(target: LOG_TARGET, Level::WARN, data, "{message}"),
            LogLevel::Error => tracing::event!(target: LOG_TARGET, Level::ERROR, data, "{message}"),
        });
    }

    /// Log at DEBUG
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message.as_ref(), None);
    }

    /// Log at INFO
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message.as_ref(), None);
    }

    /// Log at WARN
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message.as_ref(), None);
    }

    /// Log at ERROR
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message.as_ref(), None);
    }

    /// Log at DEBUG with structured data
    pub fn debug_with(&self, message: impl AsRef<str>, data: serde_json::Value) {
        self.log(LogLevel::Debug, message.as_ref(), Some(data));
    }

    /// Log at INFO with structured data
    pub fn info_with(&self, message: impl AsRef<str>, data: serde_json::Value) {
        self.log(LogLevel::Info, message.as_ref(), Some(data));
    }

    /// Log at WARN with structured data
    pub fn warn_with(&self, message: impl AsRef<str>, data: serde_json::Value) {
        self.log(LogLevel::Warn, message.as_ref(), Some(data));
    }

    /// Log at ERROR with structured data
    pub fn error_with(&self, message: impl AsRef<str>, data: serde_json::Value) {
        self.log(LogLevel::Error, message.as_ref(), Some(data));
    }

    /// Snapshot of retained entries, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.history).iter().cloned().collect()
    }

    /// Retained entries at exactly `level`
    #[must_use]
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        lock(&self.history)
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Whether any retained entry at `level` contains `needle`
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        lock(&self.history)
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Flush pending output. The file appender writes through, so this only
    /// exists for callers that want an explicit sync point.
    pub fn flush(&self) -> ProbeResult<()> {
        std::io::Write::flush(&mut std::io::stdout())?;
        Ok(())
    }
}

fn open_appender(dir: &Path, path: &Path) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(stem)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| e.to_string())
}

fn report_sink_failure(message: &str) {
    let _ = console::Term::stderr().write_line(message);
}

fn style_line(level: LogLevel, line: &str) -> String {
    let line = console::style(line).force_styling(true);
    let styled = match level {
        LogLevel::Debug => line.dim(),
        LogLevel::Info => line,
        LogLevel::Warn => line.yellow(),
        LogLevel::Error => line.red(),
    };
    styled.to_string()
}

// =============================================================================
// TRACING PLUMBING
// =============================================================================

/// Pulls `message` and `data` back out of an emitted event
#[derive(Default)]
struct EntryVisitor {
    message: String,
    data: Option<serde_json::Value>,
}

impl EntryVisitor {
    fn entry(event: &Event<'_>) -> LogEntry {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        LogEntry::new(
            LogLevel::from_tracing(*event.metadata().level()),
            visitor.message,
            visitor.data,
        )
    }
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "data" if !value.is_empty() => {
                self.data = Some(
                    serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.to_string())),
                );
            }
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        }
    }
}

/// Renders events as `[timestamp] [LEVEL] message | data`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let entry = EntryVisitor::entry(event);
        let line = entry.to_line();
        if writer.has_ansi_escapes() {
            writeln!(writer, "{}", style_line(entry.level, &line))
        } else {
            writeln!(writer, "{line}")
        }
    }
}

/// Keeps the most recent entries for inspection
struct HistoryLayer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    limit: usize,
}

impl<S: Subscriber> Layer<S> for HistoryLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.limit == 0 {
            return;
        }
        let entry = EntryVisitor::entry(event);
        let mut entries = lock(&self.entries);
        while entries.len() >= self.limit {
            let _ = entries.pop_front();
        }
        entries.push_back(entry);
    }
}
