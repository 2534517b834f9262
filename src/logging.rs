/// Structured logging for the weather-alert enrichment service
///
/// Thin layer over `tracing`: every event carries a `source` tag naming the
/// stage or data source, plus an optional `subject` (alert id, organization
/// id, region code). Console output goes to stderr; an optional log file
/// receives the same events without ANSI colouring.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt as tfmt, prelude::*, EnvFilter, Layer};

use crate::report::RunReport;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// api.weather.gov alert feed
    Nws,
    /// Organization table
    Orgs,
    /// Zone table and zone resolution
    Zones,
    Match,
    Pipeline,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Nws => write!(f, "NWS"),
            DataSource::Orgs => write!(f, "ORGS"),
            DataSource::Zones => write!(f, "ZONES"),
            DataSource::Match => write!(f, "MATCH"),
            DataSource::Pipeline => write!(f, "PIPELINE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. the service asked us to back off
    Expected,
    /// Unexpected failure - service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Installs the global subscriber. `RUST_LOG`, when set, wins over
/// `min_level`. Calling this twice keeps the first subscriber.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let console = tfmt::layer().with_writer(std::io::stderr).with_target(false);
    let console = if console_timestamps {
        console.boxed()
    } else {
        console.without_time().boxed()
    };

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
}

/// Subscriber for unit and integration tests; output is captured by the
/// test harness.
pub fn init_test() {
    let _ = tfmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

macro_rules! emit {
    ($level:expr, $source:expr, $subject:expr, $message:expr) => {
        match $subject {
            Some(subject) => tracing::event!(
                $level,
                source = %$source,
                subject = subject,
                "{}",
                $message
            ),
            None => tracing::event!($level, source = %$source, "{}", $message),
        }
    };
}

/// Log a general informational message
pub fn info(source: DataSource, subject: Option<&str>, message: &str) {
    emit!(tracing::Level::INFO, source, subject, message);
}

/// Log a warning message
pub fn warn(source: DataSource, subject: Option<&str>, message: &str) {
    emit!(tracing::Level::WARN, source, subject, message);
}

/// Log an error message
pub fn error(source: DataSource, subject: Option<&str>, message: &str) {
    emit!(tracing::Level::ERROR, source, subject, message);
}

/// Log a debug message
pub fn debug(source: DataSource, subject: Option<&str>, message: &str) {
    emit!(tracing::Level::DEBUG, source, subject, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an alert-source failure from its error message
pub fn classify_fetch_failure(error_message: &str) -> FailureType {
    // 429: api.weather.gov rate limiting, retry later
    if error_message.contains("HTTP error: 429") {
        FailureType::Expected
    }
    // Other HTTP errors indicate service issues
    else if error_message.contains("HTTP error") {
        FailureType::Unexpected
    }
    // Parse errors suggest API changes or a proxy error page
    else if error_message.contains("Parse error") {
        FailureType::Unexpected
    }
    else {
        FailureType::Unknown
    }
}

/// Log an alert-source failure with automatic classification
pub fn log_fetch_failure(source: DataSource, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_fetch_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(source, None, &message),
        FailureType::Unexpected => error(source, None, &message),
        FailureType::Unknown => warn(source, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one enrichment run
pub fn log_run_summary(report: &RunReport) {
    let message = format!(
        "Enrichment complete: {}/{} organizations matched, {} alerts considered ({} malformed, {} duplicate, {} unmatched by zone, {} dropped)",
        report.organizations_matched,
        report.organizations_total,
        report.alerts_considered,
        report.alerts_malformed,
        report.alerts_duplicate,
        report.alerts_unmatched_by_zone,
        report.alerts_dropped,
    );

    if report.alerts_malformed == 0 {
        info(DataSource::Pipeline, None, &message);
    } else if report.alerts_considered == 0 {
        error(DataSource::Pipeline, None, &message);
    } else {
        warn(DataSource::Pipeline, None, &message);
    }
}
