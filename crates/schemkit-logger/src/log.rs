use crate::severity::LogSeverity;
use crate::time::now;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;

/// Environment variable holding the minimum severity printed by [`ConsoleLogger::from_env`]
pub const LOG_ENV_VAR: &str = "SCHEMKIT_LOG";

static ENV_SEVERITY: Lazy<LogSeverity> = Lazy::new(|| {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LogSeverity::Info)
});

/// Sink for diagnostics. Decoders and encoders receive one of these instead of logging to a
/// process-wide logger.
pub trait Logger {
    fn log(&self, msg: &str, severity: LogSeverity);

    fn debug(&self, msg: &str) {
        self.log(msg, LogSeverity::Debug);
    }

    fn info(&self, msg: &str) {
        self.log(msg, LogSeverity::Info);
    }

    fn warning(&self, msg: &str) {
        self.log(msg, LogSeverity::Warning);
    }

    fn error(&self, msg: &str) {
        self.log(msg, LogSeverity::Error);
    }
}

/// Prints `[SEVERITY] timestamp message` lines to stderr, leaving stdout to command output
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    min_severity: LogSeverity,
}

impl ConsoleLogger {
    pub fn new(min_severity: LogSeverity) -> Self {
        ConsoleLogger { min_severity }
    }

    /// Uses the severity from `SCHEMKIT_LOG`, defaulting to `Info`
    pub fn from_env() -> Self {
        ConsoleLogger::new(*ENV_SEVERITY)
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        ConsoleLogger::from_env()
    }
}

impl ConsoleLogger {
    fn write_record<W: Write>(&self, mut out: W, msg: &str, severity: LogSeverity) {
        if severity >= self.min_severity {
            // A closed stderr has nowhere to report to
            let _ = writeln!(out, "[{}] {} {}", severity, now(), msg);
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str, severity: LogSeverity) {
        self.write_record(io::stderr().lock(), msg, severity);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _msg: &str, _severity: LogSeverity) {}
}

/// Keeps every record in memory, mostly useful in tests
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(LogSeverity, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        MemoryLogger::default()
    }

    pub fn records(&self) -> Vec<(LogSeverity, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages_at(&self, severity: LogSeverity) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, msg)| msg)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, msg: &str, severity: LogSeverity) {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push((severity, msg.to_string()));
    }
}
