// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invocation context: ambient state handed to every fresh implementation
//! instance before dispatch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info};

/// Severity of a line written through a [`Logger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    /// Output the step explicitly echoes for its user
    Echo,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Echo => "ECHO",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Destination of step output
pub trait LogSink: Send + Sync + fmt::Debug {
    fn write(&self, level: LogLevel, message: &str);
}

/// Forwards step output to `tracing` under the `stepkit::step` target
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!(target: "stepkit::step", "{}", message),
            LogLevel::Echo => info!(target: "stepkit::step", echo = true, "{}", message),
            LogLevel::Error => error!(target: "stepkit::step", "{}", message),
        }
    }
}

/// Keeps step output in memory; cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl MemorySink {
    /// Captured lines rendered as `LEVEL message`
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|(level, message)| format!("{} {}", level, message))
            .collect()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: LogLevel, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((level, message.to_string()));
    }
}

/// Logger handed to step implementations.
///
/// A cheap handle over a shared sink; there is no process-wide default
/// instance, every invocation receives the one carried by its context.
#[derive(Debug, Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Logger writing to `tracing`
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Logger capturing output in memory, plus a handle to read it back
    pub fn memory() -> (Self, MemorySink) {
        let sink = MemorySink::default();
        (Self::new(sink.clone()), sink)
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.write(LogLevel::Info, message.as_ref());
    }

    pub fn echo(&self, message: impl AsRef<str>) {
        self.sink.write(LogLevel::Echo, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.write(LogLevel::Error, message.as_ref());
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

/// Ambient state for one or more invocations: the logger and the working
/// directory. Owned by the caller and passed by reference.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    logger: Logger,
    current_dir: PathBuf,
}

impl InvocationContext {
    pub fn new(logger: Logger, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            logger,
            current_dir: current_dir.into(),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn set_current_dir(&mut self, current_dir: impl Into<PathBuf>) {
        self.current_dir = current_dir.into();
    }

    /// Resolves a path against the working directory; absolute paths are
    /// returned as is.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(Logger::default(), ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_captures_levels() {
        let (logger, sink) = Logger::memory();
        logger.info("starting");
        logger.echo("Hello, James");
        logger.error("<message> not provided");

        assert_eq!(
            sink.lines(),
            vec![
                "INFO starting",
                "ECHO Hello, James",
                "ERROR <message> not provided"
            ]
        );
    }

    #[test]
    fn test_cloned_logger_shares_sink() {
        let (logger, sink) = Logger::memory();
        let clone = logger.clone();
        clone.echo("from clone");
        assert_eq!(sink.entries(), vec![(LogLevel::Echo, "from clone".to_string())]);
    }

    #[test]
    fn test_default_context() {
        let context = InvocationContext::default();
        assert_eq!(context.current_dir(), Path::new("."));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let mut context = InvocationContext::default();
        context.set_current_dir("/work/project");
        assert_eq!(context.resolve("out.txt"), PathBuf::from("/work/project/out.txt"));
        assert_eq!(context.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_set_logger_replaces_sink() {
        let mut context = InvocationContext::default();
        let (logger, sink) = Logger::memory();
        context.set_logger(logger);
        context.logger().info("routed");
        assert_eq!(sink.lines(), vec!["INFO routed"]);
    }
}
