// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Append-only log file fed through an in-memory queue.
//!
//! Producers never wait on disk. [`LogSink::log`] pushes a record and, when no
//! drain is running, spawns one. The drain takes the whole queue per cycle,
//! appends it with a single write and re-checks the queue before going idle,
//! so records logged mid-write are picked up by the same task.
//!
//! The drain reports its own failures on stderr rather than through
//! `tracing`, because every tracing event is routed back into this sink.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::Notify;

/// Rotation threshold used when none is configured.
pub const DEFAULT_MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Failures.
    Error,
    /// Recoverable problems.
    Warn,
    /// Lifecycle events.
    Info,
    /// Diagnostics.
    Debug,
}

impl LogLevel {
    /// Upper-case label written to the file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single queued entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Enqueue time.
    pub timestamp: DateTime<Utc>,
    /// Structured context, serialized after the message.
    pub context: Option<Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>, context: Option<Value>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            context,
        }
    }

    /// Renders the record as one log line, without the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} [{:<5}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        );
        if let Some(context) = &self.context {
            let _ = write!(line, " {context}");
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Idle,
    Draining,
}

#[derive(Debug)]
struct Queue {
    records: Vec<LogRecord>,
    state: DrainState,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    max_bytes: u64,
    runtime: Handle,
    queue: Mutex<Queue>,
    idle: Notify,
    cycles: AtomicU64,
}

/// Cloneable handle to the shared log queue.
#[derive(Debug, Clone)]
pub struct LogSink {
    inner: Arc<Inner>,
}

impl LogSink {
    /// Creates a sink writing to `path`, rotating once the file grows past
    /// `max_bytes`. Drain tasks are spawned on `runtime`.
    #[must_use]
    pub fn new(path: PathBuf, max_bytes: u64, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                path,
                max_bytes,
                runtime,
                queue: Mutex::new(Queue {
                    records: Vec::new(),
                    state: DrainState::Idle,
                }),
                idle: Notify::new(),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    /// Path of the live log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Enqueues a record. Never blocks on I/O.
    pub fn log(&self, record: LogRecord) {
        let start_drain = {
            let mut queue = self.inner.lock();
            queue.records.push(record);
            if queue.state == DrainState::Idle {
                queue.state = DrainState::Draining;
                true
            } else {
                false
            }
        };

        if start_drain {
            let inner = self.inner.clone();
            self.inner.runtime.spawn(inner.drain());
        }
    }

    /// Logs at error level.
    #[cfg(test)]
    pub(crate) fn error(&self, message: impl Into<String>, context: Option<Value>) {
        self.log(LogRecord::new(LogLevel::Error, message, context));
    }

    /// Logs at warn level.
    #[cfg(test)]
    pub(crate) fn warn(&self, message: impl Into<String>, context: Option<Value>) {
        self.log(LogRecord::new(LogLevel::Warn, message, context));
    }

    /// Logs at info level.
    #[cfg(test)]
    pub(crate) fn info(&self, message: impl Into<String>, context: Option<Value>) {
        self.log(LogRecord::new(LogLevel::Info, message, context));
    }

    /// Logs at debug level.
    #[cfg(test)]
    pub(crate) fn debug(&self, message: impl Into<String>, context: Option<Value>) {
        self.log(LogRecord::new(LogLevel::Debug, message, context));
    }

    /// Number of completed write cycles since creation.
    #[must_use]
    pub fn drain_cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::Acquire)
    }

    /// Waits until every record logged so far has been written (or its write
    /// has failed) and the sink is idle.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let queue = self.inner.lock();
                if queue.state == DrainState::Idle && queue.records.is_empty() {
                    return;
                }
            }

            notified.await;
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Records are plain data, so a poisoned queue is still usable.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let batch = {
                let mut queue = self.lock();
                if queue.records.is_empty() {
                    queue.state = DrainState::Idle;
                    drop(queue);
                    self.idle.notify_waiters();
                    return;
                }
                std::mem::take(&mut queue.records)
            };

            let mut data = String::new();
            for record in &batch {
                data.push_str(&record.to_line());
                data.push('\n');
            }

            if let Err(e) = self.append(data.as_bytes()).await {
                report(&format!("Failed to write log: {e}"));
            } else if let Err(e) = self.rotate_if_needed().await {
                report(&format!("Failed to rotate log file: {e}"));
            }

            self.cycles.fetch_add(1, Ordering::AcqRel);
        }
    }

    async fn append(&self, data: &[u8]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(data).await?;
        file.flush().await
    }

    async fn rotate_if_needed(&self) -> std::io::Result<()> {
        let size = tokio::fs::metadata(&self.path).await?.len();
        if size <= self.max_bytes {
            return Ok(());
        }

        let mut backup = self.path.clone().into_os_string();
        backup.push(".old");
        tokio::fs::copy(&self.path, PathBuf::from(backup)).await?;
        tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        Ok(())
    }
}

#[allow(
    clippy::print_stderr,
    reason = "Sink failures cannot be routed back through tracing"
)]
fn report(message: &str) {
    eprintln!("{message}");
}
