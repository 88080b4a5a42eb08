// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Persistent application log.

/// Tracing layer feeding the sink.
pub mod layer;
/// Queue and drain state machine.
pub mod sink;

pub use layer::SinkLayer;
pub use sink::{DEFAULT_MAX_LOG_BYTES, LogLevel, LogRecord, LogSink};
