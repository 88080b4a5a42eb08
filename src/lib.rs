// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! vibeide-host is the privileged back end of the VibeIDE desktop shell.
//!
//! The untrusted UI process spawns it and sends channel requests over stdio.
//! Every request passes the security policy before it reaches the file,
//! project or settings services, and every answer goes back in a uniform
//! envelope.

/// Mediation layer, envelopes, errors and the security policy.
pub mod bridge;
/// Host configuration.
pub mod config;
/// Line-delimited JSON transport.
pub mod ipc;
/// Asynchronous rotating log file and its tracing layer.
pub mod logging;
/// Persistent dotted-key settings.
pub mod settings;
/// File, directory and project services.
pub mod workspace;
