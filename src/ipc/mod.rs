// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Line-delimited JSON server over stdin/stdout.
mod server;
/// Wire frame definitions.
mod types;

pub use server::{ChannelHandler, IpcServer};
pub use types::RequestFrame;
