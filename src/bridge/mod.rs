// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Request and response envelopes.
pub mod envelope;
/// Error taxonomy for privileged operations.
pub mod error;
/// Maps UI channels to service calls.
mod handler;
/// Path and content rules guarding every operation.
pub mod security;

pub use envelope::{Outcome, RequestEnvelope, ResponseEnvelope};
pub use error::{Denial, ServiceError, ServiceResult};
pub use handler::{CHANNELS, IpcBridgeHandler};
pub use security::SecurityPolicy;
