// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Wire frames read from the UI process.

use serde::Deserialize;
use serde_json::Value;

use crate::bridge::RequestEnvelope;

/// One request line: `{"id"?: string, "channel": string, "data"?: any}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestFrame {
    /// Correlation token chosen by the UI.
    #[serde(default)]
    pub id: Option<String>,
    /// Operation name.
    pub channel: String,
    /// Operation data.
    #[serde(default)]
    pub data: Value,
}

impl RequestFrame {
    /// Stamps the frame as received now.
    #[must_use]
    pub fn into_request(self) -> RequestEnvelope {
        RequestEnvelope::new(self.id, self.channel, self.data)
    }
}
