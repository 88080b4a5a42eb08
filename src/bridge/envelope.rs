// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Request and response envelopes exchanged with the UI process.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// A request as seen by the mediation layer.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Correlation token echoed on the response.
    pub id: String,
    /// Instant the request was received.
    pub timestamp: DateTime<Utc>,
    /// Operation name, e.g. `fs:readFile`.
    pub channel: String,
    /// Operation-specific data; `null` when the operation takes none.
    pub payload: Value,
}

impl RequestEnvelope {
    /// Stamps a request received now. A missing id is replaced by a fresh
    /// UUID.
    #[must_use]
    pub fn new(id: Option<String>, channel: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.unwrap_or_else(fresh_id),
            timestamp: Utc::now(),
            channel: channel.into(),
            payload,
        }
    }
}

/// Outcome carried by a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Operation result.
    Success(Value),
    /// Message safe to show the UI.
    Failure(String),
}

/// A response as written back to the UI process.
///
/// Serializes as `{id, timestamp, success, data}` or
/// `{id, timestamp, success, error}`; never both fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// Echo of the request id.
    pub id: String,
    /// Instant the request was received.
    pub timestamp: DateTime<Utc>,
    /// Result or error message.
    pub outcome: Outcome,
}

impl ResponseEnvelope {
    /// A successful response to `request`.
    #[must_use]
    pub fn success(request: &RequestEnvelope, data: Value) -> Self {
        Self {
            id: request.id.clone(),
            timestamp: request.timestamp,
            outcome: Outcome::Success(data),
        }
    }

    /// A failed response to `request`.
    #[must_use]
    pub fn failure(request: &RequestEnvelope, message: impl Into<String>) -> Self {
        Self {
            id: request.id.clone(),
            timestamp: request.timestamp,
            outcome: Outcome::Failure(message.into()),
        }
    }

    /// A failure for input that never became a request (e.g. an unparseable
    /// frame).
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            timestamp: Utc::now(),
            outcome: Outcome::Failure(message.into()),
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Result data, if successful.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    /// Error message, if failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseEnvelope", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("success", &self.is_success())?;
        match &self.outcome {
            Outcome::Success(data) => state.serialize_field("data", data)?,
            Outcome::Failure(message) => state.serialize_field("error", message)?,
        }
        state.end()
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_success_has_data_only() -> Result<()> {
        let request = RequestEnvelope::new(Some("req-7".into()), "fs:readFile", Value::Null);
        let response = ResponseEnvelope::success(&request, json!("hello"));

        let value = serde_json::to_value(&response)?;
        assert_eq!(value["id"], "req-7");
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], "hello");
        assert!(value.get("error").is_none());
        assert!(value["timestamp"].is_string());
        Ok(())
    }

    #[test]
    fn test_failure_has_error_only() -> Result<()> {
        let request = RequestEnvelope::new(None, "fs:readFile", Value::Null);
        let response = ResponseEnvelope::failure(&request, "Invalid file path");

        let value = serde_json::to_value(&response)?;
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Invalid file path");
        assert!(value.get("data").is_none());
        assert_eq!(value["id"], request.id.as_str());
        Ok(())
    }

    #[test]
    fn test_unit_result_serializes_null_data() -> Result<()> {
        let request = RequestEnvelope::new(None, "project:close", Value::Null);
        let value = serde_json::to_value(ResponseEnvelope::success(&request, Value::Null))?;
        assert_eq!(value.get("data"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_generated_ids_are_unique_uuids() -> Result<()> {
        let a = RequestEnvelope::new(None, "x", Value::Null);
        let b = RequestEnvelope::new(None, "x", Value::Null);
        assert_ne!(a.id, b.id);
        Uuid::parse_str(&a.id)?;
        Uuid::parse_str(&ResponseEnvelope::rejected("bad frame").id)?;
        Ok(())
    }
}
