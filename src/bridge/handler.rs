/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Bridge handler that maps UI channel requests to privileged services.

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::envelope::{RequestEnvelope, ResponseEnvelope};
use super::error::{ServiceError, ServiceResult};
use crate::ipc::ChannelHandler;
use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::settings::SettingsStore;
use crate::workspace::{Encoding, FileService, ProjectService};

/// Input for `fs:readFile`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileInput {
    /// Path to the file.
    pub file_path: String,
    /// Content encoding (default: utf8).
    #[serde(default)]
    pub encoding: Encoding,
}

/// Input for `fs:writeFile`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileInput {
    /// Path to the file.
    pub file_path: String,
    /// New file content.
    pub content: String,
    /// Content encoding (default: utf8).
    #[serde(default)]
    pub encoding: Encoding,
}

/// Input for `fs:readDir`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadDirInput {
    /// Directory to list.
    pub dir_path: String,
    /// Descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,
}

/// Input for `project:open`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenProjectInput {
    /// Project root directory.
    pub project_path: String,
}

/// Input for `settings:get` and `settings:set`.
#[derive(Debug, Deserialize)]
pub struct SettingInput {
    /// Dotted key, e.g. `editor.fontSize`.
    pub key: String,
    /// New value; ignored by `settings:get`.
    #[serde(default)]
    pub value: Value,
}

/// Input for the `log:*` channels.
#[derive(Debug, Deserialize)]
pub struct LogInput {
    /// Message text.
    pub message: String,
    /// Structured context.
    #[serde(default)]
    pub context: Option<Value>,
}

/// Every channel the UI process may call.
pub const CHANNELS: &[&str] = &[
    "fs:readFile",
    "fs:writeFile",
    "fs:readDir",
    "project:open",
    "project:close",
    "project:getInfo",
    "settings:get",
    "settings:set",
    "settings:reset",
    "log:error",
    "log:warn",
    "log:info",
    "log:debug",
];

/// The mediation layer: the only entry point into privileged services.
///
/// Each request is answered with exactly one envelope. Service failures are
/// logged with full detail here and reduced to their display message before
/// crossing the process boundary.
#[derive(Debug, Clone)]
pub struct IpcBridgeHandler {
    files: Arc<FileService>,
    projects: Arc<ProjectService>,
    settings: Arc<SettingsStore>,
    sink: LogSink,
}

impl IpcBridgeHandler {
    /// Creates a new `IpcBridgeHandler`.
    pub const fn new(
        files: Arc<FileService>,
        projects: Arc<ProjectService>,
        settings: Arc<SettingsStore>,
        sink: LogSink,
    ) -> Self {
        Self {
            files,
            projects,
            settings,
            sink,
        }
    }

    async fn dispatch(&self, channel: &str, payload: Value) -> ServiceResult<Value> {
        match channel {
            "fs:readFile" => {
                let input: ReadFileInput = parse(channel, payload)?;
                let content = self
                    .files
                    .read_file(&input.file_path, input.encoding)
                    .await?;
                Ok(Value::String(content))
            }
            "fs:writeFile" => {
                let input: WriteFileInput = parse(channel, payload)?;
                self.files
                    .write_file(&input.file_path, &input.content, input.encoding)
                    .await?;
                Ok(Value::Null)
            }
            "fs:readDir" => {
                let input: ReadDirInput = parse(channel, payload)?;
                let entries = self
                    .files
                    .read_directory(&input.dir_path, input.recursive)
                    .await?;
                to_data(&entries)
            }
            "project:open" => {
                let input: OpenProjectInput = parse(channel, payload)?;
                to_data(&self.projects.open(&input.project_path).await?)
            }
            "project:close" => {
                self.projects.close().await;
                Ok(Value::Null)
            }
            "project:getInfo" => to_data(&self.projects.current().await),
            "settings:get" => {
                let input: SettingInput = parse(channel, payload)?;
                to_data(&self.settings.get(&input.key).await?)
            }
            "settings:set" => {
                let input: SettingInput = parse(channel, payload)?;
                self.settings.set(&input.key, input.value).await?;
                Ok(Value::Null)
            }
            "settings:reset" => {
                self.settings.reset().await?;
                Ok(Value::Null)
            }
            "log:error" => self.forward_log(LogLevel::Error, channel, payload),
            "log:warn" => self.forward_log(LogLevel::Warn, channel, payload),
            "log:info" => self.forward_log(LogLevel::Info, channel, payload),
            "log:debug" => self.forward_log(LogLevel::Debug, channel, payload),
            _ => Err(ServiceError::InvalidRequest(format!(
                "unknown channel '{channel}'"
            ))),
        }
    }

    fn forward_log(&self, level: LogLevel, channel: &str, payload: Value) -> ServiceResult<Value> {
        let input: LogInput = parse(channel, payload)?;
        self.sink
            .log(LogRecord::new(level, input.message, input.context));
        Ok(Value::Null)
    }
}

impl ChannelHandler for IpcBridgeHandler {
    /// Runs one request and wraps the result.
    async fn handle(&self, mut request: RequestEnvelope) -> ResponseEnvelope {
        debug!(id = %request.id, channel = %request.channel, "IPC request");

        let payload = std::mem::take(&mut request.payload);
        match self.dispatch(&request.channel, payload).await {
            Ok(data) => {
                debug!(id = %request.id, "IPC response");
                ResponseEnvelope::success(&request, data)
            }
            Err(e) => {
                error!(id = %request.id, channel = %request.channel, error = ?e, "IPC error");
                ResponseEnvelope::failure(&request, e.to_string())
            }
        }
    }
}

fn parse<T: DeserializeOwned>(channel: &str, payload: Value) -> ServiceResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| ServiceError::InvalidRequest(format!("{channel}: {e}")))
}

fn to_data<T: Serialize>(value: &T) -> ServiceResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServiceError::io("Failed to encode response", std::io::Error::other(e)))
}
