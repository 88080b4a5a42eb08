// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Privileged file operations: read, write and directory listing.
//!
//! Every path is checked against the [`SecurityPolicy`] before the disk is
//! touched. Writes also check content, and both checks finish before any
//! directory is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{FileType, Metadata};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, warn};

use super::ignore::{IGNORE_FILE_NAME, IgnorePatterns};
use crate::bridge::error::{Denial, ServiceError, ServiceResult};
use crate::bridge::security::SecurityPolicy;

/// Dependency cache directory that is never listed.
pub const DEPENDENCY_CACHE_DIR: &str = "node_modules";

/// Snapshot of one directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File name without directory.
    pub name: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Whether the entry itself is a directory (symlinks are not).
    pub is_directory: bool,
    /// Size in bytes, following symlinks.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl FileInfo {
    pub(crate) fn from_metadata(
        name: String,
        path: PathBuf,
        file_type: FileType,
        metadata: &Metadata,
    ) -> Self {
        let modified = metadata
            .modified()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::from);
        Self {
            name,
            path,
            is_directory: file_type.is_dir(),
            size: metadata.len(),
            modified,
        }
    }
}

/// Text encodings accepted for file content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Encoding {
    /// UTF-8. Invalid sequences on read are an error.
    #[default]
    #[serde(rename = "utf8", alias = "utf-8")]
    Utf8,
    /// One byte per character, U+0000 to U+00FF.
    #[serde(rename = "latin1", alias = "binary")]
    Latin1,
}

impl Encoding {
    fn decode(self, bytes: Vec<u8>) -> ServiceResult<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).map_err(|e| {
                ServiceError::io(
                    "Failed to read file",
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                )
            }),
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }

    fn encode(self, content: &str) -> ServiceResult<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(content.as_bytes().to_vec()),
            Self::Latin1 => content
                .chars()
                .map(|c| u8::try_from(u32::from(c)))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| {
                    ServiceError::InvalidRequest("content is not representable in latin1".into())
                }),
        }
    }
}

type ScanFuture<'a> = Pin<Box<dyn Future<Output = ServiceResult<()>> + Send + 'a>>;

/// Policy-gated file and directory access.
#[derive(Debug, Clone, Default)]
pub struct FileService {
    policy: SecurityPolicy,
}

impl FileService {
    /// Creates a new `FileService` that checks requests with `policy`.
    #[must_use]
    pub const fn new(policy: SecurityPolicy) -> Self {
        Self { policy }
    }

    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` for unsafe paths, `NotFound`/`Io` for
    /// storage failures and undecodable content.
    pub async fn read_file(&self, path: &str, encoding: Encoding) -> ServiceResult<String> {
        let resolved = self.checked_path(path, Denial::FilePath)?;
        debug!(path = %resolved.display(), ?encoding, "Reading file");

        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| ServiceError::io("Failed to read file", e))?;
        let content = encoding.decode(bytes)?;

        debug!(path = %resolved.display(), size = content.len(), "File read");
        Ok(content)
    }

    /// Writes a whole file, creating parent directories and replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` for unsafe paths or content,
    /// `InvalidRequest` if the content cannot be encoded, and `Io` if the
    /// directories or file cannot be written.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        encoding: Encoding,
    ) -> ServiceResult<()> {
        let resolved = self.checked_path(path, Denial::FilePath)?;

        let extension = resolved
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.policy.is_content_safe(content, &extension) {
            warn!(path = %resolved.display(), "Rejected unsafe content");
            return Err(ServiceError::PolicyViolation(Denial::UnsafeContent));
        }

        let bytes = encoding.encode(content)?;
        debug!(path = %resolved.display(), ?encoding, size = bytes.len(), "Writing file");

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::io("Failed to create parent directories", e))?;
        }

        tokio::fs::write(&resolved, bytes)
            .await
            .map_err(|e| ServiceError::io("Failed to write file", e))?;

        debug!(path = %resolved.display(), "File written");
        Ok(())
    }

    /// Lists a directory, optionally descending into subdirectories.
    ///
    /// Entries come back in name order, pre-order when recursive. Entries
    /// that cannot be stat'ed and subdirectories that cannot be read are
    /// logged and left out.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` for unsafe paths and `NotFound`/`Io` if the
    /// requested directory itself cannot be read.
    pub async fn read_directory(&self, path: &str, recursive: bool) -> ServiceResult<Vec<FileInfo>> {
        let resolved = self.checked_path(path, Denial::DirectoryPath)?;
        debug!(path = %resolved.display(), recursive, "Reading directory");

        let mut files = Vec::new();
        self.scan(&resolved, recursive, &mut files).await?;

        debug!(path = %resolved.display(), count = files.len(), "Directory read");
        Ok(files)
    }

    fn scan<'a>(&'a self, dir: &'a Path, recursive: bool, out: &'a mut Vec<FileInfo>) -> ScanFuture<'a> {
        Box::pin(async move {
            let patterns = IgnorePatterns::load(dir).await;
            let entries = list_entries(dir).await?;

            for (name, path, file_type) in entries {
                if patterns.is_ignored(&name) || is_excluded_name(&name) {
                    continue;
                }

                let metadata = match tokio::fs::metadata(&path).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to get file stats");
                        continue;
                    }
                };

                let descend = recursive && file_type.is_dir();
                out.push(FileInfo::from_metadata(name, path.clone(), file_type, &metadata));

                if descend && let Err(e) = self.scan(&path, true, out).await {
                    warn!(path = %path.display(), error = %e, "Failed to read subdirectory");
                }
            }

            Ok(())
        })
    }

    /// Applies the path rule to the raw input and to its absolute form.
    fn checked_path(&self, raw: &str, denial: Denial) -> ServiceResult<PathBuf> {
        if raw.is_empty() {
            return Err(ServiceError::InvalidRequest("path must not be empty".into()));
        }

        let raw_path = Path::new(raw);
        if !self.policy.is_path_safe(raw_path) {
            warn!(path = raw, "Rejected unsafe path");
            return Err(ServiceError::PolicyViolation(denial));
        }

        let resolved = std::path::absolute(raw_path)
            .map_err(|e| ServiceError::io("Failed to resolve path", e))?;
        if !self.policy.is_path_safe(&resolved) {
            warn!(path = %resolved.display(), "Rejected unsafe path");
            return Err(ServiceError::PolicyViolation(denial));
        }

        Ok(resolved)
    }
}

/// Hidden names (except the ignore file) and the dependency cache.
fn is_excluded_name(name: &str) -> bool {
    (name.starts_with('.') && name != IGNORE_FILE_NAME) || name == DEPENDENCY_CACHE_DIR
}

/// Reads a directory's entries sorted by name. Entries whose name is not
/// UTF-8 or whose type cannot be determined are logged and skipped.
pub(super) async fn list_entries(dir: &Path) -> ServiceResult<Vec<(String, PathBuf, FileType)>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ServiceError::io("Failed to read directory", e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| ServiceError::io("Failed to read directory entry", e))?
    {
        let path = entry.path();
        // Listings go to the UI as JSON strings.
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %path.display(), "Skipping entry with non UTF-8 name");
            continue;
        };
        match entry.file_type().await {
            Ok(file_type) => entries.push((name, path, file_type)),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to get file type"),
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
