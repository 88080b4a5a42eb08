// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The currently open project.
//!
//! Opening a directory detects its ecosystem from marker files and takes a
//! shallow listing of the root. Only one project is open at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::files::{FileInfo, list_entries};
use crate::bridge::error::{Denial, ServiceError, ServiceResult};
use crate::bridge::security::SecurityPolicy;

/// Ecosystem detected for a project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKind {
    /// `package.json`
    #[serde(rename = "Node.js/JavaScript")]
    Node,
    /// `Cargo.toml`
    #[serde(rename = "Rust")]
    Rust,
    /// `go.mod`
    #[serde(rename = "Go")]
    Go,
    /// `requirements.txt`
    #[serde(rename = "Python")]
    Python,
    /// `pom.xml`
    #[serde(rename = "Java (Maven)")]
    Maven,
    /// `build.gradle`
    #[serde(rename = "Java (Gradle)")]
    Gradle,
    /// any `*.csproj`
    #[serde(rename = "C#")]
    CSharp,
    /// `Gemfile`
    #[serde(rename = "Ruby")]
    Ruby,
    /// `composer.json`
    #[serde(rename = "PHP")]
    Php,
    /// `src/` and `public/` directories
    #[serde(rename = "React/Frontend")]
    Frontend,
    /// `app/` and `config/` directories
    #[serde(rename = "Rails/Laravel")]
    RailsOrLaravel,
    /// No marker found.
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Marker files checked in priority order.
const MARKER_FILES: &[(&str, ProjectKind)] = &[
    ("package.json", ProjectKind::Node),
    ("Cargo.toml", ProjectKind::Rust),
    ("go.mod", ProjectKind::Go),
    ("requirements.txt", ProjectKind::Python),
    ("pom.xml", ProjectKind::Maven),
    ("build.gradle", ProjectKind::Gradle),
];

/// Checked after `*.csproj`, which is matched by extension.
const LATE_MARKER_FILES: &[(&str, ProjectKind)] = &[
    ("Gemfile", ProjectKind::Ruby),
    ("composer.json", ProjectKind::Php),
];

/// Build output, caches and editor state left out of the project listing.
const LISTING_EXCLUDES: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    "target",
    "__pycache__",
];

/// An opened project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Root directory name.
    pub name: String,
    /// Absolute root path.
    pub path: PathBuf,
    /// Detected ecosystem.
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    /// Shallow listing of the root, directories first.
    pub files: Vec<FileInfo>,
}

/// Holds at most one open project.
#[derive(Debug, Default)]
pub struct ProjectService {
    policy: SecurityPolicy,
    current: RwLock<Option<ProjectInfo>>,
}

impl ProjectService {
    /// Creates a new `ProjectService` with no project open.
    #[must_use]
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            policy,
            current: RwLock::new(None),
        }
    }

    /// Opens `path` as the current project, replacing any open one.
    ///
    /// # Errors
    ///
    /// Returns `PolicyViolation` for unsafe paths, `InvalidRequest` if the
    /// path is empty or not a directory, and `NotFound`/`Io` if it cannot be
    /// read.
    pub async fn open(&self, path: &str) -> ServiceResult<ProjectInfo> {
        if path.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "project path must not be empty".into(),
            ));
        }
        if !self.policy.is_path_safe(Path::new(path)) {
            warn!(path, "Rejected unsafe project path");
            return Err(ServiceError::PolicyViolation(Denial::ProjectPath));
        }

        let root = std::path::absolute(path)
            .map_err(|e| ServiceError::io("Failed to resolve project path", e))?;
        if !self.policy.is_path_safe(&root) {
            warn!(path = %root.display(), "Rejected unsafe project path");
            return Err(ServiceError::PolicyViolation(Denial::ProjectPath));
        }

        info!(path = %root.display(), "Opening project");

        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| ServiceError::io("Failed to open project", e))?;
        if !metadata.is_dir() {
            return Err(ServiceError::InvalidRequest(
                "project path must be a directory".into(),
            ));
        }

        let entries = list_entries(&root).await?;
        let kind = detect_kind(
            entries
                .iter()
                .map(|(name, _, file_type)| (name.as_str(), file_type.is_dir())),
        );

        let mut files = Vec::new();
        for (name, entry_path, file_type) in entries {
            if is_listing_excluded(&name) {
                continue;
            }
            match tokio::fs::metadata(&entry_path).await {
                Ok(metadata) => {
                    files.push(FileInfo::from_metadata(name, entry_path, file_type, &metadata));
                }
                Err(e) => {
                    warn!(path = %entry_path.display(), error = %e, "Failed to get file stats");
                }
            }
        }
        sort_listing(&mut files);

        let project = ProjectInfo {
            name: root
                .file_name()
                .map_or_else(|| root.to_string_lossy(), |n| n.to_string_lossy())
                .into_owned(),
            path: root,
            kind,
            files,
        };

        info!(name = %project.name, kind = ?project.kind, "Project opened");
        *self.current.write().await = Some(project.clone());
        Ok(project)
    }

    /// Closes the current project, if any.
    pub async fn close(&self) {
        if let Some(project) = self.current.write().await.take() {
            info!(name = %project.name, "Closing project");
        }
    }

    /// Returns the current project, if any.
    pub async fn current(&self) -> Option<ProjectInfo> {
        self.current.read().await.clone()
    }
}

/// Detects the ecosystem from the root's `(name, is_dir)` entries.
#[must_use]
pub fn detect_kind<'a>(entries: impl IntoIterator<Item = (&'a str, bool)>) -> ProjectKind {
    let entries: Vec<(&str, bool)> = entries.into_iter().collect();
    let names: HashSet<&str> = entries.iter().map(|(name, _)| *name).collect();

    let marker = |table: &[(&str, ProjectKind)]| {
        table
            .iter()
            .find(|(file, _)| names.contains(file))
            .map(|(_, kind)| *kind)
    };

    if let Some(kind) = marker(MARKER_FILES) {
        return kind;
    }
    if entries.iter().any(|(name, is_dir)| {
        !is_dir
            && Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csproj"))
    }) {
        return ProjectKind::CSharp;
    }
    if let Some(kind) = marker(LATE_MARKER_FILES) {
        return kind;
    }

    let has_dir = |wanted: &str| entries.iter().any(|(name, is_dir)| *is_dir && *name == wanted);
    if has_dir("src") && has_dir("public") {
        ProjectKind::Frontend
    } else if has_dir("app") && has_dir("config") {
        ProjectKind::RailsOrLaravel
    } else {
        ProjectKind::Unknown
    }
}

fn is_listing_excluded(name: &str) -> bool {
    name.starts_with('.')
        || LISTING_EXCLUDES.contains(&name)
        || Path::new(name)
            .extension()
            .is_some_and(|ext| ext == "pyc")
}

/// Directories first, then case-insensitive name order.
fn sort_listing(files: &mut [FileInfo]) {
    files.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}
