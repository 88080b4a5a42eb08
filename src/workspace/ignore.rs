// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Directory-local ignore patterns.
//!
//! Patterns come from a `.gitignore` file in the directory being listed.
//! The matcher deliberately does not follow git's rules: it implements four
//! simple cases (exact, directory suffix, wildcard, path segment) that the
//! UI has always relied on.

use regex::Regex;
use std::path::Path;
use tracing::warn;

/// Name of the pattern file read from each listed directory.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Ordered patterns loaded for a single directory.
#[derive(Debug, Clone, Default)]
pub struct IgnorePatterns {
    patterns: Vec<String>,
}

impl IgnorePatterns {
    /// Parses pattern file contents, dropping blank lines and `#` comments.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let patterns = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { patterns }
    }

    /// Loads the pattern file in `dir`. A missing file yields an empty set.
    /// Unreadable files are logged and also yield an empty set.
    pub async fn load(dir: &Path) -> Self {
        let path = dir.join(IGNORE_FILE_NAME);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read ignore file");
                Self::default()
            }
        }
    }

    /// Returns `true` if any pattern matches `relative_path`.
    #[must_use]
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        let normalized = relative_path.replace('\\', "/");
        self.patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, &normalized))
    }

    /// Number of active patterns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no patterns are active.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Evaluates a single pattern against a `/`-separated relative path.
#[must_use]
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.replace('\\', "/");

    if pattern == path {
        return true;
    }

    if let Some(dir) = pattern.strip_suffix('/') {
        return path == dir
            || path
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'));
    }

    if pattern.contains(['*', '?']) {
        return wildcard_regex(&pattern).is_some_and(|re| re.is_match(path));
    }

    path.starts_with(&format!("{pattern}/"))
        || path.ends_with(&format!("/{pattern}"))
        || path.contains(&format!("/{pattern}/"))
}

/// Anchored regex for a wildcard pattern: `*` is any run of characters,
/// `?` is one character, everything else is literal.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).ok()
}
