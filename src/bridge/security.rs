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

//! Path and content policy for privileged file operations.
//!
//! Every request that touches the disk on behalf of the UI process is checked
//! here first. The rules are fixed and the checks are pure, so a denial can be
//! decided before any side effect happens.

use regex::RegexSet;
use std::path::Path;
use std::sync::LazyLock;

/// Operating-system directories that are never readable or writable through
/// the bridge, as `(prefix, case_insensitive)`.
const PROTECTED_PREFIXES: &[(&str, bool)] = &[
    ("/etc/", false),
    ("/usr/", false),
    ("/bin/", false),
    ("/sbin/", false),
    ("/var/", false),
    ("C:\\Windows\\", true),
    ("C:\\Program Files\\", true),
    ("C:\\Program Files (x86)\\", true),
];

/// Extensions whose content can be rendered by a web view.
const WEB_EXTENSIONS: &[&str] = &["html", "htm", "xml", "svg"];

/// Patterns that signal script injection in web-renderable content.
const INJECTION_PATTERNS: &[&str] = &[
    r"(?i)<script[^>]*>",
    r"(?i)javascript:",
    r"(?i)vbscript:",
    r"(?i)data:text/html",
    r#"(?i)(?:^|[\s/"'<])on[a-z]+\s*="#,
];

/// `None` only if the fixed pattern table fails to compile; content checks
/// then fail closed.
static INJECTION_SET: LazyLock<Option<RegexSet>> =
    LazyLock::new(|| RegexSet::new(INJECTION_PATTERNS).ok());

/// Stateless security policy consulted by every privileged operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityPolicy;

impl SecurityPolicy {
    /// Creates the policy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns `false` for paths containing `..` or `~`, and for paths inside
    /// (or equal to) a protected system directory.
    #[must_use]
    pub fn is_path_safe(&self, path: &Path) -> bool {
        let raw = path.to_string_lossy();

        if raw.contains("..") || raw.contains('~') {
            return false;
        }

        !PROTECTED_PREFIXES
            .iter()
            .any(|&(prefix, case_insensitive)| is_under(&raw, prefix, case_insensitive))
    }

    /// Returns `false` if `extension` is web-renderable and `content` matches
    /// an injection pattern. Any other extension passes unconditionally.
    ///
    /// `extension` may be given with or without its leading dot.
    #[must_use]
    pub fn is_content_safe(&self, content: &str, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        let is_web = WEB_EXTENSIONS
            .iter()
            .any(|web| web.eq_ignore_ascii_case(extension));

        if !is_web {
            return true;
        }

        INJECTION_SET
            .as_ref()
            .is_some_and(|set| !set.is_match(content))
    }
}

/// Prefix test that also treats the bare directory (no trailing separator)
/// as protected.
fn is_under(path: &str, prefix: &str, case_insensitive: bool) -> bool {
    let bare = &prefix[..prefix.len() - 1];
    let starts = |needle: &str| {
        path.get(..needle.len()).is_some_and(|head| {
            if case_insensitive {
                head.eq_ignore_ascii_case(needle)
            } else {
                head == needle
            }
        })
    };

    starts(prefix) || (path.len() == bare.len() && starts(bare))
}
