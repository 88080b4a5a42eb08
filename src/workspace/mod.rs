// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Policy-gated file reads, writes and directory listings.
pub mod files;
/// `.gitignore`-style pattern matching for listings.
pub mod ignore;
/// The single open project and ecosystem detection.
pub mod project;

pub use files::{Encoding, FileInfo, FileService};
pub use ignore::IgnorePatterns;
pub use project::{ProjectInfo, ProjectKind, ProjectService};
