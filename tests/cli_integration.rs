// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for the administration subcommands and configuration
//! layering.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn host(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vibeide-host"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd.env("XDG_CONFIG_HOME", data_dir);
    cmd.env_remove("VIBEIDE_DATA_DIR");
    cmd
}

fn run(cmd: &mut Command) -> Result<String> {
    let Output {
        status,
        stdout,
        stderr,
    } = cmd.output().context("Failed to run vibeide-host")?;
    if !status.success() {
        return Err(anyhow!(
            "vibeide-host failed ({status}): {}",
            String::from_utf8_lossy(&stderr)
        ));
    }
    String::from_utf8(stdout).context("stdout is not UTF-8")
}

#[test]
fn test_settings_subcommands() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;

    let font = run(host(dir.path()).args(["settings", "get", "editor.fontSize"]))?;
    assert_eq!(font.trim(), "14");

    run(host(dir.path()).args(["settings", "set", "editor.fontFamily", "Fira Code"]))?;
    run(host(dir.path()).args([
        "settings",
        "set",
        "ai.providers.local",
        r#"{"url":"http://localhost"}"#,
    ]))?;

    let family = run(host(dir.path()).args(["settings", "get", "editor.fontFamily"]))?;
    assert_eq!(family.trim(), "\"Fira Code\"");

    let shown: Value = serde_json::from_str(&run(host(dir.path()).args(["settings", "show"]))?)?;
    assert_eq!(shown["ai"]["providers"]["local"]["url"], "http://localhost");

    let missing = run(host(dir.path()).args(["settings", "get", "editor.nothing"]))?;
    assert_eq!(missing.trim(), "undefined");

    run(host(dir.path()).args(["settings", "reset"]))?;
    let shown: Value = serde_json::from_str(&run(host(dir.path()).args(["settings", "show"]))?)?;
    assert!(shown["ai"]["providers"].get("local").is_none());
    Ok(())
}

#[test]
fn test_settings_rejects_empty_key_segment() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;
    let output = host(dir.path())
        .args(["settings", "set", "editor..fontSize", "3"])
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_environment_defaults_from_config_file() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;
    let config = dir.path().join("host.toml");
    std::fs::write(&config, "[window]\nwidth = 1024\n\n[terminal]\nshell = \"zsh\"\n")?;

    let width = run(host(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["settings", "get", "window.width"]))?;
    assert_eq!(width.trim(), "1024");

    let shell = run(host(dir.path())
        .env("VIBEIDE_TERMINAL__SHELL", "fish")
        .args(["settings", "get", "terminal.shell"]))?;
    // The document was created by the previous run, so stored values win.
    assert_eq!(shell.trim(), "\"zsh\"");
    Ok(())
}

#[test]
fn test_environment_variable_overrides() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;
    let shell = run(host(dir.path())
        .env("VIBEIDE_TERMINAL__SHELL", "fish")
        .args(["settings", "get", "terminal.shell"]))?;
    assert_eq!(shell.trim(), "\"fish\"");
    Ok(())
}

#[test]
fn test_check_path() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;

    let denied = run(host(dir.path()).args(["check-path", "/etc/passwd"]))?;
    assert!(denied.starts_with("denied:"), "{denied}");

    let traversal = run(host(dir.path()).args(["check-path", "src/../../outside"]))?;
    assert!(traversal.starts_with("denied:"), "{traversal}");

    let allowed = run(host(dir.path()).arg("check-path").arg(dir.path().join("notes.md")))?;
    assert!(allowed.starts_with("allowed:"), "{allowed}");
    Ok(())
}

#[test]
fn test_version_flag() -> Result<()> {
    let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR"))?;
    let version = run(host(dir.path()).arg("--version"))?;
    assert!(version.starts_with("vibeide-host "), "{version}");
    Ok(())
}
