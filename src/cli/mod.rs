//! CLI subcommands and config resolution.

pub mod args;
pub mod classify;
pub mod edit;
pub mod render;

pub use args::{Cli, Commands, CoprocessArgs};

use anyhow::{Context, Result};
use chromapipe::{HighlighterConfig, log};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `-C` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chromapipe.toml";

/// Build the highlighter config: file, then CLI overrides, then defaults.
pub fn load_config(cli: &Cli, coprocess: &CoprocessArgs) -> Result<HighlighterConfig> {
    let mut config = match &cli.config {
        Some(path) => HighlighterConfig::load(path)
            .with_context(|| format!("failed to load `{}`", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            HighlighterConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("failed to load `{DEFAULT_CONFIG_FILE}`"))?
        }
        None => HighlighterConfig::default(),
    };

    if let Some(timeout) = cli.timeout {
        config.timeout_ms = timeout;
    }
    if let Some(window) = cli.window {
        config.window = window;
    }
    if !coprocess.command.is_empty() {
        config.command = coprocess.command.clone();
    }
    if config.command.is_empty() {
        config.command = builtin_coprocess()?;
    }

    check_program(&config.command[0]);
    config.validate()?;
    Ok(config)
}

/// This executable's own `classify` subcommand.
fn builtin_coprocess() -> Result<Vec<String>> {
    let exe = std::env::current_exe().context("failed to locate chromapipe executable")?;
    Ok(vec![exe.display().to_string(), "classify".into()])
}

/// Warn early about a program that is not on `PATH`. The watcher keeps
/// retrying regardless, so this is advisory only.
fn check_program(program: &str) {
    let path = PathBuf::from(program);
    let found = if path.components().count() > 1 {
        path.exists()
    } else {
        which::which(program).is_ok()
    };
    if !found {
        log!("config"; "coprocess `{}` not found, will keep retrying", program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::parse_from([
            "chromapipe",
            "-C",
            "/nonexistent/chromapipe.toml",
            "edit",
        ]);
        assert!(load_config(&cli, &CoprocessArgs::default()).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[coprocess]\ncommand = [\"cat\"]\ntimeout_ms = 100\n",
        )
        .unwrap();

        let path_arg = path.display().to_string();
        let cli = Cli::parse_from([
            "chromapipe",
            "-C",
            path_arg.as_str(),
            "--window",
            "64",
            "edit",
        ]);
        let config = load_config(&cli, &CoprocessArgs::default()).unwrap();
        assert_eq!(config.command, vec!["cat"]);
        assert_eq!(config.timeout_ms, 100);
        assert_eq!(config.window, 64);

        let coprocess = CoprocessArgs {
            command: vec!["./highlight".into()],
        };
        let config = load_config(&cli, &coprocess).unwrap();
        assert_eq!(config.command, vec!["./highlight"]);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[coprocess]\ncommand = [\"cat\"]\n").unwrap();

        let path_arg = path.display().to_string();
        let cli = Cli::parse_from([
            "chromapipe",
            "-C",
            path_arg.as_str(),
            "--window",
            "0",
            "edit",
        ]);
        assert!(load_config(&cli, &CoprocessArgs::default()).is_err());
    }
}
