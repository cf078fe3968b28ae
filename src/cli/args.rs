//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// chromapipe per-character highlighter CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug logs (watcher phases, restarts, coprocess stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: chromapipe.toml, if present)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Coprocess response timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Maximum bytes sent to the coprocess but not yet colored
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the reference coprocess on stdin/stdout
    Classify {
        /// Enable fault triggers: `T` arms, `F` disarms, armed `S` sleeps 1s, armed `C` crashes
        #[arg(long)]
        faults: bool,
    },

    /// Highlight a file (or stdin) and print it with colored backgrounds
    #[command(visible_alias = "r")]
    Render {
        /// Input file. Reads stdin when omitted.
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: Option<PathBuf>,

        /// Give up waiting for colors after this many milliseconds
        #[arg(long, default_value_t = 10_000)]
        wait: u64,

        #[command(flatten)]
        coprocess: CoprocessArgs,
    },

    /// Interactive single-line editor with live highlighting
    #[command(visible_alias = "e")]
    Edit {
        #[command(flatten)]
        coprocess: CoprocessArgs,
    },
}

/// Coprocess command override shared by Render and Edit.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CoprocessArgs {
    /// Coprocess command line (after `--`). Defaults to `chromapipe classify`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_with_coprocess_override() {
        let cli = Cli::parse_from([
            "chromapipe",
            "--timeout",
            "2000",
            "render",
            "notes.txt",
            "--",
            "./highlight",
            "test",
        ]);

        assert_eq!(cli.timeout, Some(2000));
        let Commands::Render {
            file, coprocess, ..
        } = cli.command
        else {
            panic!("expected render");
        };
        assert_eq!(file, Some(PathBuf::from("notes.txt")));
        assert_eq!(coprocess.command, vec!["./highlight", "test"]);
    }

    #[test]
    fn test_classify_faults_flag() {
        let cli = Cli::parse_from(["chromapipe", "classify", "--faults"]);
        assert!(matches!(cli.command, Commands::Classify { faults: true }));
    }
}
