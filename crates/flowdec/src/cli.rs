//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "flowdec")]
#[command(about = "Decompiler core diagnostics - flow graphs and SSA from textual IR")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decompile one textual IR file and dump its flow graph
    Dump {
        /// Input textual IR file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Stop after this step (basic_blocks, ssa, pruned, finalize)
        #[arg(long, value_name = "STEP")]
        until: Option<String>,

        /// Entry address (decimal or 0x-prefixed hex)
        #[arg(long, value_name = "EA", default_value = "0", value_parser = parse_ea)]
        entry: u64,

        #[command(flatten)]
        options: RunArgs,
    },
    /// Decompile several textual IR files concurrently
    Batch {
        /// Input textual IR files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Number of worker threads (0 = auto)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        #[command(flatten)]
        options: RunArgs,
    },
}

/// Options shared by every decompiling command.
#[derive(clap::Args, Clone, Copy)]
pub struct RunArgs {
    /// Drop edges to jump targets outside the function instead of failing
    #[arg(long)]
    pub allow_unresolved: bool,

    /// Keep unused merge placeholders
    #[arg(long)]
    pub no_prune: bool,
}

impl RunArgs {
    pub fn config(self) -> flowdec::DecompilerConfig {
        let policy = if self.allow_unresolved {
            flowdec::UnresolvedTargets::Record
        } else {
            flowdec::UnresolvedTargets::Error
        };
        flowdec::DecompilerConfig::new()
            .with_unresolved_targets(policy)
            .with_prune_phis(!self.no_prune)
    }
}

fn parse_ea(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ea() {
        assert_eq!(parse_ea("16"), Ok(16));
        assert_eq!(parse_ea("0x10"), Ok(16));
        assert!(parse_ea("zz").is_err());
    }

    #[test]
    fn test_cli_parses_dump() {
        let cli = Cli::try_parse_from([
            "flowdec",
            "dump",
            "f.ir",
            "--until",
            "ssa",
            "--entry",
            "0x4",
            "--no-prune",
        ])
        .unwrap();
        let Commands::Dump {
            until,
            entry,
            options,
            ..
        } = cli.command
        else {
            panic!("expected dump");
        };
        assert_eq!(until.as_deref(), Some("ssa"));
        assert_eq!(entry, 4);
        assert!(!options.config().prune_phis);
    }

    #[test]
    fn test_cli_verbose_conflicts_with_silent() {
        assert!(Cli::try_parse_from(["flowdec", "-v", "-s", "batch", "a.ir"]).is_err());
    }
}
