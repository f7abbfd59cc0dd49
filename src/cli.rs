use chrono::{DateTime, Local};
use clap::{ArgGroup, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "amd-debug-tools",
    about = "Debug tooling for AMD Linux systems - BIOS trace logs, batteries and displays",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable tool debug logging
    #[arg(long, global = true)]
    pub tool_debug: bool,

    /// Use this config file instead of the system and user config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse log for kernel and BIOS messages
    Parse {
        /// Optional input file to parse instead of the running kernel log
        #[arg(long)]
        input: Option<PathBuf>,
        /// Only show messages logged after this RFC 3339 time (running kernel log only)
        #[arg(long, value_parser = parse_since, conflicts_with = "input")]
        since: Option<DateTime<Local>>,
    },

    /// Enable or disable BIOS AML tracing
    #[command(group(ArgGroup::new("mode").required(true).args(["enable", "notify", "disable"])))]
    Trace {
        /// Enable BIOS AML tracing
        #[arg(long)]
        enable: bool,
        /// Enable tracing of ACPI Notify() events instead
        #[arg(long)]
        notify: bool,
        /// Disable tracing and restore the previous ACPI trace parameters
        #[arg(long)]
        disable: bool,
    },

    /// Show batteries, connected displays and the kernel command line
    Hardware {
        /// Output as JSON instead of a formatted table
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (auto-detected if omitted)
        shell: Option<Shell>,
    },
}

fn parse_since(value: &str) -> Result<DateTime<Local>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| format!("expected an RFC 3339 time such as 2025-03-01T12:00:00+01:00: {}", e))
}

/// Print shell completions to stdout.
pub fn print_completions(shell: Option<Shell>) {
    let shell = shell.or_else(Shell::from_env).unwrap_or_else(|| {
        eprintln!(
            "Could not detect shell. Specify one: amd-debug-tools completions bash|zsh|fish|elvish|powershell"
        );
        std::process::exit(1);
    });
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "amd-debug-tools",
        &mut std::io::stdout(),
    );
}
