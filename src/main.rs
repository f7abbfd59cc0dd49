use amd_debug_tools::bios::{self, BiosLog, TraceMode};
use amd_debug_tools::cli::{Cli, Command};
use amd_debug_tools::config::ToolConfig;
use amd_debug_tools::detect::HardwareInfo;
use amd_debug_tools::sysfs::SysfsRoot;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use log::{LevelFilter, debug};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.tool_debug);
    if std::env::var("TERM").as_deref() == Ok("dumb") {
        colored::control::set_override(false);
    }
    debug!("command: {:?}", std::env::args().collect::<Vec<_>>());
    debug!("version: {}", env!("CARGO_PKG_VERSION"));

    let config = amd_debug_tools::config::load(cli.config.as_ref());

    match cli.command {
        Command::Parse { input, since } => cmd_parse(input.as_deref(), since, &config)?,
        Command::Trace { enable, notify, .. } => {
            let mode = if enable {
                TraceMode::Bios
            } else if notify {
                TraceMode::Notify
            } else {
                TraceMode::Off
            };
            cmd_trace(mode, &config)?
        }
        Command::Hardware { json } => cmd_hardware(json),
        Command::Completions { shell } => amd_debug_tools::cli::print_completions(shell),
    }

    Ok(())
}

fn init_logging(tool_debug: bool) {
    let level = if tool_debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn cmd_parse(
    input: Option<&Path>,
    since: Option<DateTime<Local>>,
    config: &ToolConfig,
) -> Result<()> {
    let log = amd_debug_tools::kernel::log::open(input, &config.log)
        .context("failed to open the kernel log")?;
    BiosLog::new(log, config.bios.clone()).run(since)?;
    Ok(())
}

fn cmd_trace(mode: TraceMode, config: &ToolConfig) -> Result<()> {
    if !nix::unistd::geteuid().is_root() {
        anyhow::bail!("Must run as root: sudo amd-debug-tools trace");
    }
    bios::set_tracing(&SysfsRoot::system(), mode, &config.bios)?;
    Ok(())
}

fn cmd_hardware(json: bool) {
    let sysfs = SysfsRoot::system();
    let hw = HardwareInfo::detect(&sysfs);

    if json {
        amd_debug_tools::output::print_hardware_json(&hw);
    } else {
        amd_debug_tools::output::print_hardware_summary(&hw);
    }
}
