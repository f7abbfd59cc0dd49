//! The BIOS log tool: firmware debug prints interleaved with the kernel log.

use crate::acpi::AcpicaTracer;
use crate::config::BiosConfig;
use crate::error::{Error, Result};
use crate::kernel::log::{KernelLog, LogEntry};
use crate::kernel::{self, LogEvent, LogPriority};
use crate::output;
use crate::sysfs::SysfsRoot;
use chrono::{DateTime, Local};

/// BIOS debug logging was merged in this kernel release.
const BIOS_TRACE_KERNEL: (u32, u32) = (6, 16);

/// Decide how a kernel log entry is shown: its marker and text, or nothing.
pub fn render_entry(entry: &LogEntry, config: &BiosConfig) -> Option<(&'static str, String)> {
    match kernel::classify_line(&entry.message) {
        LogEvent::Bios(text) => Some((output::BIOS_MARKER, text)),
        LogEvent::Notify(text) if config.show_notify => Some((output::BIOS_MARKER, text)),
        LogEvent::Notify(_) | LogEvent::TracePoint => None,
        LogEvent::Kernel(text) if config.show_kernel_lines && !text.is_empty() => {
            let priority = LogPriority::from_syslog(entry.priority);
            Some((output::priority_marker(priority), text))
        }
        LogEvent::Kernel(_) => None,
    }
}

pub struct BiosLog {
    log: Box<dyn KernelLog>,
    config: BiosConfig,
}

impl BiosLog {
    pub fn new(log: Box<dyn KernelLog>, config: BiosConfig) -> Self {
        Self { log, config }
    }

    /// Everything that would be printed, in log order.
    pub fn messages(&self) -> Vec<(&'static str, String)> {
        self.log
            .entries()
            .iter()
            .filter_map(|entry| render_entry(entry, &self.config))
            .collect()
    }

    /// Print the log from the start of the boot, or from `since` onwards.
    pub fn run(&mut self, since: Option<DateTime<Local>>) -> Result<()> {
        match since {
            Some(since) => self.log.seek_tail(Some(since))?,
            None => self.log.seek()?,
        }
        for (marker, text) in self.messages() {
            output::print_message(marker, &text);
        }
        Ok(())
    }
}

/// What `set_tracing` switches the ACPICA tracer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Firmware debug prints from the configured method.
    Bios,
    /// ACPI Notify() dispatches.
    Notify,
    /// Tracing off, parameters from before tracing restored.
    Off,
}

/// Switch ACPICA tracing. The parameters found before tracing is first
/// enabled are saved, and put back when it is disabled.
pub fn set_tracing(sysfs: &SysfsRoot, mode: TraceMode, config: &BiosConfig) -> Result<()> {
    let (major, minor) = BIOS_TRACE_KERNEL;
    if mode == TraceMode::Bios && !kernel::minimum_kernel(major, minor) {
        output::print_message(
            output::WARN_MARKER,
            &format!(
                "Support for BIOS debug logging was merged in mainline {}.{}, \
                 this tool may not work correctly unless support is manually backported",
                major, minor
            ),
        );
    }

    let tracer = AcpicaTracer::new(sysfs);
    let applied = match mode {
        TraceMode::Bios => tracer.trace_bios(&config.method)? && tracer.save_original()?,
        TraceMode::Notify => tracer.trace_notify()? && tracer.save_original()?,
        TraceMode::Off => tracer.restore()? && tracer.disable()?,
    };
    if !applied {
        return Err(Error::Unsupported(
            "ACPI tracing, please check your kernel for CONFIG_ACPI_DEBUG".to_string(),
        ));
    }

    let message = match mode {
        TraceMode::Bios => "Set BIOS tracing to enabled",
        TraceMode::Notify => "Set ACPI Notify tracing to enabled",
        TraceMode::Off => "Set ACPI tracing to disabled",
    };
    output::print_message(output::OK_MARKER, message);
    Ok(())
}
