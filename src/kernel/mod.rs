pub mod log;
pub mod trace_args;

pub use trace_args::sscanf_bios_args;

use crate::sysfs::SysfsRoot;

/// Boot parameters that say nothing about power management, or that may
/// leak machine-specific secrets (disk UUIDs, keys) into a shared report.
const FILTERED_PARAMS: &[&str] = &[
    "apparmor",
    "audit",
    "auto",
    "bluetooth.disable_ertm",
    "boot",
    "BOOT_IMAGE",
    "console",
    "crashkernel",
    "cryptdevice",
    "cryptkey",
    "dm",
    "earlycon",
    "earlyprintk",
    "ether",
    "init",
    "initrd",
    "ip",
    "LANG",
    "loglevel",
    "luks.key",
    "luks.name",
    "luks.options",
    "luks.uuid",
    "mitigations",
    "mount.usr",
    "mount.usrflags",
    "mount.usrfstype",
    "netdev",
    "netroot",
    "nfsaddrs",
    "nfs.nfs4_unique_id",
    "nfsroot",
    "noplymouth",
    "nowatchdog",
    "ostree",
    "preempt",
    "quiet",
    "rd.dm.uuid",
    "rd.luks.allow-discards",
    "rd.luks.key",
    "rd.luks.name",
    "rd.luks.options",
    "rd.luks.uuid",
    "rd.lvm.lv",
    "rd.lvm.vg",
    "rd.md.uuid",
    "rd.systemd.mask",
    "rd.systemd.wants",
    "resume",
    "resumeflags",
    "rhgb",
    "ro",
    "root",
    "rootflags",
    "rootfstype",
    "roothash",
    "rw",
    "security",
    "selinux",
    "showopts",
    "splash",
    "swap",
    "systemd.machine_id",
    "systemd.mask",
    "systemd.show_status",
    "systemd.unit",
    "systemd.verity_root_data",
    "systemd.verity_root_hash",
    "systemd.wants",
    "udev.log_priority",
    "verbose",
    "vt.handoff",
    "zfs",
    "zswap.enabled",
];

const TRACE_MARKERS: &[&str] = &["ex_trace_point", "ex_trace_args"];
const NOTIFY_MARKER: &str = "ev_queue_notify_reques";

/// What a single kernel log line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A rendered BIOS trace-argument message.
    Bios(String),
    /// An ACPI Notify() dispatch.
    Notify(String),
    /// A trace record with nothing to show on its own.
    TracePoint,
    /// Any other kernel message, timestamp removed.
    Kernel(String),
}

/// Classify a raw kernel log line.
pub fn classify_line(line: &str) -> LogEvent {
    let message = strip_timestamp(line);
    let record = strip_acpica_prefix(message);

    if let Some(text) = sscanf_bios_args(record) {
        return LogEvent::Bios(text);
    }
    if TRACE_MARKERS.iter().any(|m| record.starts_with(m)) {
        return LogEvent::TracePoint;
    }
    if let Some(text) = decode_notify(record) {
        return LogEvent::Notify(text);
    }
    LogEvent::Kernel(message.to_string())
}

/// Extract the message of an ACPICA Notify() dispatch record, dropping the
/// trailing namespace node address.
///
/// `evmisc-0132 ev_queue_notify_reques: Dispatching Notify on [UBTC] (Device) Value 0x80 (Status Change) Node 00000000851b15c1`
/// yields `Dispatching Notify on [UBTC] (Device) Value 0x80 (Status Change)`.
pub fn decode_notify(line: &str) -> Option<String> {
    let start = line.find(NOTIFY_MARKER)?;
    let (_, message) = line[start..].split_once(": ")?;
    let message = message.split("Node").next().unwrap_or(message);
    Some(message.trim().to_string())
}

/// Remove a leading `[   12.345678]` dmesg timestamp.
pub fn strip_timestamp(line: &str) -> &str {
    let trimmed = line.trim();
    let Some(inner) = trimmed.strip_prefix('[') else {
        return trimmed;
    };
    let Some(end) = inner.find(']') else {
        return trimmed;
    };
    let stamp = inner[..end].trim();
    match stamp.split_once('.') {
        Some((secs, frac))
            if !secs.is_empty()
                && !frac.is_empty()
                && secs.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit()) =>
        {
            inner[end + 1..].trim()
        }
        _ => trimmed,
    }
}

/// Remove a leading ACPICA source tag such as `extrace-0138`.
pub fn strip_acpica_prefix(line: &str) -> &str {
    let line = line.trim_start();
    let Some((tag, rest)) = line.split_once(char::is_whitespace) else {
        return line;
    };
    let is_tag = tag.split_once('-').is_some_and(|(component, number)| {
        !component.is_empty()
            && component.bytes().all(|b| b.is_ascii_lowercase())
            && !number.is_empty()
            && number.bytes().all(|b| b.is_ascii_digit())
    });
    if is_tag { rest.trim_start() } else { line }
}

/// Drop uninteresting or sensitive parameters from a kernel command line.
pub fn filtered_command_line(cmdline: &str) -> String {
    cmdline
        .split_whitespace()
        .filter(|param| !FILTERED_PARAMS.iter().any(|f| param.starts_with(f)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read `/proc/cmdline` and filter it.
pub fn kernel_command_line(sysfs: &SysfsRoot) -> String {
    let cmdline = sysfs.read("proc/cmdline").unwrap_or_default();
    filtered_command_line(&cmdline)
}

/// Kernel release as `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    /// Parse a release string such as `6.16.0-rc1-amd`.
    pub fn parse(release: &str) -> Option<Self> {
        let mut parts = release.trim().split('.');
        let major = leading_digits(parts.next()?)?;
        let minor = leading_digits(parts.next()?)?;
        Some(Self { major, minor })
    }

    /// Version of the running kernel.
    pub fn running() -> Option<Self> {
        let uts = nix::sys::utsname::uname().ok()?;
        Self::parse(&uts.release().to_string_lossy())
    }

    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        *self >= Self { major, minor }
    }
}

fn leading_digits(s: &str) -> Option<u32> {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    s[..len].parse().ok()
}

/// Whether the running kernel is at least `major.minor`.
/// Unknown versions are treated as new enough.
pub fn minimum_kernel(major: u32, minor: u32) -> bool {
    KernelVersion::running().is_none_or(|v| v.at_least(major, minor))
}

/// Severity bucket of a syslog priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPriority {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogPriority {
    pub fn from_syslog(priority: Option<u8>) -> Self {
        match priority {
            Some(7) => LogPriority::Debug,
            Some(4) => LogPriority::Warning,
            Some(p) if p <= 3 => LogPriority::Error,
            _ => LogPriority::Info,
        }
    }
}
