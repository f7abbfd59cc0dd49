use crate::detect::HardwareInfo;
use crate::kernel::LogPriority;
use colored::{ColoredString, Colorize};

const LABEL_W: usize = 18;

pub const BIOS_MARKER: &str = "🖴";
pub const OK_MARKER: &str = "✅";
pub const WARN_MARKER: &str = "🚦";
pub const FAIL_MARKER: &str = "❌";
pub const BATTERY_MARKER: &str = "🔋";
pub const DISPLAY_MARKER: &str = "💻";

/// Marker shown in front of a kernel message of the given priority.
pub fn priority_marker(priority: LogPriority) -> &'static str {
    match priority {
        LogPriority::Debug => "🦟",
        LogPriority::Warning => WARN_MARKER,
        LogPriority::Error => FAIL_MARKER,
        LogPriority::Info => "○",
    }
}

fn colorize(marker: &str, text: String) -> ColoredString {
    match marker {
        BIOS_MARKER | "🦟" => text.dimmed(),
        WARN_MARKER => text.yellow(),
        FAIL_MARKER => text.red(),
        _ => text.blue(),
    }
}

/// `marker message`, trimmed.
pub fn format_message(marker: &str, message: &str) -> String {
    format!("{} {}", marker, message).trim().to_string()
}

pub fn print_message(marker: &str, message: &str) {
    println!("{}", colorize(marker, format_message(marker, message)));
}

pub fn print_hardware_summary(hw: &HardwareInfo) {
    let mut rows: Vec<(&str, String)> = Vec::new();

    for battery in &hw.batteries.batteries {
        let value = battery
            .description()
            .unwrap_or_else(|| format!("Battery {} (capacity unknown)", battery.name));
        rows.push(("Battery", format!("{} {}", BATTERY_MARKER, value)));
        if let Some(energy) = battery.energy() {
            rows.push(("  Energy", format!("{} {}", energy, battery.energy_unit())));
        }
    }
    if hw.batteries.batteries.is_empty() {
        rows.push(("Battery", "None".to_string()));
    }

    for (connector, edid) in hw
        .displays
        .connectors
        .iter()
        .zip(hw.displays.edid().iter())
    {
        rows.push((
            "Display",
            format!("{} {} ({})", DISPLAY_MARKER, connector, edid.display()),
        ));
    }
    if hw.displays.connectors.is_empty() {
        rows.push(("Display", "None".to_string()));
    }

    rows.push((
        "Kernel cmdline",
        if hw.kernel_cmdline.is_empty() {
            "(nothing notable)".to_string()
        } else {
            hw.kernel_cmdline.clone()
        },
    ));

    // Box width from content
    let inner_w = rows
        .iter()
        .map(|(l, v)| l.len().max(LABEL_W) + 2 + v.chars().count())
        .max()
        .unwrap_or(40);

    let title = "Hardware";
    let fill = inner_w.saturating_sub(1 + title.len());
    println!("╭─ {} {}╮", title.bold(), "─".repeat(fill));

    for (label, value) in &rows {
        let padded = format!("{:<w$}", label, w = LABEL_W);
        let pad = inner_w.saturating_sub(LABEL_W + 2 + value.chars().count());
        println!("│ {}  {}{} │", padded.dimmed(), value, " ".repeat(pad));
    }

    println!("╰{}╯", "─".repeat(inner_w + 2));
}

pub fn hardware_json(hw: &HardwareInfo) -> serde_json::Value {
    serde_json::json!({
        "batteries": hw.batteries.batteries.iter().map(|b| b.report()).collect::<Vec<_>>(),
        "displays": hw.displays.connectors.iter().zip(hw.displays.edid().iter()).map(|(c, e)| serde_json::json!({
            "connector": c,
            "edid": e,
        })).collect::<Vec<_>>(),
        "kernel_cmdline": hw.kernel_cmdline,
    })
}

pub fn print_hardware_json(hw: &HardwareInfo) {
    println!("{:#}", hardware_json(hw));
}
