use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub log: LogConfig,
    pub bios: BiosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// How far before a tail seek timestamp dmesg should start, in seconds.
    pub since_fuzz_secs: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { since_fuzz_secs: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiosConfig {
    /// Print ordinary kernel messages alongside BIOS messages.
    pub show_kernel_lines: bool,
    /// Print decoded ACPI Notify() dispatches.
    pub show_notify: bool,
    /// ACPI method traced by `trace --enable`.
    pub method: String,
}

impl Default for BiosConfig {
    fn default() -> Self {
        Self {
            show_kernel_lines: true,
            show_notify: true,
            method: "M460".to_string(),
        }
    }
}

const SYSTEM_CONFIG: &str = "/etc/amd-debug-tools/config.toml";

/// Load the system config file if it exists.
fn load_system() -> Option<toml::Value> {
    let content = std::fs::read_to_string(Path::new(SYSTEM_CONFIG)).ok()?;
    toml::from_str(&content).ok()
}

/// Load the user config file (~/.config/amd-debug-tools/config.toml) if it exists.
fn load_user() -> Option<toml::Value> {
    let path = dirs::config_dir()?
        .join("amd-debug-tools")
        .join("config.toml");
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

fn load_from_path(path: &Path) -> ToolConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("failed to read config at {}: {}", path.display(), e);
            return ToolConfig::default();
        }
    };
    toml::from_str(&content).unwrap_or_else(|e| {
        log::warn!("failed to parse config at {}: {}", path.display(), e);
        ToolConfig::default()
    })
}

/// Load the merged config: system defaults, then user overrides.
/// If `override_path` is provided, use only that file instead.
pub fn load(override_path: Option<&PathBuf>) -> ToolConfig {
    if let Some(path) = override_path {
        return load_from_path(path);
    }

    let merged = match (load_system(), load_user()) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => value.try_into().unwrap_or_else(|e| {
            log::warn!("failed to deserialize config: {}", e);
            ToolConfig::default()
        }),
        None => ToolConfig::default(),
    }
}
