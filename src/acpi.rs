use crate::error::{Error, Result};
use crate::sysfs::SysfsRoot;
use log::{debug, warn};
use std::collections::BTreeMap;

const ACPI_PARAMETERS: &str = "sys/module/acpi/parameters";
const ACPI_TABLES: &str = "sys/firmware/acpi/tables";
/// Parameters found before tracing was first enabled, kept across runs.
const TRACE_STATE_FILE: &str = "var/lib/amd-debug-tools/acpi-trace.json";

const TRACE_DEBUG_LAYER: &str = "trace_debug_layer";
const TRACE_DEBUG_LEVEL: &str = "trace_debug_level";
const TRACE_METHOD_NAME: &str = "trace_method_name";
const TRACE_STATE: &str = "trace_state";

const TRACE_KEYS: [&str; 4] = [
    TRACE_DEBUG_LAYER,
    TRACE_DEBUG_LEVEL,
    TRACE_METHOD_NAME,
    TRACE_STATE,
];

// ACPICA debug layers and levels (include/acpi/acoutput.h)
const ACPI_EVENTS: u32 = 1 << 2;
const ACPI_EXECUTER: u32 = 1 << 7;
const ACPI_LV_INFO: u32 = 1 << 2;
const ACPI_LV_DEBUG_OBJECT: u32 = 1 << 4;

/// Whether any SSDT/DSDT table contains `pattern`.
pub fn search_acpi_tables(sysfs: &SysfsRoot, pattern: &str) -> Result<bool> {
    let needle = pattern.as_bytes();
    if needle.is_empty() {
        return Ok(false);
    }
    for table in sysfs.list_dir(ACPI_TABLES)? {
        if !table.starts_with("SSDT") && !table.starts_with("DSDT") {
            continue;
        }
        let content = sysfs.read_bytes(format!("{}/{}", ACPI_TABLES, table))?;
        if content.windows(needle.len()).any(|w| w == needle) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Controls the ACPICA method/event tracer through the acpi module parameters.
#[derive(Debug, Clone)]
pub struct AcpicaTracer {
    sysfs: SysfsRoot,
    original: BTreeMap<String, String>,
    supported: bool,
}

impl AcpicaTracer {
    pub fn new(sysfs: &SysfsRoot) -> Self {
        let mut tracer = Self {
            sysfs: sysfs.clone(),
            original: BTreeMap::new(),
            supported: false,
        };
        for key in TRACE_KEYS {
            let value = match sysfs
                .read_optional(format!("{}/{}", ACPI_PARAMETERS, key))
                .unwrap_or(None)
            {
                Some(v) => v,
                None => {
                    debug!("ACPI tracing not available: {} missing", key);
                    return tracer;
                }
            };
            if !value.is_empty() && value != "(null)" {
                tracer.original.insert(key.to_string(), value);
            }
        }
        tracer.supported = true;
        tracer
    }

    pub fn supported(&self) -> bool {
        self.supported
    }

    fn write_expected(&self, expected: &[(&str, String)]) -> Result<()> {
        for (key, value) in expected {
            self.sysfs
                .write(format!("{}/{}", ACPI_PARAMETERS, key), value)?;
        }
        Ok(())
    }

    /// Trace Notify() events.
    pub fn trace_notify(&self) -> Result<bool> {
        if !self.supported {
            return Ok(false);
        }
        self.write_expected(&[
            (TRACE_DEBUG_LAYER, ACPI_EVENTS.to_string()),
            (TRACE_DEBUG_LEVEL, ACPI_LV_INFO.to_string()),
            (TRACE_STATE, "enable".to_string()),
        ])?;
        debug!("Enabled ACPI debugging for ACPI_LV_INFO/ACPI_EVENTS");
        Ok(true)
    }

    /// Trace the firmware's debug-print method.
    pub fn trace_bios(&self, method: &str) -> Result<bool> {
        if !self.supported {
            return Ok(false);
        }
        if !search_acpi_tables(&self.sysfs, method)? {
            debug!(
                "will not work on this system: ACPI tables do not contain {}",
                method
            );
            return Ok(false);
        }
        self.write_expected(&[
            (TRACE_DEBUG_LAYER, ACPI_EXECUTER.to_string()),
            (TRACE_DEBUG_LEVEL, ACPI_LV_DEBUG_OBJECT.to_string()),
            (TRACE_METHOD_NAME, format!("\\{}", method)),
            (TRACE_STATE, "method".to_string()),
        ])?;
        debug!("Enabled ACPI debugging for BIOS");
        Ok(true)
    }

    pub fn disable(&self) -> Result<bool> {
        if !self.supported {
            return Ok(false);
        }
        self.write_expected(&[(TRACE_STATE, "disable".to_string())])?;
        Ok(true)
    }

    /// Save the parameters found at construction so a later run can
    /// restore them. An existing state file from an earlier run is kept.
    pub fn save_original(&self) -> Result<bool> {
        if !self.supported {
            return Ok(false);
        }
        let path = self.sysfs.path(TRACE_STATE_FILE);
        if path.exists() {
            debug!("keeping saved ACPI trace parameters in {}", path.display());
            return Ok(true);
        }
        let json = serde_json::to_string_pretty(&self.original).map_err(|e| Error::State {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::SysfsWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        self.sysfs.write(TRACE_STATE_FILE, &json)?;
        Ok(true)
    }

    fn load_saved(&self) -> Option<BTreeMap<String, String>> {
        let content = self.sysfs.read_optional(TRACE_STATE_FILE).ok().flatten()?;
        match serde_json::from_str(&content) {
            Ok(saved) => Some(saved),
            Err(e) => {
                warn!("ignoring corrupt ACPI trace state: {}", e);
                None
            }
        }
    }

    /// Put back the saved parameters, or those found at construction if
    /// nothing was saved. The state file is removed afterwards.
    pub fn restore(&self) -> Result<bool> {
        if !self.supported {
            return Ok(false);
        }
        let saved = self.load_saved();
        let original: Vec<(&str, String)> = saved
            .as_ref()
            .unwrap_or(&self.original)
            .iter()
            .filter_map(|(k, v)| {
                let key = TRACE_KEYS.iter().find(|t| **t == k.as_str())?;
                Some((*key, v.clone()))
            })
            .collect();
        self.write_expected(&original)?;

        let path = self.sysfs.path(TRACE_STATE_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::SysfsWrite { path, source: e }),
        }
        Ok(true)
    }
}
