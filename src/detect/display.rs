use crate::sysfs::SysfsRoot;
use std::path::PathBuf;

const DRM_CLASS: &str = "sys/class/drm";

/// Connected, enabled DRM connectors.
#[derive(Debug, Clone, Default)]
pub struct DisplayInfo {
    pub connectors: Vec<String>,
    edid: Vec<PathBuf>,
}

impl DisplayInfo {
    pub fn detect(sysfs: &SysfsRoot) -> Self {
        let mut info = Self::default();

        let entries = match sysfs.list_dir(DRM_CLASS) {
            Ok(e) => e,
            Err(_) => return info,
        };

        for entry in entries {
            let base = format!("{}/{}", DRM_CLASS, entry);
            let device_path = sysfs.device_path(&base).unwrap_or_else(|_| base.clone());
            if !device_path.contains("card") {
                continue;
            }

            let status = sysfs.read_optional(format!("{}/status", base)).unwrap_or(None);
            if status.as_deref() != Some("connected") {
                continue;
            }
            let enabled = sysfs.read_optional(format!("{}/enabled", base)).unwrap_or(None);
            if enabled.as_deref() != Some("enabled") {
                continue;
            }

            info.edid.push(sysfs.path(format!("{}/edid", base)));
            info.connectors.push(entry);
        }

        info
    }

    /// EDID blob paths of every connected display.
    pub fn edid(&self) -> &[PathBuf] {
        &self.edid
    }
}
