use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Abstraction over the sysfs/procfs filesystem root.
/// Defaults to `/` in production, redirectable to a temp directory for testing.
#[derive(Debug, Clone)]
pub struct SysfsRoot {
    root: PathBuf,
}

impl Default for SysfsRoot {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl SysfsRoot {
    /// Create a SysfsRoot pointing at the real system.
    pub fn system() -> Self {
        Self::default()
    }

    /// Create a SysfsRoot pointing at a custom directory (for testing).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a path relative to this root.
    /// e.g., `path("sys/class/drm")` -> `/sys/class/drm` or `<test_root>/sys/class/drm`
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a sysfs/procfs file, trimming whitespace.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<String> {
        let path = self.path(relative);
        std::fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|e| Error::SysfsRead { path, source: e })
    }

    /// Read a sysfs file, returning None if it doesn't exist or isn't readable.
    pub fn read_optional(&self, relative: impl AsRef<Path>) -> Result<Option<String>> {
        let path = self.path(relative);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(None),
            Err(e) => Err(Error::SysfsRead { path, source: e }),
        }
    }

    /// Read a binary file such as an ACPI table.
    pub fn read_bytes(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = self.path(relative);
        std::fs::read(&path).map_err(|e| Error::SysfsRead { path, source: e })
    }

    /// Write a value to a sysfs file.
    pub fn write(&self, relative: impl AsRef<Path>, value: &str) -> Result<()> {
        let path = self.path(relative);
        std::fs::write(&path, value).map_err(|e| Error::SysfsWrite { path, source: e })
    }

    /// Parse a device's `uevent` file into its `KEY=value` properties.
    /// Missing files yield an empty map.
    pub fn read_uevent(&self, device: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
        let content = self
            .read_optional(device.as_ref().join("uevent"))?
            .unwrap_or_default();
        Ok(parse_uevent(&content))
    }

    /// Resolve a class entry (usually a symlink) to its device path,
    /// relative to this root, e.g. `sys/devices/.../PNP0C0A:00/power_supply/BAT0`.
    pub fn device_path(&self, relative: impl AsRef<Path>) -> Result<String> {
        let path = self.path(relative);
        let resolved = std::fs::canonicalize(&path).map_err(|e| Error::SysfsRead {
            path: path.clone(),
            source: e,
        })?;
        let root = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let relative = resolved.strip_prefix(&root).unwrap_or(&resolved);
        Ok(relative.to_string_lossy().into_owned())
    }

    /// List entries in a sysfs directory.
    pub fn list_dir(&self, relative: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = self.path(relative);
        let entries = std::fs::read_dir(&path).map_err(|e| Error::SysfsRead {
            path: path.clone(),
            source: e,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::SysfsRead {
                path: path.clone(),
                source: e,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn parse_uevent(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_read_write() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs = SysfsRoot::new(tmp.path());

        fs::create_dir_all(tmp.path().join("sys/module/acpi/parameters")).unwrap();
        sysfs
            .write("sys/module/acpi/parameters/trace_state", "disable\n")
            .unwrap();

        assert_eq!(
            sysfs.read("sys/module/acpi/parameters/trace_state").unwrap(),
            "disable"
        );
    }

    #[test]
    fn test_read_optional_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs = SysfsRoot::new(tmp.path());

        assert_eq!(sysfs.read_optional("sys/nonexistent").unwrap(), None);
    }

    #[test]
    fn test_read_uevent() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs = SysfsRoot::new(tmp.path());

        let bat = tmp.path().join("sys/class/power_supply/BAT0");
        fs::create_dir_all(&bat).unwrap();
        fs::write(
            bat.join("uevent"),
            "POWER_SUPPLY_NAME=BAT0\nPOWER_SUPPLY_TYPE=Battery\nPOWER_SUPPLY_MODEL_NAME=Super Battery\n",
        )
        .unwrap();

        let props = sysfs.read_uevent("sys/class/power_supply/BAT0").unwrap();
        assert_eq!(props["POWER_SUPPLY_NAME"], "BAT0");
        assert_eq!(props["POWER_SUPPLY_MODEL_NAME"], "Super Battery");
        assert!(sysfs.read_uevent("sys/class/power_supply/AC").unwrap().is_empty());
    }

    #[test]
    fn test_device_path_follows_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs = SysfsRoot::new(tmp.path());

        let dev = tmp
            .path()
            .join("sys/devices/LNXSYSTM:00/PNP0C0A:00/power_supply/BAT0");
        fs::create_dir_all(&dev).unwrap();
        fs::create_dir_all(tmp.path().join("sys/class/power_supply")).unwrap();
        std::os::unix::fs::symlink(&dev, tmp.path().join("sys/class/power_supply/BAT0"))
            .unwrap();

        let path = sysfs.device_path("sys/class/power_supply/BAT0").unwrap();
        assert_eq!(path, "sys/devices/LNXSYSTM:00/PNP0C0A:00/power_supply/BAT0");
    }

    #[test]
    fn test_list_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let sysfs = SysfsRoot::new(tmp.path());

        fs::create_dir_all(tmp.path().join("sys/class/drm")).unwrap();
        fs::write(tmp.path().join("sys/class/drm/card0-eDP-1"), "").unwrap();
        fs::write(tmp.path().join("sys/class/drm/card0"), "").unwrap();

        let entries = sysfs.list_dir("sys/class/drm").unwrap();
        assert_eq!(entries, vec!["card0", "card0-eDP-1"]);
    }
}
