use crate::sysfs::SysfsRoot;
use serde::Serialize;
use std::collections::BTreeMap;

const POWER_SUPPLY_CLASS: &str = "sys/class/power_supply";
/// ACPI hardware ID of a control-method battery.
const ACPI_BATTERY_HID: &str = "PNP0C0A";

/// One ACPI battery and its `POWER_SUPPLY_*` uevent properties.
#[derive(Debug, Clone, Default)]
pub struct Battery {
    pub name: String,
    pub device_path: String,
    properties: BTreeMap<String, String>,
}

impl Battery {
    /// A non-empty `POWER_SUPPLY_<key>` property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&format!("POWER_SUPPLY_{}", key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Batteries report either energy (µWh) or charge (µAh) counters.
    fn energy_or_charge(&self, suffix: &str) -> Option<&str> {
        self.property(&format!("ENERGY_{}", suffix))
            .or_else(|| self.property(&format!("CHARGE_{}", suffix)))
    }

    pub fn energy_unit(&self) -> &'static str {
        if self.property("ENERGY_NOW").is_some() {
            "µWh"
        } else {
            "µAh"
        }
    }

    pub fn energy(&self) -> Option<&str> {
        self.energy_or_charge("NOW")
    }

    pub fn energy_full(&self) -> Option<&str> {
        self.energy_or_charge("FULL")
    }

    pub fn energy_full_design(&self) -> Option<&str> {
        self.energy_or_charge("FULL_DESIGN")
    }

    /// Full capacity as a fraction of design capacity.
    pub fn health(&self) -> Option<f64> {
        let full: f64 = self.energy_full()?.parse().ok()?;
        let design: f64 = self.energy_full_design()?.parse().ok()?;
        if design > 0.0 {
            Some(full / design)
        } else {
            None
        }
    }

    pub fn description(&self) -> Option<String> {
        let health = self.health()?;
        Some(format!(
            "Battery {} ({} {}) is operating at {:.2}% of design",
            self.name,
            self.property("MANUFACTURER").unwrap_or_default(),
            self.property("MODEL_NAME").unwrap_or_default(),
            health * 100.0
        ))
    }

    pub fn report(&self) -> BatteryReport {
        BatteryReport {
            name: self.name.clone(),
            manufacturer: self.property("MANUFACTURER").map(String::from),
            model: self.property("MODEL_NAME").map(String::from),
            unit: self.energy_unit(),
            energy: self.energy().map(String::from),
            energy_full: self.energy_full().map(String::from),
            energy_full_design: self.energy_full_design().map(String::from),
            health_percent: self.health().map(|h| h * 100.0),
        }
    }
}

/// Serializable summary of a battery.
#[derive(Debug, Clone, Serialize)]
pub struct BatteryReport {
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub unit: &'static str,
    pub energy: Option<String>,
    pub energy_full: Option<String>,
    pub energy_full_design: Option<String>,
    pub health_percent: Option<f64>,
}

/// All ACPI batteries on the system.
#[derive(Debug, Clone, Default)]
pub struct Batteries {
    pub batteries: Vec<Battery>,
}

impl Batteries {
    pub fn detect(sysfs: &SysfsRoot) -> Self {
        let mut info = Self::default();

        let entries = match sysfs.list_dir(POWER_SUPPLY_CLASS) {
            Ok(e) => e,
            Err(_) => return info,
        };

        for entry in entries {
            let class_path = format!("{}/{}", POWER_SUPPLY_CLASS, entry);
            let properties = sysfs.read_uevent(&class_path).unwrap_or_default();
            if properties.get("POWER_SUPPLY_TYPE").map(String::as_str) != Some("Battery") {
                continue;
            }
            let device_path = match sysfs.device_path(&class_path) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if !device_path.contains(ACPI_BATTERY_HID) {
                log::debug!("skipping non-ACPI battery {}", device_path);
                continue;
            }
            let name = properties
                .get("POWER_SUPPLY_NAME")
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            info.batteries.push(Battery {
                name,
                device_path,
                properties,
            });
        }

        info
    }

    pub fn get(&self, name: &str) -> Option<&Battery> {
        self.batteries.iter().find(|b| b.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.batteries.iter().map(|b| b.name.clone()).collect()
    }

    /// Energy unit of the named battery, empty if there is no such battery.
    pub fn energy_unit(&self, name: &str) -> &'static str {
        self.get(name).map(Battery::energy_unit).unwrap_or_default()
    }

    pub fn energy(&self, name: &str) -> Option<String> {
        self.get(name)?.energy().map(String::from)
    }

    pub fn energy_full(&self, name: &str) -> Option<String> {
        self.get(name)?.energy_full().map(String::from)
    }

    pub fn description(&self, name: &str) -> Option<String> {
        self.get(name)?.description()
    }
}
