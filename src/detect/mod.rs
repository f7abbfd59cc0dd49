pub mod battery;
pub mod display;

use crate::kernel;
use crate::sysfs::SysfsRoot;

/// Everything the hardware report shows.
#[derive(Debug, Clone)]
pub struct HardwareInfo {
    pub batteries: battery::Batteries,
    pub displays: display::DisplayInfo,
    /// Kernel command line with uninteresting parameters removed.
    pub kernel_cmdline: String,
}

impl HardwareInfo {
    pub fn detect(sysfs: &SysfsRoot) -> Self {
        Self {
            batteries: battery::Batteries::detect(sysfs),
            displays: display::DisplayInfo::detect(sysfs),
            kernel_cmdline: kernel::kernel_command_line(sysfs),
        }
    }
}
