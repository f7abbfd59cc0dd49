pub mod acpi;
pub mod bios;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod kernel;
pub mod output;
pub mod sysfs;
