//! Device database for runtime loading and lookup
//!
//! This module provides the `DeviceDatabase` type for loading device
//! descriptors from RON files at runtime.

use alloc::format;
use alloc::{string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use super::types::{DeviceDescriptor, FuseRegion};

/// Error type for device database operations
#[derive(Debug)]
pub enum DeviceDbError {
    /// I/O error reading files
    Io(io::Error),
    /// RON parsing error
    Parse(ron::error::SpannedError),
    /// Validation error
    Validation(String),
}

impl From<io::Error> for DeviceDbError {
    fn from(e: io::Error) -> Self {
        DeviceDbError::Io(e)
    }
}

impl From<ron::error::SpannedError> for DeviceDbError {
    fn from(e: ron::error::SpannedError) -> Self {
        DeviceDbError::Parse(e)
    }
}

impl std::fmt::Display for DeviceDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceDbError::Io(e) => write!(f, "I/O error: {}", e),
            DeviceDbError::Parse(e) => write!(f, "Parse error: {}", e),
            DeviceDbError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for DeviceDbError {}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Convert to bytes, `None` if the size does not fit in a `u32`
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
        }
    }
}

fn zero_size() -> Size {
    Size::B(0)
}

/// Single device definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct DeviceDef {
    name: String,
    protocol_id: u8,
    #[serde(default)]
    variant: u8,
    code_memory_size: Size,
    #[serde(default = "zero_size")]
    data_memory_size: Size,
    #[serde(default)]
    opts1: u16,
    #[serde(default)]
    opts2: u16,
    #[serde(default)]
    opts3: u16,
    read_buffer_size: u16,
    write_buffer_size: u16,
    #[serde(default)]
    chip_id: u32,
    #[serde(default)]
    chip_id_bytes_count: u8,
    #[serde(default)]
    write_unlock: u8,
    #[serde(default)]
    fuses: Option<FuseRegion>,
}

/// Top-level RON file: a vendor and its devices
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    devices: Vec<DeviceDef>,
}

/// A loaded database entry
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    /// Manufacturer of the chip
    pub vendor: String,
    /// Parameters sent to the programmer
    pub descriptor: DeviceDescriptor,
}

/// Runtime device database
#[derive(Debug, Default)]
pub struct DeviceDatabase {
    devices: Vec<DeviceEntry>,
}

impl DeviceDatabase {
    /// Create an empty database
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Load device definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, DeviceDbError> {
        let content = fs::read_to_string(path)?;
        let count = self.load_ron(&content)?;
        log::debug!("Loaded {} devices from {}", count, path.display());
        Ok(count)
    }

    /// Load device definitions from a RON string
    ///
    /// Nothing is added when any entry fails validation.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, DeviceDbError> {
        let vendor_def: VendorDef = ron::from_str(content)?;

        let mut entries = Vec::with_capacity(vendor_def.devices.len());
        for def in vendor_def.devices {
            let size = |size: Size, region: &str| {
                size.to_bytes().ok_or_else(|| {
                    DeviceDbError::Validation(format!(
                        "{}: {} memory size overflows",
                        def.name, region
                    ))
                })
            };
            let code_memory_size = size(def.code_memory_size, "code")?;
            let data_memory_size = size(def.data_memory_size, "data")?;

            let descriptor = DeviceDescriptor {
                name: def.name,
                protocol_id: def.protocol_id,
                variant: def.variant,
                code_memory_size,
                data_memory_size,
                opts1: def.opts1,
                opts2: def.opts2,
                opts3: def.opts3,
                read_buffer_size: def.read_buffer_size,
                write_buffer_size: def.write_buffer_size,
                chip_id: def.chip_id,
                chip_id_bytes_count: def.chip_id_bytes_count,
                write_unlock: def.write_unlock,
                fuses: def.fuses,
            };
            descriptor
                .validate()
                .map_err(|e| DeviceDbError::Validation(format!("{}: {}", descriptor.name, e)))?;
            entries.push(DeviceEntry {
                vendor: vendor_def.vendor.clone(),
                descriptor,
            });
        }

        let count = entries.len();
        self.devices.extend(entries);
        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, DeviceDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get the number of devices in the database
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Find a device by exact name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&DeviceDescriptor> {
        self.devices
            .iter()
            .find(|e| e.descriptor.name.eq_ignore_ascii_case(name))
            .map(|e| &e.descriptor)
    }

    /// Find devices by name (case-insensitive partial match)
    pub fn search(&self, name: &str) -> Vec<&DeviceEntry> {
        let name_lower = name.to_lowercase();
        self.devices
            .iter()
            .filter(|e| e.descriptor.name.to_lowercase().contains(&name_lower))
            .collect()
    }

    /// Iterate over all devices
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices.iter()
    }
}
