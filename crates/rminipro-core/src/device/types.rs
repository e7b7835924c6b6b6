//! Device descriptor type definitions

use alloc::string::String;

use crate::error::{Error, Result};

/// Size of the largest frame exchanged with the programmer
pub const MAX_FRAME_LEN: usize = 0x210;

/// Bytes preceding the payload in block and fuse write frames
pub const PAYLOAD_OFFSET: usize = 7;

/// Widest chip ID the protocol can report
pub const MAX_CHIP_ID_BYTES: u8 = 4;

/// Configuration byte region of a chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct FuseRegion {
    /// Read opcode selecting the region (also the verification opcode)
    pub opcode: u8,
    /// Number of configuration bytes
    pub length: u8,
}

/// Per-chip parameters sent in every command header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Chip name as listed in the database (e.g. "AT28C256")
    pub name: String,
    /// Programming algorithm family
    pub protocol_id: u8,
    /// Variant within the protocol family
    pub variant: u8,
    /// Code memory size in bytes
    pub code_memory_size: u32,
    /// Data memory (EEPROM) size in bytes
    pub data_memory_size: u32,
    /// First device option word
    pub opts1: u16,
    /// Second device option word
    pub opts2: u16,
    /// Third device option word
    pub opts3: u16,
    /// Bytes returned by one block read
    pub read_buffer_size: u16,
    /// Bytes carried by one block write
    pub write_buffer_size: u16,
    /// Expected chip ID, 0 when the chip has none
    pub chip_id: u32,
    /// Number of significant chip ID bytes (at most 4)
    pub chip_id_bytes_count: u8,
    /// Code enabling write mode on the target
    pub write_unlock: u8,
    /// Configuration bytes, if the chip has any
    pub fuses: Option<FuseRegion>,
}

impl DeviceDescriptor {
    /// Check the descriptor against the limits of the frame layout
    pub fn validate(&self) -> Result<()> {
        if self.chip_id_bytes_count > MAX_CHIP_ID_BYTES {
            return Err(Error::ChipIdTooWide(self.chip_id_bytes_count));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::InvalidBufferSize(self.read_buffer_size));
        }
        if self.write_buffer_size == 0
            || PAYLOAD_OFFSET + self.write_buffer_size as usize > MAX_FRAME_LEN
        {
            return Err(Error::InvalidBufferSize(self.write_buffer_size));
        }
        Ok(())
    }

    /// Whether the chip reports an ID that can be checked
    pub fn has_chip_id(&self) -> bool {
        self.chip_id_bytes_count > 0
    }

    /// Size in bytes of a memory region
    pub fn memory_size(&self, region: MemoryRegion) -> u32 {
        match region {
            MemoryRegion::Code => self.code_memory_size,
            MemoryRegion::Data => self.data_memory_size,
        }
    }
}

/// Memory array of the target chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    /// Program memory
    Code,
    /// Data memory (EEPROM)
    Data,
}

impl core::fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MemoryRegion::Code => write!(f, "code"),
            MemoryRegion::Data => write!(f, "data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor {
            name: String::from("TEST"),
            protocol_id: 0x71,
            variant: 0x0A,
            code_memory_size: 0x2000,
            data_memory_size: 0x200,
            opts1: 0x17,
            opts2: 0x20,
            opts3: 0x0A0A,
            read_buffer_size: 0x100,
            write_buffer_size: 0x40,
            chip_id: 0x1E_9307,
            chip_id_bytes_count: 3,
            write_unlock: 0,
            fuses: None,
        }
    }

    #[test]
    fn test_validate() {
        assert_eq!(descriptor().validate(), Ok(()));

        let mut d = descriptor();
        d.chip_id_bytes_count = 5;
        assert_eq!(d.validate(), Err(Error::ChipIdTooWide(5)));

        let mut d = descriptor();
        d.read_buffer_size = 0;
        assert_eq!(d.validate(), Err(Error::InvalidBufferSize(0)));

        let mut d = descriptor();
        d.write_buffer_size = (MAX_FRAME_LEN - PAYLOAD_OFFSET + 1) as u16;
        assert!(d.validate().is_err());
        d.write_buffer_size = (MAX_FRAME_LEN - PAYLOAD_OFFSET) as u16;
        assert_eq!(d.validate(), Ok(()));
    }

    #[test]
    fn test_memory_size() {
        let d = descriptor();
        assert_eq!(d.memory_size(MemoryRegion::Code), 0x2000);
        assert_eq!(d.memory_size(MemoryRegion::Data), 0x200);
        assert!(d.has_chip_id());
    }
}
