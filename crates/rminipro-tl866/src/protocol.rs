//! TL866 protocol constants and frame layout
//!
//! Every request starts with the same header carrying the opcode and the
//! target chip's parameters. Operations then overwrite or extend specific
//! offsets. Frame lengths are fixed per opcode.

use rminipro_core::codec::{pack_into, Endianness};
use rminipro_core::device::DeviceDescriptor;

use crate::error::{Result, Tl866Error};

pub use rminipro_core::device::{MAX_FRAME_LEN, PAYLOAD_OFFSET};

// USB device identifiers
pub const TL866_USB_VENDOR: u16 = 0x04D8;
pub const TL866_USB_PRODUCT: u16 = 0xE11C;

// USB endpoints
pub const BULK_OUT_EP: u8 = 0x01;
pub const BULK_IN_EP: u8 = 0x81;

/// Length of the common command header
pub const HEADER_LEN: usize = 11;

/// Oldest supported firmware word
pub const MIN_FIRMWARE_VERSION: u16 = 0x0256;

/// Protocol opcodes
pub mod opcodes {
    pub const GET_SYSTEM_INFO: u8 = 0x00;
    pub const REQUEST_STATUS1_MSG1: u8 = 0x03;
    pub const END_TRANSACTION: u8 = 0x04;
    pub const GET_CHIP_ID: u8 = 0x05;
    pub const READ_CFG: u8 = 0x12;
    pub const WRITE_CODE: u8 = 0x20;
    pub const READ_CODE: u8 = 0x21;
    pub const PREPARE_WRITING: u8 = 0x22;
    pub const READ_DATA: u8 = 0x30;
    pub const WRITE_DATA: u8 = 0x31;
    pub const REQUEST_STATUS1_MSG2: u8 = 0x39;
    pub const READ_LOCK: u8 = 0x41;
}

/// Frame lengths per request
pub mod frame_len {
    pub const BEGIN_TRANSACTION: usize = 48;
    pub const END_TRANSACTION: usize = 4;
    pub const STATUS_REQUEST: usize = 5;
    pub const STATUS_RESPONSE: usize = 32;
    pub const READ_BLOCK_REQUEST: usize = 18;
    pub const CHIP_ID_REQUEST: usize = 8;
    /// Chip ID response carries this many bytes besides the ID itself
    pub const CHIP_ID_RESPONSE_BASE: usize = 5;
    pub const FUSE_REQUEST: usize = 18;
    pub const FUSE_UNLOCK_WRITE: usize = 64;
    pub const FUSE_DIRECT_WRITE: usize = 10;
    pub const SYSTEM_INFO_REQUEST: usize = 5;
    pub const SYSTEM_INFO_RESPONSE: usize = 40;
    pub const PREPARE_WRITING_REQUEST: usize = 15;
    pub const PREPARE_WRITING_RESPONSE: usize = 10;
}

/// Largest configuration region that fits the unlock-write frame
pub const MAX_FUSE_LEN: usize = frame_len::FUSE_UNLOCK_WRITE - PAYLOAD_OFFSET;

// Fuse protocol quirks. These values were recovered from the vendor
// software and have no documented meaning.
/// Opcode family written through the unlock variant (`opcode + 1`)
pub const FUSE_FAMILY_UNLOCK: u8 = 0x10;
/// Opcode family written directly (`opcode - 1`)
pub const FUSE_FAMILY_DIRECT: u8 = 0x40;
/// Mask selecting the opcode family
pub const FUSE_FAMILY_MASK: u8 = 0xF0;
/// Offset 5 of a fuse read request
pub const FUSE_READ_MARKER: u8 = 0x10;
/// Offsets 4..7 of an unlock-write request
pub const FUSE_UNLOCK_BYTES: [u8; 3] = [0xC8, 0x0F, 0x00];
/// Configuration read opcode whose 4-byte regions hold two words
pub const FUSE_TWO_WORD_OPCODE: u8 = 18;
/// Offset 2 value of a prepare-writing request before the unlock code lands
pub const PREPARE_WRITING_MODE: u32 = 0x03;

// System info response offsets
pub const SYSINFO_PROTOCOL: usize = 1;
pub const SYSINFO_FIRMWARE: usize = 4;
pub const SYSINFO_MODEL: usize = 6;
pub const SYSINFO_FIRMWARE_MAJOR: usize = 39;

// Status response offsets
pub const STATUS_CODE: usize = 2;
pub const STATUS_OVERCURRENT: usize = 9;

/// Offset of the chip ID in its response
pub const CHIP_ID_OFFSET: usize = 2;

/// Build the command header shared by every request
///
/// The option words overlap: opts1 is written at offset 5, the byte that
/// then sits at offset 6 (opts1 high) is copied to offset 8, and opts2
/// overwrites offsets 6..8. The firmware expects exactly this interleave.
pub fn build_header(opcode: u8, device: &DeviceDescriptor) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = opcode;
    header[1] = device.protocol_id;
    header[2] = device.variant;
    header[3] = 0x00;
    header[4] = (device.data_memory_size >> 8) as u8;

    let [opts1_lo, opts1_hi] = device.opts1.to_le_bytes();
    header[5] = opts1_lo;
    header[6] = opts1_hi;
    header[8] = header[6];
    header[6..8].copy_from_slice(&device.opts2.to_le_bytes());
    header[9..11].copy_from_slice(&device.opts3.to_le_bytes());
    header
}

/// Little-endian field writer used while assembling requests
pub(crate) fn put_le(frame: &mut [u8], offset: usize, value: u32, width: usize) -> Result<()> {
    pack_into(&mut frame[offset..], value, width, Endianness::Little)?;
    Ok(())
}

/// Number of configuration words flag carried at offset 2 of fuse requests
///
/// PICs with a single config word report `length == 2`, so only the 4-byte
/// configuration read opcode is treated as two words.
pub fn word_count_flag(opcode: u8, length: usize) -> u8 {
    if opcode == FUSE_TWO_WORD_OPCODE && length == 4 {
        2
    } else {
        1
    }
}

/// How a fuse region is written, derived from its read opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuseWrite {
    /// Unlock-then-write sequence sent as a 64-byte frame
    UnlockWrite { opcode: u8 },
    /// Single 10-byte write frame
    DirectWrite { opcode: u8 },
}

impl FuseWrite {
    /// Select the write variant for a fuse read opcode
    pub fn from_opcode(opcode: u8) -> Result<Self> {
        match opcode & FUSE_FAMILY_MASK {
            FUSE_FAMILY_UNLOCK => Ok(FuseWrite::UnlockWrite {
                opcode: opcode.wrapping_add(1),
            }),
            FUSE_FAMILY_DIRECT => Ok(FuseWrite::DirectWrite {
                opcode: opcode.wrapping_sub(1),
            }),
            _ => Err(Tl866Error::UnsupportedOpcodeFamily(opcode)),
        }
    }

    /// Opcode of the write request
    pub fn opcode(&self) -> u8 {
        match *self {
            FuseWrite::UnlockWrite { opcode } | FuseWrite::DirectWrite { opcode } => opcode,
        }
    }

    /// Length of the write request
    pub fn frame_len(&self) -> usize {
        match self {
            FuseWrite::UnlockWrite { .. } => frame_len::FUSE_UNLOCK_WRITE,
            FuseWrite::DirectWrite { .. } => frame_len::FUSE_DIRECT_WRITE,
        }
    }
}

/// Programmer hardware model
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Tl866A = 1,
    Tl866Cs = 2,
}

impl Model {
    /// Decode the model byte of a system info response
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Model::Tl866A),
            2 => Some(Model::Tl866Cs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Tl866A => write!(f, "TL866A"),
            Model::Tl866Cs => write!(f, "TL866CS"),
        }
    }
}

/// Identity of the attached programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// Protocol version (1 or 2)
    pub protocol_version: u8,
    /// Hardware model
    pub model: Model,
    /// Firmware version word
    pub firmware: u16,
    /// Firmware version as printed by the vendor software
    pub firmware_str: String,
}

impl SystemInfo {
    /// Decode a system info response
    pub fn parse(buf: &[u8; frame_len::SYSTEM_INFO_RESPONSE]) -> Result<Self> {
        let protocol_version = buf[SYSINFO_PROTOCOL];
        if !matches!(protocol_version, 1 | 2) {
            return Err(Tl866Error::UnsupportedProtocolVersion(protocol_version));
        }

        let model = Model::from_code(buf[SYSINFO_MODEL])
            .ok_or(Tl866Error::UnknownDeviceModel(buf[SYSINFO_MODEL]))?;

        let firmware = u16::from_le_bytes([buf[SYSINFO_FIRMWARE], buf[SYSINFO_FIRMWARE + 1]]);
        // Major comes from the last byte, minor and patch from the firmware word
        let firmware_str = format!(
            "{}.{}.{}",
            buf[SYSINFO_FIRMWARE_MAJOR],
            buf[SYSINFO_FIRMWARE],
            buf[SYSINFO_FIRMWARE + 1]
        );

        Ok(Self {
            protocol_version,
            model,
            firmware,
            firmware_str,
        })
    }

    /// Whether the firmware predates the oldest supported release
    pub fn firmware_too_old(&self) -> bool {
        self.firmware < MIN_FIRMWARE_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::sample_device;

    #[test]
    fn test_build_header() {
        let header = build_header(0x21, &sample_device());
        assert_eq!(
            header,
            [
                0x21, // opcode
                0x71, // protocol id
                0x0A, // variant
                0x00, // reserved
                0x12, // data memory size >> 8
                0xB1, // opts1 low
                0xD2, // opts2 low
                0xC2, // opts2 high
                0xA1, // opts1 high, copied before opts2 landed
                0xF3, // opts3 low
                0xE3, // opts3 high
            ]
        );
    }

    #[test]
    fn test_word_count_flag() {
        assert_eq!(word_count_flag(18, 4), 2);
        assert_eq!(word_count_flag(18, 2), 1);
        assert_eq!(word_count_flag(99, 4), 1);
        assert_eq!(word_count_flag(opcodes::READ_LOCK, 4), 1);
    }

    #[test]
    fn test_fuse_write_family() {
        assert_eq!(
            FuseWrite::from_opcode(0x12).unwrap(),
            FuseWrite::UnlockWrite { opcode: 0x13 }
        );
        assert_eq!(
            FuseWrite::from_opcode(0x41).unwrap(),
            FuseWrite::DirectWrite { opcode: 0x40 }
        );
        assert_eq!(FuseWrite::from_opcode(0x41).unwrap().frame_len(), 10);
        assert_eq!(FuseWrite::from_opcode(0x12).unwrap().frame_len(), 64);
        assert!(matches!(
            FuseWrite::from_opcode(0x21),
            Err(Tl866Error::UnsupportedOpcodeFamily(0x21))
        ));
    }

    fn sysinfo_response(protocol: u8, model: u8) -> [u8; frame_len::SYSTEM_INFO_RESPONSE] {
        let mut buf = [0u8; frame_len::SYSTEM_INFO_RESPONSE];
        buf[SYSINFO_PROTOCOL] = protocol;
        buf[SYSINFO_FIRMWARE] = 0x56;
        buf[SYSINFO_FIRMWARE + 1] = 0x02;
        buf[SYSINFO_MODEL] = model;
        buf[SYSINFO_FIRMWARE_MAJOR] = 3;
        buf
    }

    #[test]
    fn test_system_info_parse() {
        let info = SystemInfo::parse(&sysinfo_response(2, 2)).unwrap();
        assert_eq!(info.protocol_version, 2);
        assert_eq!(info.model, Model::Tl866Cs);
        assert_eq!(info.firmware, 0x0256);
        assert_eq!(info.firmware_str, "3.86.2");
        assert!(!info.firmware_too_old());
        assert_eq!(info.model.to_string(), "TL866CS");
    }

    #[test]
    fn test_system_info_rejects() {
        assert!(matches!(
            SystemInfo::parse(&sysinfo_response(3, 1)),
            Err(Tl866Error::UnsupportedProtocolVersion(3))
        ));
        assert!(matches!(
            SystemInfo::parse(&sysinfo_response(1, 7)),
            Err(Tl866Error::UnknownDeviceModel(7))
        ));
    }
}
