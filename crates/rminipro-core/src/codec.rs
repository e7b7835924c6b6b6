//! Endian-aware packing of fixed-width integers
//!
//! Protocol frames carry 1 to 4 byte integer fields. Most of them are
//! little-endian; the chip ID is the one big-endian field. Values wider than
//! the target field are truncated to their low-order bytes, which is what
//! the programmer firmware expects.

use crate::error::{Error, Result};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Largest integer field the protocol uses
pub const MAX_WIDTH: usize = 4;

/// Byte order of a packed integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

fn check(len: usize, width: usize) -> Result<()> {
    if !(1..=MAX_WIDTH).contains(&width) {
        return Err(Error::InvalidWidth(width));
    }
    if len < width {
        return Err(Error::BufferTooSmall);
    }
    Ok(())
}

/// Write the low `width` bytes of `value` to the start of `dst`
///
/// Bytes of `value` above `width` are dropped.
pub fn pack_into(dst: &mut [u8], value: u32, width: usize, endianness: Endianness) -> Result<()> {
    check(dst.len(), width)?;

    let le = value.to_le_bytes();
    for (i, byte) in dst[..width].iter_mut().enumerate() {
        *byte = match endianness {
            Endianness::Little => le[i],
            Endianness::Big => le[width - 1 - i],
        };
    }
    Ok(())
}

/// Pack the low `width` bytes of `value` into a new buffer
#[cfg(feature = "alloc")]
pub fn pack(value: u32, width: usize, endianness: Endianness) -> Result<Vec<u8>> {
    let mut out = alloc::vec![0u8; width.min(MAX_WIDTH)];
    pack_into(&mut out, value, width, endianness)?;
    Ok(out)
}

/// Read a `width`-byte integer from the start of `src`
pub fn unpack(src: &[u8], width: usize, endianness: Endianness) -> Result<u32> {
    check(src.len(), width)?;

    let bytes = &src[..width];
    let value = match endianness {
        Endianness::Little => bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32),
        Endianness::Big => bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_little_endian() {
        let mut buf = [0u8; 4];
        pack_into(&mut buf, 0x1234_5678, 4, Endianness::Little).unwrap();
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);

        let mut buf = [0u8; 2];
        pack_into(&mut buf, 0x0256, 2, Endianness::Little).unwrap();
        assert_eq!(buf, [0x56, 0x02]);
    }

    #[test]
    fn test_pack_big_endian() {
        let mut buf = [0u8; 3];
        pack_into(&mut buf, 0x1E_9502, 3, Endianness::Big).unwrap();
        assert_eq!(buf, [0x1E, 0x95, 0x02]);
    }

    #[test]
    fn test_pack_truncates() {
        let mut buf = [0xAAu8; 3];
        pack_into(&mut buf, 0xDEAD_BEEF, 2, Endianness::Little).unwrap();
        // Only the low two bytes are written, the third is untouched
        assert_eq!(buf, [0xEF, 0xBE, 0xAA]);

        pack_into(&mut buf, 0xDEAD_BEEF, 1, Endianness::Big).unwrap();
        assert_eq!(buf[0], 0xEF);
    }

    #[test]
    fn test_invalid_width() {
        let mut buf = [0u8; 8];
        assert_eq!(
            pack_into(&mut buf, 1, 0, Endianness::Little),
            Err(Error::InvalidWidth(0))
        );
        assert_eq!(
            pack_into(&mut buf, 1, 5, Endianness::Big),
            Err(Error::InvalidWidth(5))
        );
        assert_eq!(unpack(&buf, 5, Endianness::Little), Err(Error::InvalidWidth(5)));
    }

    #[test]
    fn test_short_buffer() {
        let mut buf = [0u8; 2];
        assert_eq!(
            pack_into(&mut buf, 1, 3, Endianness::Little),
            Err(Error::BufferTooSmall)
        );
        assert_eq!(unpack(&buf, 4, Endianness::Big), Err(Error::BufferTooSmall));
    }

    #[test]
    fn test_round_trip() {
        let samples = [0u32, 1, 0x7F, 0x80, 0xFF, 0x100, 0xBEEF, 0x12_3456, 0xFFFF_FFFF];
        for width in 1..=MAX_WIDTH {
            let mask = if width == 4 {
                u32::MAX
            } else {
                (1u32 << (8 * width)) - 1
            };
            for endianness in [Endianness::Little, Endianness::Big] {
                for &v in &samples {
                    let mut buf = [0u8; MAX_WIDTH];
                    pack_into(&mut buf, v, width, endianness).unwrap();
                    assert_eq!(unpack(&buf, width, endianness).unwrap(), v & mask);
                }
            }
        }
    }

    #[cfg(feature = "alloc")]
    #[test]
    fn test_pack_owned() {
        assert_eq!(pack(0x0102, 2, Endianness::Big).unwrap(), [0x01, 0x02]);
        assert_eq!(pack(1, 9, Endianness::Big), Err(Error::InvalidWidth(9)));
    }
}
