//! Error types for rminipro-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Codec errors
    /// Integer width outside the supported 1..=4 byte range
    InvalidWidth(usize),
    /// Provided buffer is too small for the operation
    BufferTooSmall,

    // Descriptor errors
    /// Chip ID is wider than the 4 bytes the protocol can carry
    ChipIdTooWide(u8),
    /// Transfer block size does not fit a protocol frame
    InvalidBufferSize(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWidth(w) => write!(f, "invalid integer width {} (expected 1..=4)", w),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::ChipIdTooWide(n) => write!(f, "chip ID of {} bytes exceeds 4 bytes", n),
            Self::InvalidBufferSize(n) => write!(f, "invalid transfer block size {}", n),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
