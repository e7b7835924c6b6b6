//! Error types for the TL866 programmer

use thiserror::Error;

/// Result type for TL866 operations
pub type Result<T> = std::result::Result<T, Tl866Error>;

/// Direction of a bulk transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to programmer
    Out,
    /// Programmer to host
    In,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Out => write!(f, "send"),
            Direction::In => write!(f, "receive"),
        }
    }
}

/// Errors that can occur when using the TL866 programmer
#[derive(Debug, Error)]
pub enum Tl866Error {
    /// No programmer attached
    #[error("TL866 device not found (VID:04d8 PID:e11c)")]
    DeviceNotFound,

    /// Failed to open device
    #[error("Failed to open TL866: {0}")]
    OpenFailed(String),

    /// Failed to claim interface or endpoints
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Fewer bytes moved than the frame requires
    #[error("IO error: {direction} expected {expected} bytes but {actual} bytes transferred")]
    ShortTransfer {
        direction: Direction,
        expected: usize,
        actual: usize,
    },

    /// Overcurrent protection tripped on the target socket
    #[error("Overcurrent protection")]
    Overcurrent,

    /// Programmer speaks a protocol version this driver does not know
    #[error("Protocol version error: {0}")]
    UnsupportedProtocolVersion(u8),

    /// Programmer reported an unknown hardware model
    #[error("Unknown device model: {0}")]
    UnknownDeviceModel(u8),

    /// Configuration bytes read back differ from what was written
    #[error("Failed while writing config bytes: wrote {expected:02X?}, read back {actual:02X?}")]
    VerificationFailed { expected: Vec<u8>, actual: Vec<u8> },

    /// Fuse write opcode belongs to no known write family
    #[error("Unsupported fuse opcode family for opcode 0x{0:02X}")]
    UnsupportedOpcodeFamily(u8),

    /// Chip in the socket does not match the selected device
    #[error("Chip ID mismatch: expected 0x{expected:X}, found 0x{found:X}")]
    ChipIdMismatch { expected: u32, found: u32 },

    /// Operation issued outside a transaction
    #[error("No active transaction")]
    NoActiveTransaction,

    /// Transaction started while another one is active
    #[error("Transaction already active")]
    TransactionActive,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] rminipro_core::Error),
}

impl Tl866Error {
    /// Whether the error happened while acquiring the programmer
    pub fn is_resource_init(&self) -> bool {
        matches!(
            self,
            Tl866Error::DeviceNotFound | Tl866Error::OpenFailed(_) | Tl866Error::ClaimFailed(_)
        )
    }

    /// Whether the error is a failed or short bulk transfer
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Tl866Error::TransferFailed(_) | Tl866Error::ShortTransfer { .. }
        )
    }
}

impl From<nusb::Error> for Tl866Error {
    fn from(e: nusb::Error) -> Self {
        Tl866Error::TransferFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let init = [
            Tl866Error::DeviceNotFound,
            Tl866Error::OpenFailed("busy".to_string()),
            Tl866Error::ClaimFailed("in use".to_string()),
        ];
        for e in &init {
            assert!(e.is_resource_init());
            assert!(!e.is_io());
        }

        let io = [
            Tl866Error::TransferFailed("stall".to_string()),
            Tl866Error::ShortTransfer {
                direction: Direction::In,
                expected: 32,
                actual: 0,
            },
        ];
        for e in &io {
            assert!(e.is_io());
            assert!(!e.is_resource_init());
        }

        assert!(!Tl866Error::Overcurrent.is_io());
        assert!(!Tl866Error::NoActiveTransaction.is_resource_init());
    }

    #[test]
    fn test_short_transfer_message() {
        let e = Tl866Error::ShortTransfer {
            direction: Direction::Out,
            expected: 48,
            actual: 10,
        };
        assert_eq!(
            e.to_string(),
            "IO error: send expected 48 bytes but 10 bytes transferred"
        );
    }
}
