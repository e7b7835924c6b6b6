//! rminipro-core - Core types for TL866 chip programming
//!
//! This crate holds the pieces of rminipro that do not touch USB: the
//! endian-aware integer codec used to lay out protocol frames, the error
//! type shared by every layer, and the per-chip device descriptors.
//!
//! # Features
//!
//! - `std` - Enable standard library support and the RON device database
//! - `alloc` - Enable heap allocation for owned packing helpers
//!
//! # Example
//!
//! ```
//! use rminipro_core::codec::{pack_into, unpack, Endianness};
//!
//! let mut buf = [0u8; 3];
//! pack_into(&mut buf, 0x123456, 3, Endianness::Little)?;
//! assert_eq!(buf, [0x56, 0x34, 0x12]);
//! assert_eq!(unpack(&buf, 3, Endianness::Little)?, 0x123456);
//! # Ok::<(), rminipro_core::Error>(())
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
#[cfg(feature = "alloc")]
pub mod device;
pub mod error;

pub use error::{Error, Result};
