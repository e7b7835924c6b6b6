//! Target chip descriptors and database
//!
//! Every chip the programmer supports is described by a [`DeviceDescriptor`]:
//! the protocol family, memory geometry and option words the firmware needs
//! in each command header. Descriptors are loaded once from the database and
//! never modified afterwards.

mod types;

#[cfg(feature = "std")]
mod database;

pub use types::*;

#[cfg(feature = "std")]
pub use database::*;
