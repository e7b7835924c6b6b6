//! rminipro-tl866 - TL866 universal programmer support
//!
//! This crate drives the TL866A/TL866CS USB programmer over its bulk
//! endpoints.
//!
//! # Protocol Overview
//!
//! Every request is a single bulk OUT frame. It starts with an 11-byte
//! header carrying the opcode and the parameters of the chip in the socket
//! (protocol id, variant, option words). Requests that expect an answer are
//! followed by one bulk IN transfer of a fixed length. All programming
//! operations must happen inside a transaction opened with
//! [`Session::begin_transaction`].
//!
//! # Example
//!
//! ```no_run
//! use rminipro_core::device::DeviceDatabase;
//! use rminipro_tl866::protocol::opcodes;
//! use rminipro_tl866::Session;
//!
//! let mut db = DeviceDatabase::new();
//! db.load_dir("devices".as_ref())?;
//! let device = db.find_by_name("AT89S51").ok_or("unknown chip")?.clone();
//!
//! let mut session = Session::open(device)?;
//! session.begin_transaction()?;
//! println!("{}", session.get_system_info()?.model);
//! let block = session.read_block(opcodes::READ_CODE, 0)?;
//! session.end_transaction()?;
//! println!("{:02X?}", block);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
#[cfg(test)]
mod mock;
pub mod protocol;
mod session;
pub mod transport;

pub use error::{Direction, Result, Tl866Error};
pub use protocol::{FuseWrite, Model, SystemInfo};
pub use session::{Session, TransactionState};
pub use transport::usb::{list_devices, parse_options, UsbConfig, UsbDeviceInfo, UsbTransport};
pub use transport::Transport;
