//! CLI command implementations
//!
//! Each command opens its own transaction and closes it again before
//! returning, also when the operation fails.

pub mod fuses;
pub mod info;
mod list;
pub mod read;
pub mod write;

pub use list::{list_chips, list_devices};

use rminipro_core::device::MemoryRegion;
use rminipro_tl866::protocol::opcodes;
use rminipro_tl866::Session;

/// Opcode reading blocks of `region`
fn read_opcode(region: MemoryRegion) -> u8 {
    match region {
        MemoryRegion::Code => opcodes::READ_CODE,
        MemoryRegion::Data => opcodes::READ_DATA,
    }
}

/// Opcode writing blocks of `region`
fn write_opcode(region: MemoryRegion) -> u8 {
    match region {
        MemoryRegion::Code => opcodes::WRITE_CODE,
        MemoryRegion::Data => opcodes::WRITE_DATA,
    }
}

/// Run `f` between begin and end of a transaction
fn in_transaction<R>(
    session: &mut Session,
    f: impl FnOnce(&mut Session) -> Result<R, Box<dyn std::error::Error>>,
) -> Result<R, Box<dyn std::error::Error>> {
    session.begin_transaction()?;
    let result = f(session);
    let end = session.end_transaction();
    let value = result?;
    end?;
    Ok(value)
}
