//! Configuration byte commands

use super::in_transaction;
use rminipro_core::device::FuseRegion;
use rminipro_tl866::Session;

fn fuse_region(session: &Session) -> Result<FuseRegion, Box<dyn std::error::Error>> {
    session
        .device()
        .fuses
        .ok_or_else(|| format!("{} has no configuration bytes", session.device().name).into())
}

/// Print the configuration bytes
pub fn cmd_read(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let region = fuse_region(session)?;
    let fuses = in_transaction(session, |s| {
        Ok(s.read_fuses(region.opcode, region.length as usize)?)
    })?;

    println!("Configuration bytes: {}", hex(&fuses));
    Ok(())
}

/// Write the configuration bytes; the session verifies them by reading back
pub fn cmd_write(session: &mut Session, value: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let region = fuse_region(session)?;
    if value.len() != region.length as usize {
        return Err(format!(
            "Expected {} configuration bytes, got {}",
            region.length,
            value.len()
        )
        .into());
    }

    in_transaction(session, |s| Ok(s.write_fuses(region.opcode, value)?))?;
    println!("Wrote configuration bytes: {}", hex(value));
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
