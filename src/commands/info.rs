//! Programmer and chip identification commands

use super::in_transaction;
use rminipro_tl866::Session;

/// Print programmer model and firmware
pub fn cmd_info(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let info = in_transaction(session, |s| Ok(s.get_system_info()?))?;

    println!("Programmer: {}", info.model);
    println!("Protocol:   {}", info.protocol_version);
    println!("Firmware:   {} (0x{:04X})", info.firmware_str, info.firmware);
    if info.firmware_too_old() {
        println!("Warning: firmware is too old, please update");
    }
    Ok(())
}

/// Compare the chip ID in the socket with the selected device
pub fn cmd_probe(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let name = session.device().name.clone();
    if !session.device().has_chip_id() {
        println!("{} has no chip ID", name);
        return Ok(());
    }

    in_transaction(session, |s| Ok(s.verify_chip_id()?))?;
    println!("Found: {} (ID 0x{:X})", name, session.device().chip_id);
    Ok(())
}

/// Print the programmer status word
pub fn cmd_status(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let status = in_transaction(session, |s| Ok(s.get_status()?))?;
    println!("Status: 0x{:04X}", status);
    Ok(())
}
