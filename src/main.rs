//! rminipro - TL866 universal programmer
//!
//! Reads and writes EPROMs, EEPROMs, flash chips and microcontrollers through
//! the TL866A/TL866CS USB programmer. Chip parameters come from a RON device
//! database; every command that talks to a chip needs its name (`-c`).

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rminipro_core::device::DeviceDatabase;
use rminipro_tl866::{parse_options, Session, UsbConfig};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli {
        verbose,
        device_db,
        usb,
        command,
    } = Cli::parse();

    // Set log level based on verbosity
    match verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let usb = parse_usb_options(usb.as_deref())?;
    let db_path = device_db.as_deref();

    match command {
        Commands::ListDevices => commands::list_devices(),
        Commands::ListChips { search } => {
            let db = load_device_database(db_path)?;
            commands::list_chips(&db, search.as_deref());
            Ok(())
        }
        Commands::Info { chip } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::info::cmd_info(&mut session)
        }
        Commands::Probe { chip } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::info::cmd_probe(&mut session)
        }
        Commands::Status { chip } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::info::cmd_status(&mut session)
        }
        Commands::Read {
            chip,
            output,
            memory,
        } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::read::run_read(&mut session, memory.into(), &output)
        }
        Commands::Write {
            chip,
            input,
            memory,
            verify,
        } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::write::run_write(&mut session, memory.into(), &input, verify)
        }
        Commands::ReadFuses { chip } => {
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::fuses::cmd_read(&mut session)
        }
        Commands::WriteFuses { chip, value } => {
            let value = cli::parse_hex_bytes(&value)?;
            let mut session = open_session(db_path, &chip, &usb)?;
            commands::fuses::cmd_write(&mut session, &value)
        }
    }
}

/// Turn `index=1,timeout=500` into a USB configuration
fn parse_usb_options(options: Option<&str>) -> Result<UsbConfig, Box<dyn std::error::Error>> {
    let mut pairs = Vec::new();
    for opt in options.unwrap_or("").split(',').filter(|o| !o.is_empty()) {
        let pair = opt
            .split_once('=')
            .ok_or_else(|| format!("Invalid USB option (expected key=value): {}", opt))?;
        pairs.push(pair);
    }
    Ok(parse_options(&pairs)?)
}

/// Look up `chip` and open a programmer session for it
fn open_session(
    db_path: Option<&Path>,
    chip: &str,
    usb: &UsbConfig,
) -> Result<Session, Box<dyn std::error::Error>> {
    let db = load_device_database(db_path)?;
    let device = db
        .find_by_name(chip)
        .ok_or_else(|| format!("Unknown chip: {} (see list-chips)", chip))?
        .clone();

    log::info!("Using {}", device.name);
    Ok(Session::open_with_config(device, usb)?)
}

/// Places searched for the device database when `--device-db` is not given
fn database_candidates() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = std::env::var_os("RMINIPRO_DEVICE_DB") {
        dirs.push(PathBuf::from(dir));
    }
    dirs.push(PathBuf::from("devices"));
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(Path::new(&home).join(".local/share/rminipro/devices"));
    }
    dirs.push(PathBuf::from("/usr/share/rminipro/devices"));
    dirs
}

/// Load the device database from `path` or the first candidate that exists
///
/// Only one database is used; a broken file in it is an error.
fn load_device_database(
    path: Option<&Path>,
) -> Result<DeviceDatabase, Box<dyn std::error::Error>> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match database_candidates().into_iter().find(|p| p.exists()) {
            Some(path) => path,
            None => {
                log::warn!("No device database found, use --device-db or RMINIPRO_DEVICE_DB");
                return Ok(DeviceDatabase::new());
            }
        },
    };

    let mut db = DeviceDatabase::new();
    let count = if path.is_dir() {
        db.load_dir(&path)?
    } else if path.is_file() {
        db.load_file(&path)?
    } else {
        return Err(format!("Device database not found: {}", path.display()).into());
    };

    log::debug!("Device database {}: {} devices", path.display(), count);
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usb_options() {
        let config = parse_usb_options(None).unwrap();
        assert_eq!(config.index, 0);

        let config = parse_usb_options(Some("index=1,timeout=500")).unwrap();
        assert_eq!(config.index, 1);
        assert_eq!(config.timeout, std::time::Duration::from_millis(500));

        assert!(parse_usb_options(Some("index")).is_err());
        assert!(parse_usb_options(Some("speed=fast")).is_err());
    }

    #[test]
    fn test_missing_database_path() {
        assert!(load_device_database(Some(Path::new("/nonexistent/rminipro"))).is_err());
    }

    #[test]
    fn test_load_database_dir() {
        let dir = std::env::temp_dir().join(format!("rminipro-db-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("microchip.ron"),
            r#"(
                vendor: "Microchip",
                devices: [
                    (
                        name: "PIC16F84A",
                        protocol_id: 0x63,
                        code_memory_size: B(2048),
                        data_memory_size: B(64),
                        read_buffer_size: 0x80,
                        write_buffer_size: 0x20,
                        fuses: Some((opcode: 0x12, length: 2)),
                    ),
                ],
            )"#,
        )
        .unwrap();
        // Ignored: not a .ron file
        std::fs::write(dir.join("README"), "devices").unwrap();

        let db = load_device_database(Some(&dir));
        std::fs::remove_dir_all(&dir).unwrap();

        let db = db.unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.find_by_name("pic16f84a").unwrap().data_memory_size, 64);
    }
}
