//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use rminipro_core::device::MemoryRegion;
use std::path::PathBuf;

/// Parse a hex string such as `E1D9` or `0xE1D9` into bytes
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if hex.is_empty() || hex.len() % 2 != 0 {
        return Err(format!("Expected an even number of hex digits: {}", s));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                .ok_or_else(|| format!("Invalid hex value: {}", s))
        })
        .collect()
}

#[derive(Parser)]
#[command(name = "rminipro")]
#[command(author, version, about = "TL866 universal programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to device database directory or file (.ron)
    /// Defaults to $RMINIPRO_DEVICE_DB, ./devices/, ~/.local/share/rminipro/devices/
    /// or /usr/share/rminipro/devices/, whichever exists first
    #[arg(long, global = true)]
    pub device_db: Option<PathBuf>,

    /// USB options as comma-separated key=value pairs (index, timeout in ms)
    #[arg(long, global = true)]
    pub usb: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Memory region selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Memory {
    Code,
    Data,
}

impl From<Memory> for MemoryRegion {
    fn from(memory: Memory) -> Self {
        match memory {
            Memory::Code => MemoryRegion::Code,
            Memory::Data => MemoryRegion::Data,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached programmers
    ListDevices,

    /// List chips in the device database
    ListChips {
        /// Only show chips whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show programmer model and firmware
    Info {
        /// Chip name
        #[arg(short, long)]
        chip: String,
    },

    /// Check the chip ID of the chip in the socket
    Probe {
        /// Chip name
        #[arg(short, long)]
        chip: String,
    },

    /// Show the programmer status word
    Status {
        /// Chip name
        #[arg(short, long)]
        chip: String,
    },

    /// Read a memory region to file
    Read {
        /// Chip name
        #[arg(short, long)]
        chip: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Memory region to read
        #[arg(short, long, value_enum, default_value_t = Memory::Code)]
        memory: Memory,
    },

    /// Write a file to a memory region
    Write {
        /// Chip name
        #[arg(short, long)]
        chip: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Memory region to write
        #[arg(short, long, value_enum, default_value_t = Memory::Code)]
        memory: Memory,

        /// Read the region back and compare after writing
        #[arg(long)]
        verify: bool,
    },

    /// Read the configuration bytes of the chip
    ReadFuses {
        /// Chip name
        #[arg(short, long)]
        chip: String,
    },

    /// Write and verify the configuration bytes of the chip
    WriteFuses {
        /// Chip name
        #[arg(short, long)]
        chip: String,

        /// New configuration bytes as hex (e.g. 0xE1D9)
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("E1D9").unwrap(), vec![0xE1, 0xD9]);
        assert_eq!(parse_hex_bytes("0x3c").unwrap(), vec![0x3C]);
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("0x").is_err());
        assert!(parse_hex_bytes("ABC").is_err());
        assert!(parse_hex_bytes("ZZ").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "rminipro",
            "--usb",
            "timeout=100",
            "write",
            "-c",
            "AT89S51",
            "-i",
            "fw.bin",
            "--memory",
            "data",
            "--verify",
        ])
        .unwrap();
        assert_eq!(cli.usb.as_deref(), Some("timeout=100"));
        match cli.command {
            Commands::Write {
                chip,
                memory,
                verify,
                ..
            } => {
                assert_eq!(chip, "AT89S51");
                assert!(matches!(memory, Memory::Data));
                assert!(verify);
            }
            _ => panic!("expected write"),
        }

        let cli = Cli::try_parse_from(["rminipro", "write-fuses", "-c", "PIC16F84", "0x3FF1"])
            .unwrap();
        match cli.command {
            Commands::WriteFuses { value, .. } => {
                assert_eq!(parse_hex_bytes(&value).unwrap(), vec![0x3F, 0xF1])
            }
            _ => panic!("expected write-fuses"),
        }
    }
}
