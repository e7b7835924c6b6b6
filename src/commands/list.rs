//! List commands implementation

use rminipro_core::device::DeviceDatabase;

/// List attached programmers
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = rminipro_tl866::list_devices()?;
    if devices.is_empty() {
        println!("No TL866 programmers found");
        return Ok(());
    }

    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device);
    }
    Ok(())
}

/// List chips in the device database
pub fn list_chips(db: &DeviceDatabase, search: Option<&str>) {
    println!("Supported chips:");
    println!();
    println!(
        "{:<12} {:<20} {:>10} {:>10} {:>10}",
        "Vendor", "Name", "Code", "Data", "Chip ID"
    );
    println!("{}", "-".repeat(66));

    let entries = match search {
        Some(text) => db.search(text),
        None => db.iter().collect(),
    };

    for entry in entries {
        let dev = &entry.descriptor;
        let chip_id = if dev.has_chip_id() {
            format!("{:0width$X}", dev.chip_id, width = dev.chip_id_bytes_count as usize * 2)
        } else {
            "-".to_string()
        };

        println!(
            "{:<12} {:<20} {:>10} {:>10} {:>10}",
            entry.vendor,
            dev.name,
            format_size(dev.code_memory_size),
            format_size(dev.data_memory_size),
            chip_id
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes == 0 {
        "-".to_string()
    } else if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "-");
        assert_eq!(format_size(256), "256 B");
        assert_eq!(format_size(4096), "4 KiB");
        assert_eq!(format_size(1536), "1536 B");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MiB");
    }
}
