//! Read command implementation

use super::{in_transaction, read_opcode};
use indicatif::{ProgressBar, ProgressStyle};
use rminipro_core::device::MemoryRegion;
use rminipro_tl866::Session;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Run the read command
pub fn run_read(
    session: &mut Session,
    region: MemoryRegion,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = in_transaction(session, |s| read_region_with_progress(s, region))?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Read a whole memory region with progress bar
pub fn read_region_with_progress(
    session: &mut Session,
    region: MemoryRegion,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let device = session.device();
    let total_size = device.memory_size(region) as usize;
    if total_size == 0 {
        return Err(format!("{} has no {} memory", device.name, region).into());
    }
    let block_size = device.read_buffer_size as usize;
    let opcode = read_opcode(region);

    let pb = ProgressBar::new(total_size as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut data = Vec::with_capacity(total_size);
    while data.len() < total_size {
        let block = session.read_block(opcode, data.len() as u32)?;
        // The last block may run past the end of the region
        let take = block_size.min(total_size - data.len());
        data.extend_from_slice(&block[..take]);
        pb.set_position(data.len() as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
