//! Write command implementation

use super::read::read_region_with_progress;
use super::{in_transaction, write_opcode};
use indicatif::{ProgressBar, ProgressStyle};
use rminipro_core::device::MemoryRegion;
use rminipro_tl866::Session;
use std::path::Path;

/// Fill value for the unused tail of the last block
const ERASED: u8 = 0xFF;

/// Run the write command
pub fn run_write(
    session: &mut Session,
    region: MemoryRegion,
    input: &Path,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let device = session.device();
    let region_size = device.memory_size(region) as usize;

    if data.len() > region_size {
        return Err(format!(
            "File size ({} bytes) exceeds {} {} memory ({} bytes)",
            data.len(),
            device.name,
            region,
            region_size
        )
        .into());
    }

    let image = pad_to_blocks(&data, device.write_buffer_size as usize);
    println!("Writing {} bytes to {} memory...", data.len(), region);

    in_transaction(session, |s| {
        s.prepare_writing()?;
        write_blocks_with_progress(s, region, &image)
    })?;

    if verify {
        println!("Verifying...");
        let readback = in_transaction(session, |s| read_region_with_progress(s, region))?;
        if let Some(offset) = first_mismatch(&data, &readback) {
            return Err(format!("Verification failed at offset 0x{:X}", offset).into());
        }
        println!("Verification passed");
    }

    println!("Write complete");
    Ok(())
}

fn write_blocks_with_progress(
    session: &mut Session,
    region: MemoryRegion,
    image: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let block_size = session.device().write_buffer_size as usize;
    let opcode = write_opcode(region);

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    for (i, block) in image.chunks(block_size).enumerate() {
        let addr = i * block_size;
        session.write_block(opcode, addr as u32, block)?;
        pb.set_position((addr + block.len()) as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

/// Pad `data` with erased bytes up to a whole number of blocks
fn pad_to_blocks(data: &[u8], block_size: usize) -> Vec<u8> {
    let len = data.len().div_ceil(block_size) * block_size;
    let mut image = data.to_vec();
    image.resize(len, ERASED);
    image
}

/// Offset of the first byte in `expected` that differs in `actual`
fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or_else(|| (actual.len() < expected.len()).then_some(actual.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_blocks() {
        assert_eq!(pad_to_blocks(&[1, 2, 3], 4), vec![1, 2, 3, 0xFF]);
        assert_eq!(pad_to_blocks(&[1, 2, 3, 4], 4), vec![1, 2, 3, 4]);
        assert_eq!(pad_to_blocks(&[1, 2, 3, 4, 5], 4).len(), 8);
        assert!(pad_to_blocks(&[], 4).is_empty());
    }

    #[test]
    fn test_first_mismatch() {
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 2, 3, 0xFF]), None);
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 9, 3]), Some(1));
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 2]), Some(2));
    }
}
