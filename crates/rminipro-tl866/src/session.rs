//! TL866 programming session
//!
//! A [`Session`] owns the bulk transport, the descriptor of the chip in the
//! socket and the frame buffer. Protocol operations are only valid between
//! [`Session::begin_transaction`] and [`Session::end_transaction`]; issuing
//! one outside a transaction is reported as [`Tl866Error::NoActiveTransaction`]
//! before anything reaches the wire.

use rminipro_core::codec::{unpack, Endianness};
use rminipro_core::device::DeviceDescriptor;

use crate::error::{Direction, Result, Tl866Error};
use crate::protocol::*;
use crate::transport::usb::{UsbConfig, UsbTransport};
use crate::transport::Transport;

/// Whether a transaction is open on the programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction; only begin is accepted
    Idle,
    /// Between begin and end; all operations are allowed
    Active,
}

/// Connection to a programmer with a selected target chip
pub struct Session<T: Transport = UsbTransport> {
    transport: T,
    device: DeviceDescriptor,
    state: TransactionState,
    /// Outbound frame, zeroed before each request is assembled
    frame: Vec<u8>,
}

impl Session<UsbTransport> {
    /// Open the first attached programmer for `device`
    pub fn open(device: DeviceDescriptor) -> Result<Self> {
        Self::open_with_config(device, &UsbConfig::default())
    }

    /// Open a programmer with the specified USB options
    pub fn open_with_config(device: DeviceDescriptor, config: &UsbConfig) -> Result<Self> {
        let transport = UsbTransport::open_with_config(config)?;
        Self::new(transport, device)
    }
}

impl<T: Transport> Session<T> {
    /// Create a session over an already opened transport
    pub fn new(transport: T, device: DeviceDescriptor) -> Result<Self> {
        device.validate()?;
        log::debug!("Session for {} (protocol 0x{:02X})", device.name, device.protocol_id);
        Ok(Self {
            transport,
            device,
            state: TransactionState::Idle,
            frame: vec![0u8; MAX_FRAME_LEN],
        })
    }

    /// Descriptor of the selected chip
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// Current transaction state
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Close the session, ending an open transaction first
    pub fn close(mut self) -> Result<()> {
        if self.state == TransactionState::Active {
            self.end_transaction()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frame plumbing
    // ------------------------------------------------------------------

    fn require_active(&self) -> Result<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Idle => Err(Tl866Error::NoActiveTransaction),
        }
    }

    /// Zero the frame buffer and write the common header for `opcode`
    fn start_frame(&mut self, opcode: u8) -> &mut [u8] {
        self.frame.fill(0);
        self.frame[..HEADER_LEN].copy_from_slice(&build_header(opcode, &self.device));
        &mut self.frame
    }

    fn send_frame(&mut self, len: usize) -> Result<()> {
        let data = &self.frame[..len];
        log::debug!("-> opcode 0x{:02X}, {} bytes", data[0], len);
        log::trace!("-> {:02X?}", data);

        let sent = self.transport.send(data)?;
        if sent != len {
            return Err(Tl866Error::ShortTransfer {
                direction: Direction::Out,
                expected: len,
                actual: sent,
            });
        }
        Ok(())
    }

    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let received = self.transport.recv(buf)?;
        if received != buf.len() {
            return Err(Tl866Error::ShortTransfer {
                direction: Direction::In,
                expected: buf.len(),
                actual: received,
            });
        }
        log::trace!("<- {:02X?}", buf);
        Ok(())
    }

    /// Fuse writes are bounded by the unlock-write frame
    fn check_fuse_len(len: usize) -> Result<()> {
        if len == 0 || len > MAX_FUSE_LEN {
            return Err(Tl866Error::InvalidParameter(format!(
                "fuse length {} (expected 1..={})",
                len, MAX_FUSE_LEN
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Start a programming transaction
    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.state == TransactionState::Active {
            return Err(Tl866Error::TransactionActive);
        }
        self.start_frame(opcodes::REQUEST_STATUS1_MSG1);
        self.send_frame(frame_len::BEGIN_TRANSACTION)?;
        self.state = TransactionState::Active;
        Ok(())
    }

    /// Finish the current transaction
    ///
    /// The session returns to idle even when the end frame fails to send.
    pub fn end_transaction(&mut self) -> Result<()> {
        self.require_active()?;
        let frame = self.start_frame(opcodes::END_TRANSACTION);
        frame[3] = 0x00;
        self.state = TransactionState::Idle;
        self.send_frame(frame_len::END_TRANSACTION)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Query the programmer status word
    pub fn get_status(&mut self) -> Result<u16> {
        self.require_active()?;
        self.start_frame(opcodes::REQUEST_STATUS1_MSG2);
        self.send_frame(frame_len::STATUS_REQUEST)?;

        let mut buf = [0u8; frame_len::STATUS_RESPONSE];
        self.recv_exact(&mut buf)?;

        if buf[STATUS_OVERCURRENT] != 0 {
            return Err(Tl866Error::Overcurrent);
        }
        Ok(unpack(&buf[STATUS_CODE..], 2, Endianness::Little)? as u16)
    }

    /// Read one `read_buffer_size` block of the region selected by `opcode`
    pub fn read_block(&mut self, opcode: u8, addr: u32) -> Result<Vec<u8>> {
        self.require_active()?;
        let block_len = self.device.read_buffer_size;
        let frame = self.start_frame(opcode);
        put_le(frame, 2, block_len as u32, 2)?;
        put_le(frame, 4, addr, 3)?;
        self.send_frame(frame_len::READ_BLOCK_REQUEST)?;

        let mut data = vec![0u8; block_len as usize];
        self.recv_exact(&mut data)?;
        Ok(data)
    }

    /// Write one `write_buffer_size` block to the region selected by `opcode`
    ///
    /// The programmer sends no acknowledgement.
    pub fn write_block(&mut self, opcode: u8, addr: u32, payload: &[u8]) -> Result<()> {
        self.require_active()?;
        let block_len = self.device.write_buffer_size as usize;
        if payload.len() != block_len {
            return Err(Tl866Error::InvalidParameter(format!(
                "block of {} bytes (expected {})",
                payload.len(),
                block_len
            )));
        }

        let frame = self.start_frame(opcode);
        put_le(frame, 2, block_len as u32, 2)?;
        put_le(frame, 4, addr, 3)?;
        frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + block_len].copy_from_slice(payload);
        self.send_frame(PAYLOAD_OFFSET + block_len)
    }

    /// Read the ID of the chip in the socket
    pub fn get_chip_id(&mut self) -> Result<u32> {
        self.require_active()?;
        self.start_frame(opcodes::GET_CHIP_ID);
        self.send_frame(frame_len::CHIP_ID_REQUEST)?;

        let id_len = self.device.chip_id_bytes_count as usize;
        let mut buf = [0u8; frame_len::CHIP_ID_RESPONSE_BASE + 4];
        self.recv_exact(&mut buf[..frame_len::CHIP_ID_RESPONSE_BASE + id_len])?;

        if id_len == 0 {
            return Ok(0);
        }
        Ok(unpack(&buf[CHIP_ID_OFFSET..], id_len, Endianness::Big)?)
    }

    /// Check that the chip in the socket is the selected device
    pub fn verify_chip_id(&mut self) -> Result<()> {
        if !self.device.has_chip_id() {
            log::debug!("{} has no chip ID, skipping check", self.device.name);
            return Ok(());
        }
        let found = self.get_chip_id()?;
        if found != self.device.chip_id {
            return Err(Tl866Error::ChipIdMismatch {
                expected: self.device.chip_id,
                found,
            });
        }
        log::info!("Chip ID 0x{:X} matches {}", found, self.device.name);
        Ok(())
    }

    /// Read `length` configuration bytes selected by `opcode`
    pub fn read_fuses(&mut self, opcode: u8, length: usize) -> Result<Vec<u8>> {
        self.require_active()?;
        if length == 0 {
            return Err(Tl866Error::InvalidParameter(
                "fuse length must be non-zero".to_string(),
            ));
        }

        let frame = self.start_frame(opcode);
        frame[2] = word_count_flag(opcode, length);
        frame[5] = FUSE_READ_MARKER;
        self.send_frame(frame_len::FUSE_REQUEST)?;

        let mut buf = vec![0u8; PAYLOAD_OFFSET + length];
        self.recv_exact(&mut buf)?;
        Ok(buf.split_off(PAYLOAD_OFFSET))
    }

    /// Write configuration bytes and confirm them by reading them back
    ///
    /// `opcode` is the read opcode of the region; the write opcode is derived
    /// from its family.
    pub fn write_fuses(&mut self, opcode: u8, payload: &[u8]) -> Result<()> {
        self.require_active()?;
        let length = payload.len();
        Self::check_fuse_len(length)?;
        let write = FuseWrite::from_opcode(opcode)?;

        let frame = self.start_frame(write.opcode());
        if let FuseWrite::UnlockWrite { .. } = write {
            // 2-word PICs report a length of 4 here regardless of opcode
            frame[2] = if length == 4 { 2 } else { 1 };
            frame[4..PAYLOAD_OFFSET].copy_from_slice(&FUSE_UNLOCK_BYTES);
        }
        frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + length].copy_from_slice(payload);
        self.send_frame(write.frame_len())?;

        // The programmer expects the read-back right after the write
        let frame = self.start_frame(opcode);
        frame[2] = word_count_flag(opcode, length);
        frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + length].copy_from_slice(payload);
        self.send_frame(frame_len::FUSE_REQUEST)?;

        let mut buf = vec![0u8; PAYLOAD_OFFSET + length];
        self.recv_exact(&mut buf)?;
        let actual = buf.split_off(PAYLOAD_OFFSET);
        if actual != payload {
            return Err(Tl866Error::VerificationFailed {
                expected: payload.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Query the programmer model and firmware
    pub fn get_system_info(&mut self) -> Result<SystemInfo> {
        self.require_active()?;
        self.frame.fill(0);
        self.frame[0] = opcodes::GET_SYSTEM_INFO;
        self.send_frame(frame_len::SYSTEM_INFO_REQUEST)?;

        let mut buf = [0u8; frame_len::SYSTEM_INFO_RESPONSE];
        self.recv_exact(&mut buf)?;
        let info = SystemInfo::parse(&buf)?;

        if info.firmware_too_old() {
            log::warn!(
                "Firmware {} is too old (0x{:04X} < 0x{:04X})",
                info.firmware_str,
                info.firmware,
                MIN_FIRMWARE_VERSION
            );
        }
        Ok(info)
    }

    /// Put the target into write mode
    pub fn prepare_writing(&mut self) -> Result<()> {
        self.require_active()?;
        let unlock = self.device.write_unlock;
        let frame = self.start_frame(opcodes::PREPARE_WRITING);
        put_le(frame, 2, PREPARE_WRITING_MODE, 2)?;
        frame[2] = unlock;
        self.send_frame(frame_len::PREPARE_WRITING_REQUEST)?;

        // Acknowledgement only
        let mut buf = [0u8; frame_len::PREPARE_WRITING_RESPONSE];
        self.recv_exact(&mut buf)
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            log::warn!("Session dropped inside a transaction, ending it");
            if let Err(e) = self.end_transaction() {
                log::warn!("Failed to end transaction on close: {}", e);
            }
        }
    }
}
