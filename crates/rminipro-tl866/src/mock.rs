//! Scripted transport for protocol tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rminipro_core::device::DeviceDescriptor;

use crate::error::Result;
use crate::transport::Transport;

#[derive(Default)]
struct Inner {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    send_limit: Option<usize>,
}

/// Transport that records sent frames and replays queued responses
///
/// Clones share state, so a test can keep one handle while the session owns
/// another. A `recv` with nothing queued reports zero bytes.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Rc<RefCell<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response returned by `recv`
    pub fn respond(&self, data: impl Into<Vec<u8>>) {
        self.inner.borrow_mut().responses.push_back(data.into());
    }

    /// Make every `send` accept at most `limit` bytes
    pub fn limit_send(&self, limit: usize) {
        self.inner.borrow_mut().send_limit = Some(limit);
    }

    /// Frames sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().sent.clone()
    }

    /// Most recently sent frame
    pub fn last_sent(&self) -> Vec<u8> {
        self.inner.borrow().sent.last().cloned().unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.borrow_mut();
        inner.sent.push(data.to_vec());
        Ok(inner.send_limit.map_or(data.len(), |l| l.min(data.len())))
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(response) = self.inner.borrow_mut().responses.pop_front() else {
            return Ok(0);
        };
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        Ok(response.len())
    }
}

/// Descriptor with distinct bytes in every header field
pub fn sample_device() -> DeviceDescriptor {
    DeviceDescriptor {
        name: "SAMPLE".to_string(),
        protocol_id: 0x71,
        variant: 0x0A,
        code_memory_size: 0x100,
        data_memory_size: 0x1234,
        opts1: 0xA1B1,
        opts2: 0xC2D2,
        opts3: 0xE3F3,
        read_buffer_size: 0x40,
        write_buffer_size: 0x20,
        chip_id: 0x1E_9307,
        chip_id_bytes_count: 3,
        write_unlock: 0x5A,
        fuses: None,
    }
}
