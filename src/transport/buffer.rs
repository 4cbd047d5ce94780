//! In-memory backing stores for emulation and testing
//!
//! Two variants stand in for the physical device: a growable store with
//! sparse semantics (reads beyond any prior write return zeros) and a
//! degenerate fixed-capacity store with no offset tracking. Both live for
//! the whole process, so device state persists across open/close cycles.

use super::Transport;
use crate::error::{AcquireError, TransferError};
use tracing::debug;

/// Growable backing store. The vector's length is the logical size; growth
/// zero-fills the newly exposed region before a write lands.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current logical size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl Transport for GrowableBuffer {
    fn acquire(&mut self) -> Result<(), AcquireError> {
        Ok(())
    }

    fn release(&mut self) {}

    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        // Anything at or past the logical size reads as empty, never an error.
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(Vec::new());
        };
        if offset >= self.data.len() {
            return Ok(Vec::new());
        }
        let end = offset.saturating_add(len).min(self.data.len());
        Ok(self.data[offset..end].to_vec())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, TransferError> {
        let offset = usize::try_from(offset).map_err(|_| TransferError::OutOfMemory)?;
        let end = offset
            .checked_add(data.len())
            .ok_or(TransferError::OutOfMemory)?;

        if end > self.data.len() {
            // Reserve before resizing so a failed allocation leaves both the
            // contents and the logical size untouched.
            let extra = end - self.data.len();
            self.data
                .try_reserve(extra)
                .map_err(|_| TransferError::OutOfMemory)?;
            self.data.resize(end, 0);
            debug!(size = self.data.len(), "backing store grown");
        }

        self.data[offset..end].copy_from_slice(data);
        Ok(data.len())
    }
}

/// Fixed-capacity backing store. No offset tracking: every write lands at
/// offset zero, and a write larger than the capacity is refused outright.
#[derive(Debug)]
pub struct FixedBuffer {
    data: Vec<u8>,
}

impl FixedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl Transport for FixedBuffer {
    fn acquire(&mut self) -> Result<(), AcquireError> {
        Ok(())
    }

    fn release(&mut self) {}

    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let Ok(offset) = usize::try_from(offset) else {
            return Ok(Vec::new());
        };
        if offset >= self.data.len() {
            return Ok(Vec::new());
        }
        let end = offset.saturating_add(len).min(self.data.len());
        Ok(self.data[offset..end].to_vec())
    }

    fn write(&mut self, _offset: u64, data: &[u8]) -> Result<usize, TransferError> {
        if data.len() > self.data.len() {
            return Err(TransferError::NoSpace);
        }
        self.data[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }
}
