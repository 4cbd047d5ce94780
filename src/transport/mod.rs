//! Byte transports backing the character device
//!
//! A transport is the data source/sink behind the device node: either the
//! real USB bulk endpoint pair or an in-memory backing store used for
//! emulation and testing. The session manager drives the lifecycle
//! (`acquire`/`release`); the I/O bridge drives the data path.

pub mod buffer;
pub mod usb;

pub use buffer::{FixedBuffer, GrowableBuffer};
pub use usb::UsbTransport;

use crate::error::{AcquireError, TransferError};

/// Largest number of bytes moved by a single transfer call. Larger requests
/// are clamped or rejected by the caller; transports never loop internally.
pub const MAX_CHUNK: usize = 0x1000;

/// Transfer direction, as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host (bulk IN).
    In,
    /// Host to device (bulk OUT).
    Out,
}

/// A byte-oriented transfer endpoint pair.
///
/// `read` and `write` take an offset because the buffer-backed stores are
/// offset-addressable; the USB transport is a stream and ignores it.
pub trait Transport: Send {
    /// Take exclusive ownership of the device. Called on the first open;
    /// on failure the caller must not proceed to data transfer.
    fn acquire(&mut self) -> Result<(), AcquireError>;

    /// Give the device back. Invoked only when the last handle closes;
    /// failure is logged, not propagated.
    fn release(&mut self);

    /// Transfer up to `len` bytes in. A short or empty result is valid data,
    /// not an error.
    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError>;

    /// Transfer `data` out, returning the number of bytes accepted.
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, TransferError>;
}
