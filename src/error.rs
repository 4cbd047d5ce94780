//! Error taxonomy for the session and transport bridge
//!
//! Acquisition failures, transfer failures, and the POSIX errno values they
//! surface as are kept as separate types: `AcquireError` carries enough
//! context for the logs, while the glue layer only ever sees an [`Errno`].

use std::fmt;
use thiserror::Error;

/// Failure to take exclusive ownership of the USB device.
///
/// Acquisition runs on the first open (and on the startup probe); every
/// variant is reported to that one caller as `EIO` and leaves the session
/// closed. The process keeps running so a later open can retry.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("could not find device {vendor_id:04x}:{product_id:04x}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("could not set configuration: {0}")]
    SetConfiguration(#[source] rusb::Error),

    #[error("could not claim interface {interface}: {source}")]
    ClaimInterface {
        interface: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

/// Failure of a single data transfer.
///
/// A timed-out bulk IN is not represented here: the USB transport normalizes
/// it to an empty successful read before an error could be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Hard transport failure mid-transfer. Not retried.
    #[error("I/O error: {0}")]
    Io(String),

    /// Write does not fit the fixed-capacity backing store.
    #[error("write exceeds fixed capacity")]
    NoSpace,

    /// Growable backing store could not allocate the new size. The store is
    /// left unchanged.
    #[error("backing store allocation failed")]
    OutOfMemory,
}

/// POSIX error number surfaced to the calling program via the glue layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    pub const EIO: Errno = Errno(libc::EIO);
    pub const ENOSPC: Errno = Errno(libc::ENOSPC);
    pub const ENOMEM: Errno = Errno(libc::ENOMEM);
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            libc::EIO => f.write_str("EIO"),
            libc::ENOSPC => f.write_str("ENOSPC"),
            libc::ENOMEM => f.write_str("ENOMEM"),
            other => write!(f, "errno {}", other),
        }
    }
}

impl From<&TransferError> for Errno {
    fn from(err: &TransferError) -> Self {
        match err {
            TransferError::Io(_) => Errno::EIO,
            TransferError::NoSpace => Errno::ENOSPC,
            TransferError::OutOfMemory => Errno::ENOMEM,
        }
    }
}
