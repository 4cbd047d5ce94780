//! Session lifecycle over the transport
//!
//! Tracks how many file handles currently have the device node open. The
//! first open acquires the device (reset, configure, claim); the last
//! release gives it back. All calls arrive on the single service thread,
//! so the count needs no locking.

use crate::error::AcquireError;
use crate::transport::Transport;
use tracing::{debug, info, warn};

pub struct Session {
    transport: Box<dyn Transport>,
    open_count: u32,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            open_count: 0,
        }
    }

    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    pub fn is_open(&self) -> bool {
        self.open_count > 0
    }

    /// Handle an open request. Acquisition runs only on the closed-to-open
    /// transition; a failure leaves the session closed with the count
    /// unchanged, and a later open retries from scratch.
    pub fn open(&mut self) -> Result<(), AcquireError> {
        if self.open_count == 0 {
            self.transport.acquire()?;
            info!("device acquired");
        }
        self.open_count += 1;
        debug!(open_count = self.open_count, "file handle opened");
        Ok(())
    }

    /// Handle a release request. Never fails from the caller's point of
    /// view; the transport is released only when the last handle closes.
    pub fn release(&mut self) {
        match self.open_count {
            0 => warn!("release with no open handles"),
            1 => {
                self.open_count = 0;
                self.transport.release();
                info!("last handle closed, device released");
            }
            _ => {
                self.open_count -= 1;
                debug!(open_count = self.open_count, "file handle closed");
            }
        }
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }
}
