//! rusb-backed bulk transport
//!
//! Wraps a `rusb::DeviceHandle` for one device and one interface: the
//! startup probe finds the device and detaches any competing kernel driver,
//! `acquire` resets and claims it for the first open, and the data path is
//! a pair of timeout-bounded bulk transfers.

use super::Transport;
use crate::config::DeviceSettings;
use crate::error::{AcquireError, TransferError};
use rusb::{Context, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, warn};

pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
    timeout: Duration,
}

impl UsbTransport {
    /// Find and open the device. Failure here is fatal to startup: there is
    /// no point registering a device node with nothing behind it.
    pub fn probe(settings: &DeviceSettings) -> Result<Self, AcquireError> {
        let context = Context::new()?;

        let handle = context
            .open_device_with_vid_pid(settings.vendor_id, settings.product_id)
            .ok_or(AcquireError::DeviceNotFound {
                vendor_id: settings.vendor_id,
                product_id: settings.product_id,
            })?;

        // Best effort: the driver may simply not be attached.
        match handle.detach_kernel_driver(settings.interface) {
            Ok(()) => debug!(interface = settings.interface, "detached kernel driver"),
            Err(e) => debug!(
                interface = settings.interface,
                "kernel driver not detached: {}", e
            ),
        }

        debug!(
            "opened USB device {:04x}:{:04x}",
            settings.vendor_id, settings.product_id
        );

        Ok(Self {
            handle,
            interface: settings.interface,
            endpoint_in: settings.endpoint_in,
            endpoint_out: settings.endpoint_out,
            timeout: Duration::from_millis(settings.timeout_ms),
        })
    }
}

impl Transport for UsbTransport {
    fn acquire(&mut self) -> Result<(), AcquireError> {
        // The device wants a reset before reconfiguration; a failed reset
        // is not fatal on its own.
        if let Err(e) = self.handle.reset() {
            warn!("device reset failed: {}", e);
        } else {
            debug!("USB: reset");
        }

        self.handle
            .set_active_configuration(1)
            .map_err(AcquireError::SetConfiguration)?;

        self.handle
            .claim_interface(self.interface)
            .map_err(|source| AcquireError::ClaimInterface {
                interface: self.interface,
                source,
            })?;

        debug!(interface = self.interface, "claimed interface");
        Ok(())
    }

    fn release(&mut self) {
        // No client is left to report to; log and move on.
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!(interface = self.interface, "failed to release interface: {}", e);
        } else {
            debug!(interface = self.interface, "released interface");
        }
    }

    fn read(&mut self, _offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let mut buf = vec![0u8; len];
        match self.handle.read_bulk(self.endpoint_in, &mut buf, self.timeout) {
            Ok(actual) => {
                buf.truncate(actual);
                Ok(buf)
            }
            // A stalled device reads as "no data yet", not as a failure.
            Err(rusb::Error::Timeout) => Ok(Vec::new()),
            Err(e) => Err(TransferError::Io(e.to_string())),
        }
    }

    fn write(&mut self, _offset: u64, data: &[u8]) -> Result<usize, TransferError> {
        // Unlike reads, a timed-out write really did fail to deliver.
        match self.handle.write_bulk(self.endpoint_out, data, self.timeout) {
            Ok(actual) => Ok(actual),
            Err(e) => Err(TransferError::Io(e.to_string())),
        }
    }
}
