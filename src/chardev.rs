//! Character-device request plumbing
//!
//! The kernel-side registration mechanism is an external collaborator: glue
//! code registers the node with [`Registration`] parameters, then drives a
//! [`DeviceOps`] handle from its open/read/write/release callbacks. Each
//! request carries the destination for its reply, and each produces exactly
//! one reply.
//!
//! All requests funnel into a single [`ServiceLoop`] thread, which is what
//! serializes every operation on the device: the session count and backing
//! store are only ever touched from that thread, so they need no locking.

use crate::bridge::FileBridge;
use crate::error::Errno;
use async_channel::{Receiver, Sender, bounded};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Parameters forwarded opaquely to the registration call.
#[derive(Debug, Clone)]
pub struct Registration {
    pub major: u32,
    pub minor: u32,
    pub name: String,
}

/// One file operation, with the channel its reply must go to.
#[derive(Debug)]
pub enum FileRequest {
    Open {
        reply: oneshot::Sender<Result<(), Errno>>,
    },
    Read {
        len: usize,
        offset: u64,
        reply: oneshot::Sender<Result<Vec<u8>, Errno>>,
    },
    Write {
        data: Vec<u8>,
        offset: u64,
        reply: oneshot::Sender<Result<usize, Errno>>,
    },
    Release {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle the registration glue calls from its callbacks.
///
/// Every method blocks until the service thread replies, which is exactly
/// the semantics of a kernel callback that must answer before returning.
#[derive(Debug, Clone)]
pub struct DeviceOps {
    req_tx: Sender<FileRequest>,
}

impl DeviceOps {
    pub fn open(&self) -> Result<(), Errno> {
        let (tx, rx) = oneshot::channel();
        self.send(FileRequest::Open { reply: tx })?;
        rx.blocking_recv().unwrap_or(Err(Errno::EIO))
    }

    pub fn read(&self, len: usize, offset: u64) -> Result<Vec<u8>, Errno> {
        let (tx, rx) = oneshot::channel();
        self.send(FileRequest::Read {
            len,
            offset,
            reply: tx,
        })?;
        rx.blocking_recv().unwrap_or(Err(Errno::EIO))
    }

    pub fn write(&self, data: Vec<u8>, offset: u64) -> Result<usize, Errno> {
        let (tx, rx) = oneshot::channel();
        self.send(FileRequest::Write {
            data,
            offset,
            reply: tx,
        })?;
        rx.blocking_recv().unwrap_or(Err(Errno::EIO))
    }

    /// Release never fails from the caller's point of view.
    pub fn release(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(FileRequest::Release { reply: tx }).is_ok() {
            let _ = rx.blocking_recv();
        }
    }

    /// Ask the service loop to exit. Used at teardown and in tests.
    pub fn shutdown(&self) {
        let _ = self.req_tx.send_blocking(FileRequest::Shutdown);
    }

    fn send(&self, req: FileRequest) -> Result<(), Errno> {
        // A closed queue means the service thread is gone; nothing better
        // than an I/O error to report.
        self.req_tx.send_blocking(req).map_err(|_| Errno::EIO)
    }
}

/// Drains file requests and dispatches them to the bridge, one at a time.
pub struct ServiceLoop {
    bridge: FileBridge,
    req_rx: Receiver<FileRequest>,
}

impl ServiceLoop {
    /// Run until shutdown is requested or every `DeviceOps` handle is gone.
    pub fn run(mut self) {
        info!("character device service loop started");

        while let Ok(req) = self.req_rx.recv_blocking() {
            if matches!(req, FileRequest::Shutdown) {
                info!("service loop shutting down");
                break;
            }

            // A panic in one handler must not take the device node down
            // with it; the caller sees EIO through the dropped reply sender.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.dispatch(req);
            }));
            if let Err(e) = result {
                error!("panic in file operation handler: {:?}", e);
            }
        }

        info!("character device service loop stopped");
    }

    fn dispatch(&mut self, req: FileRequest) {
        match req {
            FileRequest::Open { reply } => {
                debug!("open request");
                let _ = reply.send(self.bridge.on_open());
            }
            FileRequest::Read { len, offset, reply } => {
                debug!(len, offset, "read request");
                let _ = reply.send(self.bridge.on_read(len, offset));
            }
            FileRequest::Write { data, offset, reply } => {
                debug!(len = data.len(), offset, "write request");
                let _ = reply.send(self.bridge.on_write(&data, offset));
            }
            FileRequest::Release { reply } => {
                debug!("release request");
                self.bridge.on_release();
                let _ = reply.send(());
            }
            FileRequest::Shutdown => unreachable!("handled in run"),
        }
    }
}

/// Create the request channel between the registration glue and the service
/// loop. Returns the client handle and the loop to run.
pub fn create_device_channel(bridge: FileBridge) -> (DeviceOps, ServiceLoop) {
    let (req_tx, req_rx) = bounded(64);
    (DeviceOps { req_tx }, ServiceLoop { bridge, req_rx })
}

/// Spawn the service loop on its own named thread.
pub fn spawn_service_loop(service: ServiceLoop) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("chardev-service".to_string())
        .spawn(move || service.run())
        .expect("failed to spawn service thread")
}
