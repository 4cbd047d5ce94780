//! usbchar — expose a USB bulk device as a character device from userspace
//!
//! The hard part lives here: mapping POSIX-style file operations onto a
//! bulk USB transport with correct exclusivity, timeout-as-empty-read
//! semantics, and a pluggable backing store. The kernel-side registration
//! mechanism (CUSE) is an external collaborator: glue code registers the
//! node and drives a [`chardev::DeviceOps`] handle from its callbacks.
//!
//! Layering, leaves first:
//!
//! - [`transport`] — the bulk endpoint pair abstraction, backed by a real
//!   USB device ([`transport::UsbTransport`]) or an in-memory store
//!   ([`transport::GrowableBuffer`], [`transport::FixedBuffer`]).
//! - [`session`] — reference-counted device lifecycle: first open acquires,
//!   last release lets go.
//! - [`bridge`] — translates file operations into transfers and transport
//!   failures into POSIX error numbers.
//! - [`chardev`] — the request/reply channel between the registration glue
//!   and the single service thread that serializes everything.
//! - [`trace`] — optional hex+ASCII dump of every transferred byte.

pub mod bridge;
pub mod chardev;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod trace;
pub mod transport;

pub use bridge::FileBridge;
pub use chardev::{
    DeviceOps, FileRequest, Registration, ServiceLoop, create_device_channel, spawn_service_loop,
};
pub use config::Config;
pub use error::{AcquireError, Errno, TransferError};
pub use session::Session;
pub use trace::HexTracer;
pub use transport::{MAX_CHUNK, Transport};
