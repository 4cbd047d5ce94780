//! Translation between file operations and the transport
//!
//! One handler per file operation, mirroring the callback surface the
//! registration layer exposes: each call produces exactly one reply, either
//! data/count or a POSIX error number. Transport outcomes map as: hard
//! transfer failure to `EIO`, fixed-capacity overflow to `ENOSPC`, growable
//! store exhaustion to `ENOMEM`.

use crate::error::Errno;
use crate::session::Session;
use crate::trace::HexTracer;
use crate::transport::{Direction, MAX_CHUNK};
use tracing::warn;

pub struct FileBridge {
    session: Session,
    tracer: HexTracer,
}

impl FileBridge {
    pub fn new(session: Session, tracer: HexTracer) -> Self {
        Self { session, tracer }
    }

    pub fn on_open(&mut self) -> Result<(), Errno> {
        self.session.open().map_err(|e| {
            warn!("open failed: {}", e);
            Errno::EIO
        })
    }

    /// Read up to `len` bytes. Requests beyond the chunk cap are clamped,
    /// not refused; the caller retries for more. A short or empty result is
    /// a valid reply, not end-of-file.
    pub fn on_read(&mut self, len: usize, offset: u64) -> Result<Vec<u8>, Errno> {
        let len = len.min(MAX_CHUNK);
        match self.session.transport_mut().read(offset, len) {
            Ok(data) => {
                self.tracer.record(Direction::In, &data);
                Ok(data)
            }
            Err(e) => {
                warn!("read failed: {}", e);
                Err(Errno::from(&e))
            }
        }
    }

    /// Write `data`, replying with the number of bytes accepted. A request
    /// larger than the chunk cap is refused outright, for every backing
    /// store, without touching the transport.
    pub fn on_write(&mut self, data: &[u8], offset: u64) -> Result<usize, Errno> {
        if data.len() > MAX_CHUNK {
            warn!(len = data.len(), "write exceeds max transfer size");
            return Err(Errno::ENOSPC);
        }

        self.tracer.record(Direction::Out, data);
        match self.session.transport_mut().write(offset, data) {
            Ok(actual) => Ok(actual),
            Err(e) => {
                warn!("write failed: {}", e);
                Err(Errno::from(&e))
            }
        }
    }

    /// Always succeeds from the caller's point of view.
    pub fn on_release(&mut self) {
        self.session.release();
    }
}
