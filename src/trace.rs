//! Hex+ASCII trace of transferred bytes
//!
//! When enabled, every chunk moved through the bridge is rendered as
//! fixed-width lines of 16 space-separated hex bytes followed by their
//! printable ASCII form, one prefix per direction:
//!
//! ```text
//! USB< 1b 40 0a 48 65 6c 6c 6f                           .@.Hello
//! ```

use crate::transport::Direction;
use std::io::Write;

/// Bytes rendered per trace line.
const LINE_BYTES: usize = 16;

/// Render one chunk as trace lines. Pure, so the format is testable.
pub fn hex_lines(prefix: &str, data: &[u8]) -> Vec<String> {
    data.chunks(LINE_BYTES)
        .map(|chunk| {
            let mut line = String::with_capacity(prefix.len() + LINE_BYTES * 4 + 3);
            line.push_str(prefix);
            for i in 0..LINE_BYTES {
                match chunk.get(i) {
                    Some(b) => line.push_str(&format!(" {:02x}", b)),
                    None => line.push_str("   "),
                }
            }
            line.push_str("   ");
            for i in 0..LINE_BYTES {
                match chunk.get(i) {
                    Some(&b) if b.is_ascii_graphic() || b == b' ' => line.push(b as char),
                    Some(_) => line.push('.'),
                    None => line.push(' '),
                }
            }
            line
        })
        .collect()
}

/// Optional transfer tracer. Lines go to stdout so they interleave with the
/// device traffic they describe rather than with the log stream.
#[derive(Debug)]
pub struct HexTracer {
    enabled: bool,
}

impl HexTracer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Render one transferred chunk. Records are ephemeral; nothing is kept.
    pub fn record(&self, direction: Direction, data: &[u8]) {
        if !self.enabled {
            return;
        }

        let prefix = match direction {
            Direction::In => "USB>",
            Direction::Out => "USB<",
        };

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in hex_lines(prefix, data) {
            let _ = writeln!(out, "{}", line);
        }
    }
}
