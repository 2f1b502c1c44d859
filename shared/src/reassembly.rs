//! Stream reassembly: complete frames out of an unaligned byte stream.
//!
//! TCP delivers payload bytes at arbitrary chunk boundaries unrelated to
//! frame boundaries, so a frame may arrive split across any number of
//! reads, and one read may carry several frames plus the head of another.
//! The reassembler buffers received bytes and yields frames only once they
//! are fully present. A header's declared length is never inspected until
//! all header bytes have been buffered.
//!
//! "No complete frame buffered yet" (`Ok(None)`) is distinct from "peer
//! closed": the owning read loop detects closure from the transport and
//! stops feeding the reassembler. A malformed header is unrecoverable —
//! the framing has no resynchronization marker, so the caller must tear
//! the connection down rather than skip bytes.

use crate::codec::{decode_frame, Frame, FrameError, HEADER_SIZE};

#[derive(Debug, Default)]
pub struct StreamReassembler {
    buf: Vec<u8>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(2 * HEADER_SIZE),
        }
    }

    /// Appends bytes received from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Yields the next complete frame, if one is fully buffered.
    ///
    /// `Ok(None)` means more bytes are needed; call [`extend`] after the
    /// next read and try again. `Err` means the stream is corrupt.
    ///
    /// [`extend`]: StreamReassembler::extend
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        match decode_frame(&self.buf) {
            Ok((frame, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(frame))
            }
            Err(FrameError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Bytes buffered but not yet consumed by a completed frame.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}
