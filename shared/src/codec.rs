//! Frame header encoding and decoding.
//!
//! Every wire message is one frame: a fixed 9-byte header followed by
//! exactly `length` payload bytes. The header layout is explicit and
//! identical on every peer (no struct padding, little-endian):
//!
//! ```text
//! offset 0..4   length        i32 LE   payload byte count
//! offset 4..8   type          i32 LE   packet type tag
//! offset 8      is_broadcast  u8       0 = direct, nonzero = broadcast
//! ```
//!
//! The codec makes no attempt to interpret payload bytes; that is the
//! job of [`crate::protocol::Message`] and ultimately the registered
//! handler. There is no resynchronization marker in the framing format,
//! so a header that fails validation is unrecoverable for its stream.

use thiserror::Error;

/// Total size of one frame (header + payload) may never exceed this.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Bytes occupied by the frame header on the wire.
pub const HEADER_SIZE: usize = 9;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// One decoded wire frame. The payload is opaque at this layer; `kind` is
/// the raw type tag as received, validated later against the closed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: i32,
    pub is_broadcast: bool,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The declared length is negative or exceeds the maximum frame size.
    /// The stream is corrupt and the connection must be torn down.
    #[error("malformed frame header: declared payload length {0}")]
    MalformedHeader(i32),

    /// Not enough bytes buffered yet for a full header or a full frame.
    /// Retry after more bytes arrive.
    #[error("incomplete frame")]
    Incomplete,

    /// An outbound payload does not fit in a single frame.
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_SIZE}-byte frame limit")]
    Oversized(usize),
}

/// Encodes a frame as `header || payload`.
pub fn encode_frame(kind: i32, is_broadcast: bool, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::Oversized(payload.len()));
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.push(u8::from(is_broadcast));
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

/// Attempts to decode one frame from the front of `bytes`.
///
/// Returns the frame and the number of bytes it consumed. The length field
/// is validated before any payload byte is touched, and is never inspected
/// unless all `HEADER_SIZE` header bytes are present.
pub fn decode_frame(bytes: &[u8]) -> Result<(Frame, usize), FrameError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::Incomplete);
    }

    let length = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if length < 0 || length as usize > MAX_PAYLOAD_SIZE {
        return Err(FrameError::MalformedHeader(length));
    }

    let kind = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let is_broadcast = bytes[8] != 0;

    let total = HEADER_SIZE + length as usize;
    if bytes.len() < total {
        return Err(FrameError::Incomplete);
    }

    let frame = Frame {
        kind,
        is_broadcast,
        payload: bytes[HEADER_SIZE..total].to_vec(),
    };
    Ok((frame, total))
}
