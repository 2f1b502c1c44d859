//! # Shared Protocol Library
//!
//! Wire-level protocol shared by the dungeonlink server and client:
//!
//! - [`math`] — the small value types that appear on the wire (`Vec2`,
//!   `Color`).
//! - [`codec`] — the fixed-layout frame header and its encoder/decoder.
//! - [`protocol`] — the closed packet-type table and typed payloads.
//! - [`reassembly`] — turns an unaligned TCP byte stream back into frames.
//! - [`dispatch`] — the packet-type-keyed handler registry used by both
//!   roles.
//!
//! The protocol is session-scoped and versionless: every peer in a session
//! is assumed to run an identical build, so a schema change requires
//! rebuilding all of them. Nothing in this crate touches a socket; the
//! server and client crates own all I/O.

pub mod codec;
pub mod dispatch;
pub mod math;
pub mod protocol;
pub mod reassembly;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameError, HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use math::{Color, Vec2};
pub use protocol::{
    ClientId, Message, PacketType, PositionSnapshot, ProtocolError, DEFAULT_PORT, NO_VICTIM,
    REPLICATION_BLEND, SEED_RETRY_INTERVAL, SNAPSHOT_RATE,
};
pub use reassembly::StreamReassembler;
