//! The closed packet-type table and its typed payloads.
//!
//! Payload bodies are serde structs serialized with bincode's default
//! fixint little-endian encoding, which yields the exact byte layouts
//! documented per variant (an `i32` is 4 bytes LE, a [`Vec2`] is 16, a
//! [`Color`] is 4). There is no version field: all peers in a session run
//! identical builds.

use crate::codec::{decode_frame, encode_frame, Frame, FrameError};
use crate::math::{Color, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A client's session-unique ID, assigned by the server at accept time.
pub type ClientId = i32;

/// Default port for session servers.
pub const DEFAULT_PORT: u16 = 1155;

/// How often the local player publishes a position snapshot, in Hz.
/// Independent of the simulation tick rate.
pub const SNAPSHOT_RATE: f64 = 20.0;

/// How long an unseeded client waits before re-requesting the world seed.
pub const SEED_RETRY_INTERVAL: f64 = 0.5;

/// Per-tick blend factor for remote-entity smoothing, normalized to a
/// 144 Hz tick (the effective factor is `0.1 * delta * 144`, capped at 1).
pub const REPLICATION_BLEND: f64 = 0.1;

/// Victim-ID sentinel in a hit event meaning the shot hit nobody.
pub const NO_VICTIM: ClientId = -1;

/// Every packet type the protocol knows. The table is closed and
/// versionless; an unlisted tag on the wire is a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    AssignClientId,
    PlayerJoined,
    PlayerLeft,
    RequestWorldSeed,
    WorldSeed,
    PositionSnapshot,
    HitEvent,
    HostLeft,
}

impl PacketType {
    pub const ALL: [PacketType; 8] = [
        PacketType::AssignClientId,
        PacketType::PlayerJoined,
        PacketType::PlayerLeft,
        PacketType::RequestWorldSeed,
        PacketType::WorldSeed,
        PacketType::PositionSnapshot,
        PacketType::HitEvent,
        PacketType::HostLeft,
    ];

    pub fn tag(self) -> i32 {
        match self {
            PacketType::AssignClientId => 0,
            PacketType::PlayerJoined => 1,
            PacketType::PlayerLeft => 2,
            PacketType::RequestWorldSeed => 3,
            PacketType::WorldSeed => 4,
            PacketType::PositionSnapshot => 5,
            PacketType::HitEvent => 6,
            PacketType::HostLeft => 7,
        }
    }

    pub fn from_tag(tag: i32) -> Option<PacketType> {
        match tag {
            0 => Some(PacketType::AssignClientId),
            1 => Some(PacketType::PlayerJoined),
            2 => Some(PacketType::PlayerLeft),
            3 => Some(PacketType::RequestWorldSeed),
            4 => Some(PacketType::WorldSeed),
            5 => Some(PacketType::PositionSnapshot),
            6 => Some(PacketType::HitEvent),
            7 => Some(PacketType::HostLeft),
            _ => None,
        }
    }
}

/// Full replicated state of one player, published at [`SNAPSHOT_RATE`].
/// Non-incremental: each snapshot fully replaces the previous report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub pos: Vec2,
    pub height: f64,
    pub facing: Vec2,
    pub id: ClientId,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct IdPayload {
    id: ClientId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SeedPayload {
    seed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct HitPayload {
    attacker_id: ClientId,
    victim_id: ClientId,
    hit_pos: Vec2,
    hit_height: f64,
}

/// One decoded wire message: the packet type plus its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    AssignClientId { id: ClientId },
    PlayerJoined { id: ClientId },
    PlayerLeft { id: ClientId },
    RequestWorldSeed,
    WorldSeed { seed: i64 },
    PositionSnapshot(PositionSnapshot),
    HitEvent {
        attacker_id: ClientId,
        /// [`NO_VICTIM`] when the shot hit level geometry only.
        victim_id: ClientId,
        hit_pos: Vec2,
        hit_height: f64,
    },
    HostLeft,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown packet type tag {0}")]
    UnknownType(i32),

    #[error("bad payload for {kind:?}: {source}")]
    BadPayload {
        kind: PacketType,
        source: bincode::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl Message {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Message::AssignClientId { .. } => PacketType::AssignClientId,
            Message::PlayerJoined { .. } => PacketType::PlayerJoined,
            Message::PlayerLeft { .. } => PacketType::PlayerLeft,
            Message::RequestWorldSeed => PacketType::RequestWorldSeed,
            Message::WorldSeed { .. } => PacketType::WorldSeed,
            Message::PositionSnapshot(_) => PacketType::PositionSnapshot,
            Message::HitEvent { .. } => PacketType::HitEvent,
            Message::HostLeft => PacketType::HostLeft,
        }
    }

    /// Serializes this message into a complete wire frame.
    pub fn to_frame(&self, is_broadcast: bool) -> Result<Vec<u8>, ProtocolError> {
        let kind = self.packet_type();
        let payload = match self {
            Message::AssignClientId { id }
            | Message::PlayerJoined { id }
            | Message::PlayerLeft { id } => serialize(kind, &IdPayload { id: *id })?,
            Message::RequestWorldSeed | Message::HostLeft => Vec::new(),
            Message::WorldSeed { seed } => serialize(kind, &SeedPayload { seed: *seed })?,
            Message::PositionSnapshot(snapshot) => serialize(kind, snapshot)?,
            Message::HitEvent {
                attacker_id,
                victim_id,
                hit_pos,
                hit_height,
            } => serialize(
                kind,
                &HitPayload {
                    attacker_id: *attacker_id,
                    victim_id: *victim_id,
                    hit_pos: *hit_pos,
                    hit_height: *hit_height,
                },
            )?,
        };

        Ok(encode_frame(kind.tag(), is_broadcast, &payload)?)
    }

    /// Interprets a decoded frame's payload according to its type tag.
    pub fn decode(frame: &Frame) -> Result<Message, ProtocolError> {
        let kind = PacketType::from_tag(frame.kind).ok_or(ProtocolError::UnknownType(frame.kind))?;

        let message = match kind {
            PacketType::AssignClientId => {
                let IdPayload { id } = deserialize(kind, &frame.payload)?;
                Message::AssignClientId { id }
            }
            PacketType::PlayerJoined => {
                let IdPayload { id } = deserialize(kind, &frame.payload)?;
                Message::PlayerJoined { id }
            }
            PacketType::PlayerLeft => {
                let IdPayload { id } = deserialize(kind, &frame.payload)?;
                Message::PlayerLeft { id }
            }
            PacketType::RequestWorldSeed => Message::RequestWorldSeed,
            PacketType::WorldSeed => {
                let SeedPayload { seed } = deserialize(kind, &frame.payload)?;
                Message::WorldSeed { seed }
            }
            PacketType::PositionSnapshot => {
                Message::PositionSnapshot(deserialize(kind, &frame.payload)?)
            }
            PacketType::HitEvent => {
                let HitPayload {
                    attacker_id,
                    victim_id,
                    hit_pos,
                    hit_height,
                } = deserialize(kind, &frame.payload)?;
                Message::HitEvent {
                    attacker_id,
                    victim_id,
                    hit_pos,
                    hit_height,
                }
            }
            PacketType::HostLeft => Message::HostLeft,
        };

        Ok(message)
    }

    /// Decodes a full frame from `bytes` and interprets its payload.
    /// Convenience for tests and tools; live connections go through the
    /// reassembler instead.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Message, usize), ProtocolError> {
        let (frame, consumed) = decode_frame(bytes)?;
        Ok((Message::decode(&frame)?, consumed))
    }
}

fn serialize<T: Serialize>(kind: PacketType, payload: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(payload).map_err(|source| ProtocolError::BadPayload { kind, source })
}

fn deserialize<'a, T: Deserialize<'a>>(
    kind: PacketType,
    payload: &'a [u8],
) -> Result<T, ProtocolError> {
    bincode::deserialize(payload).map_err(|source| ProtocolError::BadPayload { kind, source })
}
