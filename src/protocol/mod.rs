//! Wire Protocol
//!
//! Packets exchanged with the handheld client over the WebSocket. Every
//! frame carries one JSON object with a `type` tag:
//!
//! ```json
//! {"type": "mouse_move", "x": 10, "y": -5, "pointerSensitivity": 25}
//! ```
//!
//! Decoding is two-step. [`PacketCodec::envelope_type`] reads only the tag so
//! the session can gate on `auth` before anything else is parsed, then
//! [`PacketCodec::decode`] reads the full shape for that tag. Numeric fields
//! that are absent decode as zero.
//!
//! # Packet Types
//!
//! | Tag | Direction | Payload |
//! |-----|-----------|---------|
//! | `auth` | client → server | `key` |
//! | `mouse_move` | client → server | `x`, `y`, `pointerSensitivity` |
//! | `scroll_move` | client → server | `x`, `y`, `scrollSensitivity` |
//! | `device_motion` | client → server | `rot_alpha`, `rot_beta`, `rot_gamma`, `timestamp`, `pointerSensitivity` |
//! | `calibration` | client → server | `rot_alpha`, `rot_beta`, `rot_gamma`, `timestamp` |
//! | `calibration_done` | client → server | none |
//! | `left_click_down` / `left_click_up` | client → server | none |
//! | `right_click_down` / `right_click_up` | client → server | none |
//! | `keep_alive` | both | none |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Codec error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Frame is not a JSON object of the expected shape
    #[error("malformed packet: {0}")]
    Malformed(String),

    /// Envelope has no `type` or an empty one
    #[error("packet has no type")]
    MissingType,

    /// Tag is not a known packet type
    #[error("unknown packet type: {0}")]
    UnknownType(String),

    /// Decoded packet does not carry the requested type
    #[error("expected {expected} packet, found {found}")]
    TypeMismatch {
        /// Type the caller asked for
        expected: PacketType,
        /// Type found in the frame
        found: PacketType,
    },

    /// Codec does not implement this operation
    #[error("{0} is not implemented by this codec")]
    Unsupported(&'static str),
}

/// Closed set of packet tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Auth,
    MouseMove,
    ScrollMove,
    DeviceMotion,
    Calibration,
    CalibrationDone,
    LeftClickDown,
    LeftClickUp,
    RightClickDown,
    RightClickUp,
    KeepAlive,
}

impl PacketType {
    /// Every packet type
    pub const ALL: [PacketType; 11] = [
        PacketType::Auth,
        PacketType::MouseMove,
        PacketType::ScrollMove,
        PacketType::DeviceMotion,
        PacketType::Calibration,
        PacketType::CalibrationDone,
        PacketType::LeftClickDown,
        PacketType::LeftClickUp,
        PacketType::RightClickDown,
        PacketType::RightClickUp,
        PacketType::KeepAlive,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketType::Auth => "auth",
            PacketType::MouseMove => "mouse_move",
            PacketType::ScrollMove => "scroll_move",
            PacketType::DeviceMotion => "device_motion",
            PacketType::Calibration => "calibration",
            PacketType::CalibrationDone => "calibration_done",
            PacketType::LeftClickDown => "left_click_down",
            PacketType::LeftClickUp => "left_click_up",
            PacketType::RightClickDown => "right_click_down",
            PacketType::RightClickUp => "right_click_up",
            PacketType::KeepAlive => "keep_alive",
        }
    }

    /// Look up a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    /// Credential check, first frame of a session
    Auth {
        #[serde(default)]
        key: String,
    },

    /// Direct relative cursor move
    MouseMove {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default, rename = "pointerSensitivity")]
        pointer_sensitivity: f64,
    },

    /// Wheel event
    ScrollMove {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default, rename = "scrollSensitivity")]
        scroll_sensitivity: f64,
    },

    /// Orientation sample in degrees
    DeviceMotion {
        #[serde(default)]
        rot_alpha: f64,
        #[serde(default)]
        rot_beta: f64,
        #[serde(default)]
        rot_gamma: f64,
        #[serde(default)]
        timestamp: i64,
        #[serde(default, rename = "pointerSensitivity")]
        pointer_sensitivity: f64,
    },

    /// Baseline sample
    Calibration {
        #[serde(default)]
        rot_alpha: f64,
        #[serde(default)]
        rot_beta: f64,
        #[serde(default)]
        rot_gamma: f64,
        #[serde(default)]
        timestamp: i64,
    },

    CalibrationDone,
    LeftClickDown,
    LeftClickUp,
    RightClickDown,
    RightClickUp,
    KeepAlive,
}

impl Packet {
    /// Tag of this packet
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Auth { .. } => PacketType::Auth,
            Packet::MouseMove { .. } => PacketType::MouseMove,
            Packet::ScrollMove { .. } => PacketType::ScrollMove,
            Packet::DeviceMotion { .. } => PacketType::DeviceMotion,
            Packet::Calibration { .. } => PacketType::Calibration,
            Packet::CalibrationDone => PacketType::CalibrationDone,
            Packet::LeftClickDown => PacketType::LeftClickDown,
            Packet::LeftClickUp => PacketType::LeftClickUp,
            Packet::RightClickDown => PacketType::RightClickDown,
            Packet::RightClickUp => PacketType::RightClickUp,
            Packet::KeepAlive => PacketType::KeepAlive,
        }
    }
}

/// Frame encoding used on the wire
pub trait PacketCodec: Send + Sync {
    /// Read only the packet tag
    fn envelope_type(&self, data: &[u8]) -> Result<PacketType>;

    /// Decode the full packet for a tag obtained from [`Self::envelope_type`]
    fn decode(&self, data: &[u8], packet_type: PacketType) -> Result<Packet>;

    /// Encode a packet into one frame
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>>;

    /// Envelope then full decode
    fn decode_frame(&self, data: &[u8]) -> Result<Packet> {
        let packet_type = self.envelope_type(data)?;
        self.decode(data, packet_type)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// JSON text frames
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PacketCodec for JsonCodec {
    fn envelope_type(&self, data: &[u8]) -> Result<PacketType> {
        let envelope: Envelope =
            serde_json::from_slice(data).map_err(|e| CodecError::Malformed(e.to_string()))?;

        match envelope.kind.as_deref() {
            None | Some("") => Err(CodecError::MissingType),
            Some(tag) => {
                PacketType::from_tag(tag).ok_or_else(|| CodecError::UnknownType(tag.to_string()))
            }
        }
    }

    fn decode(&self, data: &[u8], packet_type: PacketType) -> Result<Packet> {
        let packet: Packet =
            serde_json::from_slice(data).map_err(|e| CodecError::Malformed(e.to_string()))?;

        let found = packet.packet_type();
        if found != packet_type {
            return Err(CodecError::TypeMismatch {
                expected: packet_type,
                found,
            });
        }
        Ok(packet)
    }

    fn encode(&self, packet: &Packet) -> Result<Vec<u8>> {
        serde_json::to_vec(packet).map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

/// Binary frames
///
/// Reserved for a compact encoding; no client speaks it yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl PacketCodec for BinaryCodec {
    fn envelope_type(&self, _data: &[u8]) -> Result<PacketType> {
        Err(CodecError::Unsupported("binary envelope decoding"))
    }

    fn decode(&self, _data: &[u8], _packet_type: PacketType) -> Result<Packet> {
        Err(CodecError::Unsupported("binary decoding"))
    }

    fn encode(&self, _packet: &Packet) -> Result<Vec<u8>> {
        Err(CodecError::Unsupported("binary encoding"))
    }
}
