//! # quick-mouse
//!
//! Turns a phone into a motion-controlled pointer. The phone streams
//! orientation, touch-pad and click packets over an authenticated
//! WebSocket; the server feeds them through a small physics model and
//! moves a virtual mouse on the desktop.
//!
//! # Architecture
//!
//! ```text
//! quick-mouse
//!   ├─> Server (axum over rustls: GET /ws + static client files)
//!   │     └─> Session (auth gate, keep-alive, frame loop)
//!   │           └─> Protocol (JSON packet codec)
//!   ├─> Controller (calibration + velocity physics, fixed-rate tick task)
//!   └─> Pointer backend
//!         ├─> uinput (Linux, Wayland)
//!         └─> automation (X11, Windows, macOS)
//! ```
//!
//! # Data Flow
//!
//! **Touch path:** Phone → WebSocket → Codec → Controller → Backend (immediate)
//!
//! **Motion path:** Phone → WebSocket → Codec → Controller velocity → Tick → Backend
//!
//! **Liveness:** Session → `{"type":"keep_alive"}` after an idle interval

#![warn(clippy::all)]

/// Server configuration
pub mod config;

/// Packet physics and calibration
pub mod controller;

/// Virtual pointer backends
pub mod pointer;

/// Wire packets and codecs
pub mod protocol;

/// Auth key and TLS
pub mod security;

/// HTTPS / WebSocket server
pub mod server;

/// Utility functions
pub mod utils;

pub use config::Config;
pub use controller::{ControllerError, PacketController, PhysicsConfig};
pub use pointer::{create_backend, BackendKind, MouseButton, PointerBackend, PointerError};
pub use protocol::{CodecError, JsonCodec, Packet, PacketCodec, PacketType};
pub use server::QuickMouseServer;
