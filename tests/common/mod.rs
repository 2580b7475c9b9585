//! Shared helpers for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;

use quick_mouse::pointer::{MouseButton, PointerBackend, Result};

/// One call made against the pointer backend
#[derive(Debug, Clone, PartialEq)]
pub enum PointerCall {
    Move(i32, i32),
    Scroll(i32, i32),
    Press(MouseButton),
    Release(MouseButton),
    Center,
    Close,
}

/// Backend that records every call instead of touching the desktop
#[derive(Default)]
pub struct RecordingPointer {
    calls: Mutex<Vec<PointerCall>>,
}

impl RecordingPointer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<PointerCall> {
        self.calls.lock().clone()
    }

    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                PointerCall::Move(dx, dy) => Some((*dx, *dy)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: PointerCall) -> Result<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

impl PointerBackend for RecordingPointer {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn move_relative(&self, dx: i32, dy: i32) -> Result<()> {
        self.record(PointerCall::Move(dx, dy))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        self.record(PointerCall::Scroll(dx, dy))
    }

    fn press(&self, button: MouseButton) -> Result<()> {
        self.record(PointerCall::Press(button))
    }

    fn release(&self, button: MouseButton) -> Result<()> {
        self.record(PointerCall::Release(button))
    }

    fn center_on_primary_display(&self) -> Result<()> {
        self.record(PointerCall::Center)
    }

    fn close(&self) -> Result<()> {
        self.record(PointerCall::Close)
    }
}

/// Decode a JSON frame the way a session would
pub fn packet(json: &str) -> quick_mouse::Packet {
    use quick_mouse::protocol::{JsonCodec, PacketCodec};

    JsonCodec
        .decode_frame(json.as_bytes())
        .expect("test packet must decode")
}
