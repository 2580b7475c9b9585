//! Kernel uinput pointer
//!
//! Creates virtual mice through `/dev/uinput` with the `evdev` crate. This is
//! the only way to inject input under Wayland without compositor cooperation:
//! the kernel device shows up like a USB mouse and libinput picks it up.
//!
//! # Devices
//!
//! - **relative**: `EV_REL` (X, Y, wheel, horizontal wheel) and the three
//!   buttons. Every move, scroll and click goes here.
//! - **absolute**: `EV_ABS` X/Y in `0..=65535` plus `BTN_LEFT`, shaped like a
//!   VM USB tablet. Only used to warp the cursor to the middle of the output
//!   layout.
//!
//! Both are created in [`UinputPointer::new`], so nothing on the packet path
//! waits for libinput to pick up a fresh device.
//!
//! `VirtualDevice::emit` terminates each batch with `SYN_REPORT`. Batches
//! are written while holding the device lock, so concurrent callers never
//! interleave half reports.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    RelativeAxisType, UinputAbsSetup,
};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{PointerError, Result};
use super::{MouseButton, PointerBackend, UINPUT_MAX_NAME_LEN};

const ABS_MAX: i32 = 65535;
const ABS_MID: i32 = ABS_MAX / 2;

const BUTTONS: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

/// Time libinput needs to open freshly created devices
const SETTLE_DELAY: Duration = Duration::from_millis(100);

fn device_id() -> InputId {
    InputId::new(BusType::BUS_USB, 0x1234, 0x5678, 1)
}

fn device_error(what: &'static str) -> impl FnOnce(std::io::Error) -> PointerError {
    move |e| PointerError::Device(format!("{} failed: {}", what, e))
}

/// Longest prefix of `name` the kernel accepts, cut on a char boundary
fn kernel_name(name: &str) -> &str {
    if name.len() <= UINPUT_MAX_NAME_LEN {
        return name;
    }
    let mut end = UINPUT_MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn open_builder<'a>() -> Result<VirtualDeviceBuilder<'a>> {
    VirtualDeviceBuilder::new().map_err(|source| PointerError::DevicePermission { source })
}

fn create_relative(name: &str) -> Result<VirtualDevice> {
    let mut keys = AttributeSet::<Key>::new();
    for button in BUTTONS {
        keys.insert(Key::new(button.to_linux_button()));
    }

    let mut axes = AttributeSet::<RelativeAxisType>::new();
    for axis in [
        RelativeAxisType::REL_X,
        RelativeAxisType::REL_Y,
        RelativeAxisType::REL_WHEEL,
        RelativeAxisType::REL_HWHEEL,
    ] {
        axes.insert(axis);
    }

    let device = open_builder()?
        .name(name)
        .input_id(device_id())
        .with_keys(&keys)
        .map_err(device_error("UI_SET_KEYBIT"))?
        .with_relative_axes(&axes)
        .map_err(device_error("UI_SET_RELBIT"))?
        .build()
        .map_err(device_error("UI_DEV_CREATE"))?;

    debug!("Created relative uinput device '{}'", name);
    Ok(device)
}

fn create_absolute(name: &str) -> Result<VirtualDevice> {
    let mut keys = AttributeSet::<Key>::new();
    keys.insert(Key::BTN_LEFT);

    let abs = AbsInfo::new(0, 0, ABS_MAX, 0, 0, 0);

    let device = open_builder()?
        .name(name)
        .input_id(device_id())
        .with_keys(&keys)
        .map_err(device_error("UI_SET_KEYBIT"))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_X, abs))
        .map_err(device_error("UI_ABS_SETUP"))?
        .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, abs))
        .map_err(device_error("UI_ABS_SETUP"))?
        .build()
        .map_err(device_error("UI_DEV_CREATE"))?;

    debug!("Created absolute uinput device '{}'", name);
    Ok(device)
}

fn rel(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

fn abs(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis.0, value)
}

/// Relative motion; zero axes are left out
fn move_events(dx: i32, dy: i32) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(2);
    if dx != 0 {
        events.push(rel(RelativeAxisType::REL_X, dx));
    }
    if dy != 0 {
        events.push(rel(RelativeAxisType::REL_Y, dy));
    }
    events
}

/// Wheel motion where positive `dy` scrolls down and positive `dx` right
fn scroll_events(dx: i32, dy: i32) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(2);
    // REL_WHEEL counts up as positive
    if dy != 0 {
        events.push(rel(RelativeAxisType::REL_WHEEL, -dy));
    }
    if dx != 0 {
        events.push(rel(RelativeAxisType::REL_HWHEEL, dx));
    }
    events
}

fn button_events(button: MouseButton, pressed: bool) -> Vec<InputEvent> {
    vec![InputEvent::new(
        EventType::KEY,
        button.to_linux_button(),
        i32::from(pressed),
    )]
}

/// Reports that put the absolute device at the midpoint
///
/// The input core drops ABS events equal to the axis's current value, so a
/// step just off the midpoint comes first and every call produces motion.
fn center_batches() -> [Vec<InputEvent>; 2] {
    [
        vec![
            abs(AbsoluteAxisType::ABS_X, ABS_MID - 1),
            abs(AbsoluteAxisType::ABS_Y, ABS_MID - 1),
        ],
        vec![
            abs(AbsoluteAxisType::ABS_X, ABS_MID),
            abs(AbsoluteAxisType::ABS_Y, ABS_MID),
        ],
    ]
}

struct Devices {
    relative: Option<VirtualDevice>,
    absolute: Option<VirtualDevice>,
    closed: bool,
}

/// Virtual mouse backed by `/dev/uinput`
pub struct UinputPointer {
    name: String,
    devices: Mutex<Devices>,
}

impl UinputPointer {
    /// Create the relative and absolute devices
    ///
    /// Fails with [`PointerError::DevicePermission`] when `/dev/uinput`
    /// cannot be opened. A failure to create the absolute device only
    /// disables centering.
    pub fn new(device_name: &str) -> Result<Self> {
        let name = kernel_name(device_name);
        let relative = create_relative(name)?;

        let absolute_name = format!("{} (absolute)", device_name);
        let absolute = match create_absolute(kernel_name(&absolute_name)) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Cursor centering unavailable: {}", e);
                None
            }
        };

        // Let libinput open both devices before the first event
        std::thread::sleep(SETTLE_DELAY);
        info!("uinput device '{}' created", name);

        Ok(Self {
            name: name.to_string(),
            devices: Mutex::new(Devices {
                relative: Some(relative),
                absolute,
                closed: false,
            }),
        })
    }

    fn emit_relative(&self, events: &[InputEvent]) -> Result<()> {
        let mut devices = self.devices.lock();
        let device = devices.relative.as_mut().ok_or(PointerError::Closed)?;
        if events.is_empty() {
            return Ok(());
        }
        device.emit(events).map_err(device_error("event write"))
    }
}

impl PointerBackend for UinputPointer {
    fn name(&self) -> &'static str {
        "uinput"
    }

    fn move_relative(&self, dx: i32, dy: i32) -> Result<()> {
        self.emit_relative(&move_events(dx, dy))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        self.emit_relative(&scroll_events(dx, dy))
    }

    fn press(&self, button: MouseButton) -> Result<()> {
        self.emit_relative(&button_events(button, true))
    }

    fn release(&self, button: MouseButton) -> Result<()> {
        self.emit_relative(&button_events(button, false))
    }

    fn center_on_primary_display(&self) -> Result<()> {
        let mut devices = self.devices.lock();
        if devices.closed {
            return Err(PointerError::Closed);
        }
        let device = devices
            .absolute
            .as_mut()
            .ok_or_else(|| PointerError::Device("absolute device unavailable".to_string()))?;

        for batch in center_batches() {
            device.emit(&batch).map_err(device_error("event write"))?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut devices = self.devices.lock();
        if devices.closed {
            return Ok(());
        }
        devices.closed = true;

        // Closing the uinput fd destroys the device
        devices.relative = None;
        devices.absolute = None;
        info!("uinput device '{}' destroyed", self.name);
        Ok(())
    }
}

impl Drop for UinputPointer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(events: &[InputEvent]) -> Vec<(EventType, u16, i32)> {
        events
            .iter()
            .map(|e| (e.event_type(), e.code(), e.value()))
            .collect()
    }

    #[test]
    fn test_move_events() {
        assert_eq!(
            triples(&move_events(10, -5)),
            vec![
                (EventType::RELATIVE, RelativeAxisType::REL_X.0, 10),
                (EventType::RELATIVE, RelativeAxisType::REL_Y.0, -5),
            ]
        );
        assert_eq!(
            triples(&move_events(0, 7)),
            vec![(EventType::RELATIVE, RelativeAxisType::REL_Y.0, 7)]
        );
        assert!(move_events(0, 0).is_empty());
    }

    #[test]
    fn test_positive_dy_scrolls_down() {
        assert_eq!(
            triples(&scroll_events(0, 3)),
            vec![(EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, -3)]
        );
        assert_eq!(
            triples(&scroll_events(0, -2)),
            vec![(EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, 2)]
        );
    }

    #[test]
    fn test_horizontal_scroll_keeps_sign() {
        assert_eq!(
            triples(&scroll_events(4, 1)),
            vec![
                (EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, -1),
                (EventType::RELATIVE, RelativeAxisType::REL_HWHEEL.0, 4),
            ]
        );
        assert!(scroll_events(0, 0).is_empty());
    }

    #[test]
    fn test_button_events() {
        assert_eq!(
            triples(&button_events(MouseButton::Left, true)),
            vec![(EventType::KEY, Key::BTN_LEFT.code(), 1)]
        );
        assert_eq!(
            triples(&button_events(MouseButton::Right, false)),
            vec![(EventType::KEY, Key::BTN_RIGHT.code(), 0)]
        );
        assert_eq!(
            triples(&button_events(MouseButton::Middle, true)),
            vec![(EventType::KEY, Key::BTN_MIDDLE.code(), 1)]
        );
    }

    #[test]
    fn test_center_steps_off_midpoint_first() {
        let [first, last] = center_batches();
        let x = AbsoluteAxisType::ABS_X.0;
        let y = AbsoluteAxisType::ABS_Y.0;

        assert_eq!(
            triples(&last),
            vec![
                (EventType::ABSOLUTE, x, ABS_MID),
                (EventType::ABSOLUTE, y, ABS_MID),
            ]
        );
        // Repeating the midpoint alone would be filtered by the kernel
        for (step, mid) in first.iter().zip(&last) {
            assert_eq!(step.code(), mid.code());
            assert_ne!(step.value(), mid.value());
        }
    }

    #[test]
    fn test_device_name_truncated() {
        assert_eq!(kernel_name("virtual-mouse"), "virtual-mouse");

        let long = "x".repeat(200);
        assert_eq!(kernel_name(&long).len(), UINPUT_MAX_NAME_LEN);

        // Multi-byte chars are never split
        let wide = "é".repeat(60);
        let cut = kernel_name(&wide);
        assert!(cut.len() <= UINPUT_MAX_NAME_LEN);
        assert_eq!(cut.chars().count(), UINPUT_MAX_NAME_LEN / 2);
    }
}
