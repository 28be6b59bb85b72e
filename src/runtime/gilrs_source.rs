//! gilrs-backed frame source for the poll loop.

use crate::devices::GamepadSnapshot;
use crate::runtime::{GamepadSource, PollError};
use gilrs::{Axis, Button, EventType, Gilrs};
use tracing::{debug, info};

/// Buttons sampled into each snapshot, in slot order. The positions double
/// as the `button-N` input ids a profile refers to.
const BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

/// Axes sampled into each snapshot, in `axis-N` order.
const AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

pub struct GilrsSource {
    gilrs: Gilrs,
    pumped_initial: bool,
}

impl GilrsSource {
    pub fn new() -> Result<Self, PollError> {
        let gilrs = Gilrs::new().map_err(|e| PollError::Backend(e.to_string()))?;
        for (_id, gamepad) in gilrs.gamepads() {
            info!("gamepad present at startup: {}", gamepad.name());
        }
        Ok(Self {
            gilrs,
            pumped_initial: false,
        })
    }
}

impl GamepadSource for GilrsSource {
    fn pump_connections(&mut self) -> bool {
        let mut connected = false;
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => {
                    info!("gamepad connected: {:?}", event.id);
                    connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected: {:?}", event.id);
                }
                other => {
                    // State changes are read wholesale in frame(); the
                    // event itself only needs draining.
                    debug!("gamepad event drained: {:?}", other);
                }
            }
        }
        // Devices present before the source was created never produce a
        // Connected event, so report them on the first pump only.
        if !self.pumped_initial {
            self.pumped_initial = true;
            connected = connected || self.gilrs.gamepads().next().is_some();
        }
        connected
    }

    fn frame(&mut self) -> Vec<Option<GamepadSnapshot>> {
        let mut slots: Vec<Option<GamepadSnapshot>> = Vec::new();
        for (id, gamepad) in self.gilrs.gamepads() {
            let slot = usize::from(id);
            if slots.len() <= slot {
                slots.resize(slot + 1, None);
            }

            let buttons = BUTTONS
                .iter()
                .map(|&button| if gamepad.is_pressed(button) { 1.0 } else { 0.0 })
                .collect();
            let axes = AXES
                .iter()
                .map(|&axis| f64::from(gamepad.value(axis)))
                .collect();

            slots[slot] = Some(GamepadSnapshot {
                signature: format!("{} ({:?})", gamepad.name(), gamepad.uuid()),
                // gilrs exposes no per-frame counter, so every frame is
                // diffed against the cached values instead.
                timestamp: None,
                buttons,
                axes,
            });
        }
        slots
    }
}

impl std::fmt::Debug for GilrsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GilrsSource")
            .field("gamepads", &self.gilrs.gamepads().count())
            .finish()
    }
}
