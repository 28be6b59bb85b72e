//! Gamepad handler: polled change detection.
//!
//! No native "changed" event exists for gamepads, so this handler diffs
//! whole device snapshots once per tick while polling is active. Button
//! changes classify as `down` when the value increases and `up` when it
//! decreases; axes pass a deadzone filter (at or below the threshold reads
//! as exactly 0) before comparison and write. Cached history always
//! updates, bound or not, so a binding added later starts from the true
//! device state.
//!
//! Polling starts on the first known connection and stops as soon as the
//! connected set is empty; the flag is checked at the top of every tick so
//! a cleared loop never processes another frame.

use crate::binding::{DeviceBindings, InputId, SharedInputState};
use crate::controller::detection::DetectionHook;
use crate::devices::{DeviceError, DeviceHandler, PropertyValue};
use tracing::{debug, info, trace};

pub const DEFAULT_DEADZONE: f64 = 0.01;

/// One connected device's state for a single poll tick.
#[derive(Debug, Clone, Default)]
pub struct GamepadSnapshot {
    /// Stable identity of the device type occupying this slot; a change of
    /// signature means a different physical device and invalidates history.
    pub signature: String,
    /// Hardware timestamp; `None` forces a diff every tick.
    pub timestamp: Option<u64>,
    pub buttons: Vec<f64>,
    pub axes: Vec<f64>,
}

pub struct GamepadHandler {
    bindings: DeviceBindings,
    input: SharedInputState,
    detection: Option<DetectionHook>,
    destroyed: bool,

    deadzone: f64,
    polling: bool,

    prev_signatures: Vec<Option<String>>,
    prev_timestamps: Vec<Option<u64>>,
    button_states: Vec<Vec<f64>>,
    axis_values: Vec<Vec<f64>>,
}

impl GamepadHandler {
    pub const NAME: &'static str = "gamepad";

    pub fn new(bindings: DeviceBindings, input: SharedInputState) -> Self {
        Self {
            bindings,
            input,
            detection: None,
            destroyed: false,
            deadzone: DEFAULT_DEADZONE,
            polling: false,
            prev_signatures: Vec::new(),
            prev_timestamps: Vec::new(),
            button_states: Vec::new(),
            axis_values: Vec::new(),
        }
    }

    /// Called by the platform collaborator when a device connects.
    pub fn connected(&mut self) {
        if !self.polling && !self.destroyed {
            info!("gamepad connected, polling started");
            self.polling = true;
        }
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn stop_polling(&mut self) {
        if self.polling {
            debug!("gamepad polling stopped");
            self.polling = false;
        }
    }

    /// Processes one poll tick worth of device snapshots.
    ///
    /// Slots may be empty; the slot layout is positional, so a device that
    /// vanishes leaves a hole rather than shifting its neighbours.
    pub fn poll_frame(&mut self, frame: &[Option<GamepadSnapshot>]) {
        if self.destroyed || !self.polling {
            return;
        }

        self.reset_history_on_device_change(frame);

        let pads: Vec<&GamepadSnapshot> = frame.iter().flatten().collect();
        if pads.is_empty() {
            self.stop_polling();
            return;
        }

        for (index, pad) in pads.iter().enumerate() {
            if let Some(timestamp) = pad.timestamp {
                if self.prev_timestamps.get(index).copied().flatten() == Some(timestamp) {
                    continue;
                }
            }
            if self.prev_timestamps.len() <= index {
                self.prev_timestamps.resize(index + 1, None);
            }
            self.prev_timestamps[index] = pad.timestamp;
            self.diff_device(index, pad);
        }
    }

    /// Invalidates button/axis history when the connected set changes.
    ///
    /// Stale history must never be diffed against a different physical
    /// device, so the caches are rebuilt from the current frame (axes
    /// through the deadzone filter) and timestamps are forgotten.
    fn reset_history_on_device_change(&mut self, frame: &[Option<GamepadSnapshot>]) {
        let signatures: Vec<Option<String>> = frame
            .iter()
            .map(|slot| slot.as_ref().map(|pad| pad.signature.clone()))
            .collect();
        if signatures == self.prev_signatures {
            return;
        }
        debug!("connected gamepad set changed, resetting poll history");
        self.prev_signatures = signatures;
        self.prev_timestamps.clear();
        self.button_states.clear();
        self.axis_values.clear();

        for pad in frame.iter().flatten() {
            self.button_states.push(pad.buttons.clone());
            self.axis_values.push(
                pad.axes
                    .iter()
                    .map(|&value| self.filter_deadzone(value))
                    .collect(),
            );
            self.prev_timestamps.push(None);
        }
    }

    fn diff_device(&mut self, index: usize, pad: &GamepadSnapshot) {
        let detection = self.detection.clone();
        let deadzone = self.deadzone;

        if self.button_states.len() <= index {
            self.button_states.resize(index + 1, Vec::new());
        }
        if self.axis_values.len() <= index {
            self.axis_values.resize(index + 1, Vec::new());
        }
        if self.button_states[index].len() < pad.buttons.len() {
            self.button_states[index].resize(pad.buttons.len(), 0.0);
        }
        if self.axis_values[index].len() < pad.axes.len() {
            self.axis_values[index].resize(pad.axes.len(), 0.0);
        }

        for (slot, &current) in pad.buttons.iter().enumerate() {
            let previous = self.button_states[index][slot];
            if previous != current {
                let input_id = InputId::button(slot);
                if let Some(hook) = &detection {
                    hook.emit(Self::NAME, input_id, false);
                } else if let Some(binding) = self.bindings.get(&input_id) {
                    let pressed = current > previous;
                    if (pressed && binding.down) || (!pressed && binding.up) {
                        trace!(
                            "gamepad button {} -> {} = {:.4}",
                            slot,
                            binding.description,
                            current
                        );
                        self.input.write().set(&binding.description, current);
                    }
                }
                self.button_states[index][slot] = current;
            }
        }

        for (slot, &raw) in pad.axes.iter().enumerate() {
            let value = if raw.abs() <= deadzone { 0.0 } else { raw };
            let previous = self.axis_values[index][slot];
            let input_id = InputId::axis(slot);

            if let Some(hook) = &detection {
                if previous != value {
                    hook.emit(Self::NAME, input_id, true);
                }
            } else if previous != value {
                if let Some(binding) = self.bindings.get(&input_id) {
                    let output = if binding.invert { -value } else { value };
                    trace!(
                        "gamepad axis {} -> {} = {:.4}",
                        slot,
                        binding.description,
                        output
                    );
                    self.input.write().set(&binding.description, output);
                }
            }
            self.axis_values[index][slot] = value;
        }
    }

    fn filter_deadzone(&self, value: f64) -> f64 {
        if value.abs() <= self.deadzone {
            0.0
        } else {
            value
        }
    }
}

impl DeviceHandler for GamepadHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configure(&mut self, property: &str, value: PropertyValue) -> Result<(), DeviceError> {
        match property {
            "deadzone" => self.deadzone = value.expect_number(property)?,
            _ => {
                return Err(DeviceError::UnsupportedProperty {
                    device: Self::NAME,
                    property: property.to_string(),
                })
            }
        }
        Ok(())
    }

    fn rebind(&mut self, bindings: DeviceBindings, input: SharedInputState) {
        self.bindings = bindings;
        self.input = input;
    }

    fn set_detection(&mut self, hook: Option<DetectionHook>) {
        self.detection = hook;
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!("gamepad handler destroyed");
        self.stop_polling();
        self.bindings.clear();
        self.detection = None;
        self.prev_signatures.clear();
        self.prev_timestamps.clear();
        self.button_states.clear();
        self.axis_values.clear();
        self.destroyed = true;
    }
}

impl std::fmt::Debug for GamepadHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadHandler")
            .field("deadzone", &self.deadzone)
            .field("polling", &self.polling)
            .field("devices", &self.prev_signatures.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::config::BindingSpec;
    use crate::binding::state::shared_state;
    use crate::binding::{BindingTable, BindingsConfig};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn handler_with(specs: &[(&str, BindingSpec)]) -> (GamepadHandler, SharedInputState) {
        let mut config = BindingsConfig::new();
        for (description, spec) in specs {
            config.bind(*description, spec.clone());
        }
        let input = shared_state();
        let mut table = BindingTable::new();
        table.apply(&config, &input);
        let mut handler = GamepadHandler::new(table.device(GamepadHandler::NAME), input.clone());
        handler.connected();
        (handler, input)
    }

    fn pad(buttons: &[f64], axes: &[f64]) -> Option<GamepadSnapshot> {
        Some(GamepadSnapshot {
            signature: "test-pad".to_string(),
            timestamp: None,
            buttons: buttons.to_vec(),
            axes: axes.to_vec(),
        })
    }

    #[test]
    fn button_edges_respect_flags() {
        let (mut handler, input) = handler_with(&[(
            "fire",
            BindingSpec::new("gamepad", InputId::button(0)).down().up(),
        )]);

        handler.poll_frame(&[pad(&[0.0], &[])]);
        handler.poll_frame(&[pad(&[1.0], &[])]);
        assert_eq!(input.read().value("fire"), 1.0);

        handler.poll_frame(&[pad(&[0.0], &[])]);
        assert_eq!(input.read().value("fire"), 0.0);
    }

    #[test]
    fn button_without_up_flag_keeps_value() {
        let (mut handler, input) = handler_with(&[(
            "boost",
            BindingSpec::new("gamepad", InputId::button(1)).down(),
        )]);

        handler.poll_frame(&[pad(&[0.0, 0.0], &[])]);
        handler.poll_frame(&[pad(&[0.0, 1.0], &[])]);
        handler.poll_frame(&[pad(&[0.0, 0.0], &[])]);
        assert_eq!(input.read().value("boost"), 1.0);
    }

    #[test]
    fn axis_deadzone_forces_exact_zero() {
        let (mut handler, input) =
            handler_with(&[("steer", BindingSpec::new("gamepad", InputId::axis(0)))]);
        handler
            .configure("deadzone", PropertyValue::Number(0.1))
            .unwrap();

        // First frame seeds history; value past the deadzone on the next
        // frame must come through unchanged.
        handler.poll_frame(&[pad(&[], &[0.0])]);
        handler.poll_frame(&[pad(&[], &[0.5])]);
        assert_eq!(input.read().value("steer"), 0.5);

        // At or below the threshold reads as exactly zero.
        handler.poll_frame(&[pad(&[], &[0.1])]);
        assert_eq!(input.read().value("steer"), 0.0);

        handler.poll_frame(&[pad(&[], &[-0.09])]);
        assert_eq!(input.read().value("steer"), 0.0);

        handler.poll_frame(&[pad(&[], &[0.11])]);
        assert_eq!(input.read().value("steer"), 0.11);
    }

    #[test]
    fn invert_applies_after_deadzone() {
        let (mut handler, input) = handler_with(&[(
            "steer",
            BindingSpec::new("gamepad", InputId::axis(0)).invert(),
        )]);

        handler.poll_frame(&[pad(&[], &[0.0])]);
        handler.poll_frame(&[pad(&[], &[0.5])]);
        assert_eq!(input.read().value("steer"), -0.5);
    }

    #[test]
    fn identical_frames_never_rewrite() {
        let (mut handler, input) =
            handler_with(&[("steer", BindingSpec::new("gamepad", InputId::axis(0)))]);

        handler.poll_frame(&[pad(&[], &[0.0])]);
        handler.poll_frame(&[pad(&[], &[0.5])]);
        input.write().set("steer", 0.25); // sentinel: a rewrite would clobber this

        handler.poll_frame(&[pad(&[], &[0.5])]);
        handler.poll_frame(&[pad(&[], &[0.5])]);
        assert_eq!(input.read().value("steer"), 0.25);
    }

    #[test]
    fn matching_timestamp_skips_device() {
        let (mut handler, input) =
            handler_with(&[("steer", BindingSpec::new("gamepad", InputId::axis(0)))]);

        let stamped = |ts: u64, axis: f64| {
            Some(GamepadSnapshot {
                signature: "test-pad".to_string(),
                timestamp: Some(ts),
                buttons: Vec::new(),
                axes: vec![axis],
            })
        };

        handler.poll_frame(&[stamped(1, 0.0)]);
        handler.poll_frame(&[stamped(2, 0.5)]);
        assert_eq!(input.read().value("steer"), 0.5);

        // Same timestamp: the snapshot is stale, even if values differ.
        handler.poll_frame(&[stamped(2, -0.9)]);
        assert_eq!(input.read().value("steer"), 0.5);

        handler.poll_frame(&[stamped(3, -0.9)]);
        assert_eq!(input.read().value("steer"), -0.9);
    }

    #[test]
    fn device_change_resets_history() {
        let (mut handler, input) = handler_with(&[(
            "fire",
            BindingSpec::new("gamepad", InputId::button(0)).down().up(),
        )]);

        handler.poll_frame(&[pad(&[0.0], &[])]);
        handler.poll_frame(&[pad(&[1.0], &[])]);
        assert_eq!(input.read().value("fire"), 1.0);

        // A different device appears in the slot holding its button down.
        // That seeds fresh history instead of diffing against the old pad.
        let other = Some(GamepadSnapshot {
            signature: "other-pad".to_string(),
            timestamp: None,
            buttons: vec![1.0],
            axes: Vec::new(),
        });
        input.write().set("fire", 0.5); // sentinel
        handler.poll_frame(&[other]);
        assert_eq!(input.read().value("fire"), 0.5);
    }

    #[test]
    fn empty_connected_set_stops_polling() {
        let (mut handler, _input) = handler_with(&[]);
        assert!(handler.is_polling());

        handler.poll_frame(&[pad(&[0.0], &[0.0])]);
        handler.poll_frame(&[None]);
        assert!(!handler.is_polling());

        // Cleared flag is honored at the top of the next tick.
        handler.poll_frame(&[pad(&[1.0], &[0.5])]);
        assert!(!handler.is_polling());
    }

    #[test]
    fn detection_reports_changes_without_writes() {
        let (mut handler, input) = handler_with(&[
            (
                "fire",
                BindingSpec::new("gamepad", InputId::button(0)).down(),
            ),
            ("steer", BindingSpec::new("gamepad", InputId::axis(0))),
        ]);

        handler.poll_frame(&[pad(&[0.0], &[0.0])]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        handler.set_detection(Some(DetectionHook::new(Arc::new(move |event| {
            sink.lock().push(event)
        }))));

        handler.poll_frame(&[pad(&[1.0], &[0.7])]);

        assert_eq!(input.read().value("fire"), 0.0);
        assert_eq!(input.read().value("steer"), 0.0);

        let events = seen.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].input_id, InputId::button(0));
        assert!(!events[0].is_axis);
        assert_eq!(events[1].input_id, InputId::axis(0));
        assert!(events[1].is_axis);
    }

    #[test]
    fn unchanged_history_still_updates_without_binding() {
        let (mut handler, input) = handler_with(&[]);

        // No bindings at all: frames must still maintain history so a
        // binding added later diffs against the true device state.
        handler.poll_frame(&[pad(&[0.0], &[0.0])]);
        handler.poll_frame(&[pad(&[1.0], &[0.8])]);
        assert!(input.read().is_empty());
        assert_eq!(handler.button_states[0][0], 1.0);
        assert_eq!(handler.axis_values[0][0], 0.8);
    }
}
