//! Keyboard handler: direct key-code edge detection.
//!
//! Each raw key-down maps straight to that key's input id; a binding with
//! `down` writes 1, the paired key-up with `up` writes 0. A held key
//! re-firing raw down events just re-writes 1 — rate limiting repeats is
//! the platform's job, not ours.

use crate::binding::{DeviceBindings, InputId, SharedInputState};
use crate::controller::detection::DetectionHook;
use crate::devices::{DeviceError, DeviceHandler, PropertyValue};
use tracing::{debug, trace};

pub struct KeyboardHandler {
    bindings: DeviceBindings,
    input: SharedInputState,
    detection: Option<DetectionHook>,
    destroyed: bool,
}

impl KeyboardHandler {
    pub const NAME: &'static str = "keyboard";

    pub fn new(bindings: DeviceBindings, input: SharedInputState) -> Self {
        Self {
            bindings,
            input,
            detection: None,
            destroyed: false,
        }
    }

    pub fn key_down(&mut self, key_code: u32) {
        if self.destroyed {
            return;
        }
        let input_id = InputId::Index(key_code);
        if let Some(hook) = &self.detection {
            hook.emit(Self::NAME, input_id, false);
            return;
        }
        if let Some(binding) = self.bindings.get(&input_id) {
            if binding.down {
                trace!("key {} down -> {} = 1", key_code, binding.description);
                self.input.write().set(&binding.description, 1.0);
            }
        }
    }

    pub fn key_up(&mut self, key_code: u32) {
        if self.destroyed || self.detection.is_some() {
            return;
        }
        if let Some(binding) = self.bindings.get(&InputId::Index(key_code)) {
            if binding.up {
                trace!("key {} up -> {} = 0", key_code, binding.description);
                self.input.write().set(&binding.description, 0.0);
            }
        }
    }
}

impl DeviceHandler for KeyboardHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    // The keyboard handler has no configurable properties.
    fn configure(&mut self, property: &str, _value: PropertyValue) -> Result<(), DeviceError> {
        Err(DeviceError::UnsupportedProperty {
            device: Self::NAME,
            property: property.to_string(),
        })
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
        debug!("keyboard handler destroyed");
        self.bindings.clear();
        self.detection = None;
        self.destroyed = true;
    }
}

impl std::fmt::Debug for KeyboardHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardHandler")
            .field("bindings", &self.bindings.len())
            .field("detecting", &self.detection.is_some())
            .field("destroyed", &self.destroyed)
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

    fn handler_with(specs: &[(&str, BindingSpec)]) -> (KeyboardHandler, SharedInputState) {
        let mut config = BindingsConfig::new();
        for (description, spec) in specs {
            config.bind(*description, spec.clone());
        }
        let input = shared_state();
        let mut table = BindingTable::new();
        table.apply(&config, &input);
        (
            KeyboardHandler::new(table.device(KeyboardHandler::NAME), input.clone()),
            input,
        )
    }

    #[test]
    fn down_edge_writes_one_and_up_resets() {
        let (mut handler, input) = handler_with(&[(
            "accelerate",
            BindingSpec::new("keyboard", 87).down().up(),
        )]);

        handler.key_down(87);
        assert_eq!(input.read().value("accelerate"), 1.0);

        handler.key_up(87);
        assert_eq!(input.read().value("accelerate"), 0.0);
    }

    #[test]
    fn without_up_flag_value_sticks_after_release() {
        let (mut handler, input) =
            handler_with(&[("toggle", BindingSpec::new("keyboard", 84).down())]);

        handler.key_down(84);
        handler.key_up(84);
        assert_eq!(input.read().value("toggle"), 1.0);
    }

    #[test]
    fn held_key_repeats_are_idempotent() {
        let (mut handler, input) = handler_with(&[(
            "accelerate",
            BindingSpec::new("keyboard", 87).down().up(),
        )]);

        handler.key_down(87);
        handler.key_down(87);
        handler.key_down(87);
        assert_eq!(input.read().value("accelerate"), 1.0);
    }

    #[test]
    fn unbound_key_is_ignored() {
        let (mut handler, input) =
            handler_with(&[("accelerate", BindingSpec::new("keyboard", 87).down())]);

        handler.key_down(13);
        assert_eq!(input.read().value("accelerate"), 0.0);
    }

    #[test]
    fn detection_reports_instead_of_writing() {
        let (mut handler, input) = handler_with(&[(
            "accelerate",
            BindingSpec::new("keyboard", 87).down().up(),
        )]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        handler.set_detection(Some(DetectionHook::new(Arc::new(move |event| {
            sink.lock().push(event)
        }))));

        handler.key_down(87);
        handler.key_up(87);

        assert_eq!(input.read().value("accelerate"), 0.0);
        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input_id, InputId::Index(87));
        assert!(!events[0].is_axis);
    }

    #[test]
    fn configure_always_rejects() {
        let (mut handler, _input) = handler_with(&[]);
        let err = handler
            .configure("deadzone", PropertyValue::Number(0.1))
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedProperty { .. }));
    }

    #[test]
    fn destroyed_handler_ignores_events() {
        let (mut handler, input) =
            handler_with(&[("accelerate", BindingSpec::new("keyboard", 87).down())]);

        handler.destroy();
        handler.destroy(); // idempotent
        handler.key_down(87);
        assert_eq!(input.read().value("accelerate"), 0.0);
    }
}
