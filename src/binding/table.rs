//! Normalized binding table: (device, input id) to binding record.
//!
//! The table is rebuilt wholesale on every configuration update and never
//! partially patched. It validates nothing: a spec for an unknown device is
//! stored and stays inert until a handler with that name shows up.

use crate::binding::config::{BindingsConfig, InputId};
use crate::binding::state::SharedInputState;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Normalized binding record, keyed by input id within one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub description: String,
    pub down: bool,
    pub up: bool,
    pub invert: bool,
}

/// One device's slice of the table.
pub type DeviceBindings = HashMap<InputId, Binding>;

#[derive(Debug, Default)]
pub struct BindingTable {
    devices: HashMap<String, DeviceBindings>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the table from a configuration and re-seeds the input state.
    ///
    /// Specs are grouped by device; within one device a second spec for the
    /// same input id overwrites the first (last-writer-wins, no merge).
    /// The state is seeded with every description at 0 before handlers are
    /// rewired, so values are readable immediately after configuration.
    pub fn apply(&mut self, config: &BindingsConfig, input: &SharedInputState) {
        self.devices.clear();

        for (description, slot) in config.iter() {
            for spec in slot.specs() {
                trace!(
                    "binding {:?} -> {}/{}",
                    description,
                    spec.device,
                    spec.input_id
                );
                self.devices.entry(spec.device.clone()).or_default().insert(
                    spec.input_id.clone(),
                    Binding {
                        description: description.to_string(),
                        down: spec.down,
                        up: spec.up,
                        invert: spec.invert,
                    },
                );
            }
        }

        input.write().reseed(config.descriptions());
        debug!(
            "binding table rebuilt: {} devices, {} descriptions",
            self.devices.len(),
            config.len()
        );
    }

    /// Clones the slice for one device; unknown devices get an empty slice.
    pub fn device(&self, name: &str) -> DeviceBindings {
        self.devices.get(name).cloned().unwrap_or_default()
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }
}
