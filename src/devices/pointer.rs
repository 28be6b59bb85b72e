//! Pointer handler: two coordinate regimes, chosen per event.
//!
//! Without a pointer lock the absolute position is normalized around the
//! viewport center: `-(pos - half) / half`, so up/left reads positive and
//! the value spans [-1, 1]. With a lock active the position is a clamped
//! running total of per-event deltas; an axis configured as infinite
//! reports the raw unclamped delta for that tick instead. The regime is a
//! property of each event's lock flag, never of the handler.
//!
//! The first motion event decides which vendor delta field the platform
//! populates; that probe result is cached for the handler's lifetime.

use crate::binding::{DeviceBindings, InputId, SharedInputState};
use crate::controller::detection::DetectionHook;
use crate::devices::{DeviceError, DeviceHandler, DeviceResource, PropertyValue};
use tracing::{debug, trace};

/// Raw pointer motion as delivered by the platform collaborator.
///
/// The three optional delta pairs mirror the vendor-prefixed movement
/// fields; at most one is expected to be populated on a given platform.
#[derive(Debug, Clone, Default)]
pub struct PointerMotion {
    pub page_x: f64,
    pub page_y: f64,
    pub movement: Option<(f64, f64)>,
    pub moz_movement: Option<(f64, f64)>,
    pub webkit_movement: Option<(f64, f64)>,
    /// Whether a pointer capture/lock was active when the event fired.
    pub pointer_locked: bool,
}

/// Which movement field the platform populates, probed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaSource {
    Standard,
    Moz,
    Webkit,
}

pub struct PointerHandler {
    bindings: DeviceBindings,
    input: SharedInputState,
    detection: Option<DetectionHook>,
    destroyed: bool,

    width: f64,
    height: f64,
    infinite_x_axis: bool,
    infinite_y_axis: bool,

    delta_source: Option<DeltaSource>,
    initialized: bool,
    resources: Vec<Box<dyn DeviceResource>>,
}

impl PointerHandler {
    pub const NAME: &'static str = "mouse";

    pub fn new(bindings: DeviceBindings, input: SharedInputState, width: f64, height: f64) -> Self {
        Self {
            bindings,
            input,
            detection: None,
            destroyed: false,
            width,
            height,
            infinite_x_axis: false,
            infinite_y_axis: false,
            delta_source: None,
            initialized: false,
            resources: Vec::new(),
        }
    }

    /// Registers an externally acquired resource for release on `destroy()`
    /// — the context-menu suppressor and listener registrations that are
    /// peer side effects of wiring this handler up.
    pub fn hold_resource(&mut self, resource: Box<dyn DeviceResource>) {
        self.resources.push(resource);
    }

    /// Updates the cached viewport extents (resize observer callback).
    pub fn viewport_resized(&mut self, width: f64, height: f64) {
        debug!("pointer viewport resized to {}x{}", width, height);
        self.width = width;
        self.height = height;
    }

    pub fn motion(&mut self, event: &PointerMotion) {
        if self.destroyed {
            return;
        }

        let half_width = self.width / 2.0;
        let half_height = self.height / 2.0;

        if self.delta_source.is_none() {
            self.probe_delta_source(event);
        }

        // Seed the absolute position so the first locked delta does not
        // jump the cursor. Deferred while a detection session is live:
        // detection must not mutate the state, so the seed lands on the
        // first event after the session ends.
        if !self.initialized && self.detection.is_none() {
            let (dx, dy) = self.deltas(event);
            let mut state = self.input.write();
            state.pointer_x = event.page_x - if event.pointer_locked { dx } else { 0.0 };
            state.pointer_y = event.page_y - if event.pointer_locked { dy } else { 0.0 };
            self.initialized = true;
        }

        let (prev_x, prev_y) = {
            let state = self.input.read();
            (state.pointer_x, state.pointer_y)
        };
        let (delta_x, delta_y) = self.deltas(event);

        let (pointer_x, pointer_y) = if event.pointer_locked {
            (
                clamp(0.0, self.width, prev_x + delta_x),
                clamp(0.0, self.height, prev_y + delta_y),
            )
        } else {
            (event.page_x, event.page_y)
        };

        let x = if self.infinite_x_axis {
            if event.pointer_locked {
                delta_x
            } else {
                pointer_x - prev_x
            }
        } else {
            -(pointer_x - half_width) / half_width
        };
        let y = if self.infinite_y_axis {
            if event.pointer_locked {
                delta_y
            } else {
                pointer_y - prev_y
            }
        } else {
            -(pointer_y - half_height) / half_height
        };

        if let Some(hook) = &self.detection {
            // Report the dominant axis; the position is not committed, so
            // detection never mutates the state.
            let diff_x = (prev_x - pointer_x).abs();
            let diff_y = (prev_y - pointer_y).abs();
            let axis = if diff_x > diff_y { "x" } else { "y" };
            hook.emit(Self::NAME, InputId::token(axis), true);
            return;
        }

        let mut state = self.input.write();
        state.pointer_x = pointer_x;
        state.pointer_y = pointer_y;

        if let Some(binding) = self.bindings.get(&InputId::token("x")) {
            let value = if binding.invert { -x } else { x };
            trace!("pointer x -> {} = {:.4}", binding.description, value);
            state.set(&binding.description, value);
        }
        if let Some(binding) = self.bindings.get(&InputId::token("y")) {
            let value = if binding.invert { -y } else { y };
            trace!("pointer y -> {} = {:.4}", binding.description, value);
            state.set(&binding.description, value);
        }
    }

    pub fn button_down(&mut self, button: u32) {
        if self.destroyed {
            return;
        }
        let input_id = InputId::Index(button);
        if let Some(hook) = &self.detection {
            hook.emit(Self::NAME, input_id, false);
            return;
        }
        if let Some(binding) = self.bindings.get(&input_id) {
            if binding.down {
                self.input.write().set(&binding.description, 1.0);
            }
        }
    }

    pub fn button_up(&mut self, button: u32) {
        if self.destroyed || self.detection.is_some() {
            return;
        }
        if let Some(binding) = self.bindings.get(&InputId::Index(button)) {
            if binding.up {
                self.input.write().set(&binding.description, 0.0);
            }
        }
    }

    fn probe_delta_source(&mut self, event: &PointerMotion) {
        let source = if event.movement.is_some() {
            DeltaSource::Standard
        } else if event.moz_movement.is_some() {
            DeltaSource::Moz
        } else if event.webkit_movement.is_some() {
            DeltaSource::Webkit
        } else {
            DeltaSource::Standard
        };
        debug!("pointer delta source probed: {:?}", source);
        self.delta_source = Some(source);
    }

    fn deltas(&self, event: &PointerMotion) -> (f64, f64) {
        let field = match self.delta_source {
            Some(DeltaSource::Standard) | None => event.movement,
            Some(DeltaSource::Moz) => event.moz_movement,
            Some(DeltaSource::Webkit) => event.webkit_movement,
        };
        field.unwrap_or((0.0, 0.0))
    }
}

impl DeviceHandler for PointerHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configure(&mut self, property: &str, value: PropertyValue) -> Result<(), DeviceError> {
        match property {
            "infinite_x_axis" => self.infinite_x_axis = value.expect_bool(property)?,
            "infinite_y_axis" => self.infinite_y_axis = value.expect_bool(property)?,
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
        debug!("pointer handler destroyed, releasing {} resources", self.resources.len());
        for resource in &mut self.resources {
            resource.release();
        }
        self.resources.clear();
        self.bindings.clear();
        self.detection = None;
        self.destroyed = true;
    }
}

fn clamp(min: f64, max: f64, value: f64) -> f64 {
    value.max(min).min(max)
}
