//! The input controller: owns the binding table, the shared input state and
//! the handler registry.

use crate::binding::{shared_state, BindingTable, BindingsConfig, SharedInputState};
use crate::controller::detection::{DetectionEvent, DetectionHook};
use crate::devices::{DeviceError, DeviceHandler, HandlerKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no handler registered under the name '{0}'")]
    HandlerNotFound(String),

    /// Registering a second handler under a live name would orphan the
    /// first one's acquired listeners, so it is rejected outright.
    #[error("a handler named '{0}' is already registered")]
    DuplicateHandler(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Supervises the device handlers and is the single interface to talk to.
///
/// Typical wiring:
///
/// ```
/// use openinput::binding::{BindingSpec, BindingsConfig};
/// use openinput::controller::InputController;
/// use openinput::devices::{HandlerKind, KeyboardHandler};
///
/// let mut controller = InputController::new();
/// controller
///     .register(HandlerKind::Keyboard(KeyboardHandler::new(
///         Default::default(),
///         controller.input(),
///     )))
///     .unwrap();
///
/// let mut config = BindingsConfig::new();
/// config.bind("accelerate", BindingSpec::new("keyboard", 87).down().up());
/// controller.set_bindings(&config);
///
/// // Values are readable before any raw event occurs.
/// assert_eq!(controller.value("accelerate"), 0.0);
/// ```
pub struct InputController {
    table: BindingTable,
    input: SharedInputState,
    handlers: HashMap<String, HandlerKind>,
    detection: Option<DetectionHook>,
}

impl InputController {
    pub fn new() -> Self {
        Self {
            table: BindingTable::new(),
            input: shared_state(),
            handlers: HashMap::new(),
            detection: None,
        }
    }

    /// Handle to the shared input state for reading values directly.
    pub fn input(&self) -> SharedInputState {
        self.input.clone()
    }

    /// Current value of a description (0 when unknown).
    pub fn value(&self, description: &str) -> f64 {
        self.input.read().value(description)
    }

    /// Absolute pointer position from the reserved state fields.
    pub fn pointer_position(&self) -> (f64, f64) {
        let state = self.input.read();
        (state.pointer_x, state.pointer_y)
    }

    /// Applies a new binding configuration.
    ///
    /// Rebuilds the table, re-seeds the input state and re-hands every live
    /// handler its slice, so handlers pick up the new bindings without being
    /// reconstructed.
    pub fn set_bindings(&mut self, config: &BindingsConfig) {
        self.table.apply(config, &self.input);
        for (name, handler) in &mut self.handlers {
            handler.rebind(self.table.device(name), self.input.clone());
        }
        info!(
            "bindings applied: {} descriptions across {} handlers",
            config.len(),
            self.handlers.len()
        );
    }

    /// Registers a device handler under its declared name.
    ///
    /// The handler is wired to its slice of the current table and the
    /// shared state, and joins a running detection session immediately.
    /// A name collision destroys the incoming handler and errors.
    pub fn register(&mut self, mut handler: HandlerKind) -> Result<(), ControllerError> {
        let name = handler.name();
        if self.handlers.contains_key(name) {
            warn!("rejecting duplicate handler registration: {}", name);
            handler.destroy();
            return Err(ControllerError::DuplicateHandler(name.to_string()));
        }

        handler.rebind(self.table.device(name), self.input.clone());
        handler.set_detection(self.detection.clone());
        info!("registered device handler: {}", name);
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Destroys and removes a single handler.
    pub fn unregister(&mut self, name: &str) -> Result<(), ControllerError> {
        match self.handlers.remove(name) {
            Some(mut handler) => {
                handler.destroy();
                info!("unregistered device handler: {}", name);
                Ok(())
            }
            None => Err(ControllerError::HandlerNotFound(name.to_string())),
        }
    }

    pub fn handler(&self, name: &str) -> Result<&HandlerKind, ControllerError> {
        self.handlers
            .get(name)
            .ok_or_else(|| ControllerError::HandlerNotFound(name.to_string()))
    }

    pub fn handler_mut(&mut self, name: &str) -> Result<&mut HandlerKind, ControllerError> {
        self.handlers
            .get_mut(name)
            .ok_or_else(|| ControllerError::HandlerNotFound(name.to_string()))
    }

    /// Sets a configurable property on a registered handler.
    pub fn configure_handler(
        &mut self,
        name: &str,
        property: &str,
        value: impl Into<crate::devices::PropertyValue>,
    ) -> Result<(), ControllerError> {
        self.handler_mut(name)?
            .configure(property, value.into())
            .map_err(ControllerError::from)
    }

    /// Starts a detection session: raw inputs are reported through the
    /// callback (capture-timestamped) instead of being applied to state.
    pub fn start_detecting(&mut self, callback: impl Fn(DetectionEvent) + Send + Sync + 'static) {
        let hook = DetectionHook::new(Arc::new(callback));
        debug!("detection session started");
        for handler in self.handlers.values_mut() {
            handler.set_detection(Some(hook.clone()));
        }
        self.detection = Some(hook);
    }

    /// Ends the detection session; handlers resume normal binding logic.
    pub fn stop_detecting(&mut self) {
        debug!("detection session stopped");
        self.detection = None;
        for handler in self.handlers.values_mut() {
            handler.set_detection(None);
        }
    }

    pub fn is_detecting(&self) -> bool {
        self.detection.is_some()
    }

    /// Tears down every handler and clears the registry. Never fails, even
    /// when a handler already released its resources.
    pub fn destroy(&mut self) {
        info!(
            "destroying input controller ({} handlers)",
            self.handlers.len()
        );
        for handler in self.handlers.values_mut() {
            handler.destroy();
        }
        self.handlers.clear();
        self.detection = None;
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputController {
    fn drop(&mut self) {
        self.destroy();
    }
}
