//! Device handlers: per-device normalization and edge detection.
//!
//! Each handler owns its slice of the binding table plus a handle to the
//! shared input state, and turns raw hardware events into discrete or
//! continuous values. Handlers never talk to each other; the controller is
//! the only entry point for configuration, rewiring and teardown.

pub mod error;
pub mod gamepad;
pub mod keyboard;
pub mod pointer;
pub mod speech;

pub use error::DeviceError;
pub use gamepad::{GamepadHandler, GamepadSnapshot};
pub use keyboard::KeyboardHandler;
pub use pointer::{PointerHandler, PointerMotion};
pub use speech::{
    RecognitionAlternative, RecognitionResult, RecognitionSession, ResultBatch, SpeechHandler,
};

use crate::binding::{DeviceBindings, SharedInputState};
use crate::controller::detection::DetectionHook;
use std::fmt;
use std::sync::Arc;

/// Value accepted by [`DeviceHandler::configure`].
///
/// The closed set of shapes a tunable can take: deadzones are numbers, axis
/// modes are booleans, the recognition language is text and the
/// recognition-ended notification is a callback.
#[derive(Clone)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Callback(Arc<dyn Fn() + Send + Sync>),
}

impl PropertyValue {
    pub fn callback(f: impl Fn() + Send + Sync + 'static) -> Self {
        PropertyValue::Callback(Arc::new(f))
    }

    pub(crate) fn expect_bool(self, property: &str) -> Result<bool, DeviceError> {
        match self {
            PropertyValue::Bool(value) => Ok(value),
            _ => Err(DeviceError::InvalidValue {
                property: property.to_string(),
                expected: "boolean",
            }),
        }
    }

    pub(crate) fn expect_number(self, property: &str) -> Result<f64, DeviceError> {
        match self {
            PropertyValue::Number(value) => Ok(value),
            _ => Err(DeviceError::InvalidValue {
                property: property.to_string(),
                expected: "number",
            }),
        }
    }

    pub(crate) fn expect_text(self, property: &str) -> Result<String, DeviceError> {
        match self {
            PropertyValue::Text(value) => Ok(value),
            _ => Err(DeviceError::InvalidValue {
                property: property.to_string(),
                expected: "text",
            }),
        }
    }

    pub(crate) fn expect_callback(
        self,
        property: &str,
    ) -> Result<Arc<dyn Fn() + Send + Sync>, DeviceError> {
        match self {
            PropertyValue::Callback(value) => Ok(value),
            _ => Err(DeviceError::InvalidValue {
                property: property.to_string(),
                expected: "callback",
            }),
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "Bool({value})"),
            PropertyValue::Number(value) => write!(f, "Number({value})"),
            PropertyValue::Text(value) => write!(f, "Text({value:?})"),
            PropertyValue::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Externally acquired resource a handler must release on teardown
/// (listener registrations, the pointer context-menu suppressor, a timer).
pub trait DeviceResource: Send {
    fn release(&mut self);
}

/// Release hook built from a closure, run at most once.
pub struct ReleaseGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Box<dyn DeviceResource> {
        Box::new(Self {
            release: Some(Box::new(release)),
        })
    }
}

impl DeviceResource for ReleaseGuard {
    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Contract shared by all device handlers.
pub trait DeviceHandler: Send {
    /// Declared device name; registry key and `device` field of bindings.
    fn name(&self) -> &'static str;

    /// Mutates one of the handler's declared tunables.
    fn configure(&mut self, property: &str, value: PropertyValue) -> Result<(), DeviceError>;

    /// Re-hands the handler its binding slice and the shared state. Called
    /// on registration and on every configuration update, so handlers pick
    /// up new bindings without being reconstructed.
    fn rebind(&mut self, bindings: DeviceBindings, input: SharedInputState);

    /// Installs or clears the detection hook. While a hook is present, raw
    /// events are reported through it and never touch the input state.
    fn set_detection(&mut self, hook: Option<DetectionHook>);

    /// Releases every acquired resource and leaves the handler inert.
    /// Never fails, even when resources were already released.
    fn destroy(&mut self);
}

/// The closed set of handler variants the controller registry stores.
pub enum HandlerKind {
    Keyboard(KeyboardHandler),
    Pointer(PointerHandler),
    Gamepad(GamepadHandler),
    Speech(SpeechHandler),
}

impl HandlerKind {
    fn inner_mut(&mut self) -> &mut dyn DeviceHandler {
        match self {
            HandlerKind::Keyboard(handler) => handler,
            HandlerKind::Pointer(handler) => handler,
            HandlerKind::Gamepad(handler) => handler,
            HandlerKind::Speech(handler) => handler,
        }
    }

    fn inner(&self) -> &dyn DeviceHandler {
        match self {
            HandlerKind::Keyboard(handler) => handler,
            HandlerKind::Pointer(handler) => handler,
            HandlerKind::Gamepad(handler) => handler,
            HandlerKind::Speech(handler) => handler,
        }
    }

    pub fn as_keyboard_mut(&mut self) -> Option<&mut KeyboardHandler> {
        match self {
            HandlerKind::Keyboard(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_pointer_mut(&mut self) -> Option<&mut PointerHandler> {
        match self {
            HandlerKind::Pointer(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_gamepad_mut(&mut self) -> Option<&mut GamepadHandler> {
        match self {
            HandlerKind::Gamepad(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_speech_mut(&mut self) -> Option<&mut SpeechHandler> {
        match self {
            HandlerKind::Speech(handler) => Some(handler),
            _ => None,
        }
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerKind").field(&self.name()).finish()
    }
}

impl DeviceHandler for HandlerKind {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn configure(&mut self, property: &str, value: PropertyValue) -> Result<(), DeviceError> {
        self.inner_mut().configure(property, value)
    }

    fn rebind(&mut self, bindings: DeviceBindings, input: SharedInputState) {
        self.inner_mut().rebind(bindings, input);
    }

    fn set_detection(&mut self, hook: Option<DetectionHook>) {
        self.inner_mut().set_detection(hook);
    }

    fn destroy(&mut self) {
        self.inner_mut().destroy();
    }
}
