//! openinput — device-agnostic input binding and normalization.
//!
//! Applications describe *what* they want ("accelerate", "steer", "fire")
//! in a [`binding::BindingsConfig`]; device handlers translate raw keyboard,
//! pointer, gamepad and speech events into normalized `f64` values under
//! those descriptions. Consumers read the shared [`binding::InputState`]
//! whenever it suits them instead of subscribing to event streams.
//!
//! The [`controller::InputController`] ties it together: it owns the
//! binding table and the handler registry, fans out rebinds when the
//! configuration changes and toggles the detection mode used by binding
//! editors.
//!
//! Event-driven devices (keyboard, pointer, speech) are fed by the
//! platform layer calling handler methods directly; the snapshot-based
//! gamepad is driven by the [`runtime`] poll loop, backed by gilrs.

pub mod binding;
pub mod config;
pub mod controller;
pub mod devices;
pub mod runtime;

pub use binding::{BindingSpec, BindingsConfig, InputId, InputState, SharedInputState};
pub use config::{default_profile_path, load_profile, ProfileError};
pub use controller::{ControllerError, DetectionEvent, InputController};
pub use devices::{
    DeviceError, DeviceHandler, GamepadHandler, HandlerKind, KeyboardHandler, PointerHandler,
    PropertyValue, SpeechHandler,
};
pub use runtime::{GilrsSource, PollError, PollLoopHandle};
