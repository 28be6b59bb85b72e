//! Controller subsystem: the single entry and exit point for binding
//! configuration, handler lifecycle and detection mode.
//!
//! # Architecture
//!
//! ```text
//! BindingsConfig ──► BindingTable ──► per-device slices
//!                         │
//!                   InputController ──► {keyboard, mouse, gamepad, speech}
//!                         │                        │
//!                    InputState ◄──────── writes ──┘
//! ```
//!
//! Handlers never talk to each other; the controller fans configuration and
//! detection toggles out to every registered handler.

pub mod controller;
pub mod detection;

pub use controller::{ControllerError, InputController};
pub use detection::{DetectionCallback, DetectionEvent, DetectionHook};
