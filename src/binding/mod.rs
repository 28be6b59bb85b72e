//! Binding domain: configuration, the normalized binding table and the
//! shared input state.
//!
//! A binding configuration maps a *description* (the semantic name of an
//! action, e.g. `"accelerate"`) to one or more physical inputs. The table
//! normalizes that mapping per device, and the input state holds the live
//! per-frame value for every description.

pub mod config;
pub mod state;
pub mod table;

pub use config::{BindingSlot, BindingSpec, BindingsConfig, InputId};
pub use state::{shared_state, InputState, SharedInputState};
pub use table::{Binding, BindingTable, DeviceBindings};
