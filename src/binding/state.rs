//! Shared input state: the live value of every bound description.
//!
//! The state is fully seeded when a configuration is applied, so callers can
//! read any configured description before the first raw event arrives.
//! Digital bindings hold 0/1, analog bindings a value in [-1, 1] (unbounded
//! in infinite-axis mode). The absolute pointer position lives in two
//! reserved fields outside the description namespace.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Handle to the one state container shared by controller and handlers.
///
/// Single-writer discipline: only device handlers write, and only from
/// inside a raw-event call or a poll tick.
pub type SharedInputState = Arc<RwLock<InputState>>;

pub fn shared_state() -> SharedInputState {
    Arc::new(RwLock::new(InputState::default()))
}

#[derive(Debug, Default)]
pub struct InputState {
    values: HashMap<String, f64>,
    /// Absolute pointer x position, in viewport coordinates.
    pub pointer_x: f64,
    /// Absolute pointer y position, in viewport coordinates.
    pub pointer_y: f64,
}

impl InputState {
    /// Current value for a description; unknown descriptions read as 0.
    pub fn value(&self, description: &str) -> f64 {
        self.values.get(description).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, description: &str, value: f64) {
        self.values.insert(description.to_string(), value);
    }

    /// Replaces the description namespace, seeding every entry with 0.
    ///
    /// Called when a configuration is applied, before any handler sees the
    /// new binding table. The pointer fields survive a reseed.
    pub fn reseed<'a>(&mut self, descriptions: impl IntoIterator<Item = &'a str>) {
        self.values.clear();
        for description in descriptions {
            self.values.insert(description.to_string(), 0.0);
        }
        debug!("input state reseeded with {} descriptions", self.values.len());
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_description_reads_zero() {
        let state = InputState::default();
        assert_eq!(state.value("missing"), 0.0);
    }

    #[test]
    fn reseed_zeroes_values_and_keeps_pointer() {
        let mut state = InputState::default();
        state.set("accelerate", 1.0);
        state.pointer_x = 320.0;
        state.pointer_y = 240.0;

        state.reseed(["accelerate", "brake"]);

        assert_eq!(state.value("accelerate"), 0.0);
        assert_eq!(state.value("brake"), 0.0);
        assert_eq!(state.len(), 2);
        assert_eq!(state.pointer_x, 320.0);
        assert_eq!(state.pointer_y, 240.0);
    }
}
