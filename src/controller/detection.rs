//! Detection session: remap-on-input support shared across handlers.
//!
//! While a session is live every handler reports raw inputs through one
//! shared hook instead of applying them to the input state. The hook stamps
//! each event at capture time. Handlers consult the hook at the start of
//! their own event handling, never cache its presence across events.

use crate::binding::InputId;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Raw input reported during a detection session.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    /// Declared name of the reporting device handler.
    pub device: &'static str,
    pub input_id: InputId,
    pub is_axis: bool,
    /// Capture timestamp, stamped when the event is emitted.
    pub timestamp: DateTime<Local>,
}

pub type DetectionCallback = Arc<dyn Fn(DetectionEvent) + Send + Sync>;

/// Shared, clonable handle to the detection callback.
///
/// Installed on every registered handler by the controller; a handler is in
/// detection mode exactly while it holds one. Emitting never fails.
#[derive(Clone)]
pub struct DetectionHook {
    callback: DetectionCallback,
}

impl DetectionHook {
    pub fn new(callback: DetectionCallback) -> Self {
        Self { callback }
    }

    pub fn emit(&self, device: &'static str, input_id: InputId, is_axis: bool) {
        let event = DetectionEvent {
            device,
            input_id,
            is_axis,
            timestamp: Local::now(),
        };
        debug!(
            "detected input: {}/{} (axis: {})",
            event.device, event.input_id, event.is_axis
        );
        (self.callback)(event);
    }
}

impl fmt::Debug for DetectionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionHook").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn emit_stamps_capture_time() {
        let seen: Arc<Mutex<Vec<DetectionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook = DetectionHook::new(Arc::new(move |event| sink.lock().push(event)));

        let before = Local::now();
        hook.emit("keyboard", InputId::Index(87), false);
        let after = Local::now();

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].device, "keyboard");
        assert!(!events[0].is_axis);
        assert!(events[0].timestamp >= before && events[0].timestamp <= after);
    }
}
