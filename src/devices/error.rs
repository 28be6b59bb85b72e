//! Error definitions for device handlers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// The property is not in the handler's configurable set. The handler's
    /// state is unchanged.
    #[error("property '{property}' is not configurable on the {device} handler")]
    UnsupportedProperty {
        device: &'static str,
        property: String,
    },

    /// The property exists but the supplied value has the wrong shape.
    #[error("property '{property}' expects a {expected} value")]
    InvalidValue {
        property: String,
        expected: &'static str,
    },
}
