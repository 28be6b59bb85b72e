//! Binding profile loading.
//!
//! Profiles are TOML files mapping descriptions to binding specs:
//!
//! ```toml
//! accelerate = { device = "keyboard", input_id = 87, down = true, up = true }
//! steer = [
//!     { device = "mouse", input_id = "x" },
//!     { device = "gamepad", input_id = "axis-0", invert = true },
//! ]
//! ```
//!
//! Profiles are declarative input only; bindings remapped at runtime are
//! never written back.

use crate::binding::BindingsConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads a binding profile from a TOML file.
pub fn load_profile(path: impl AsRef<Path>) -> Result<BindingsConfig, ProfileError> {
    let path = path.as_ref();
    debug!("loading binding profile from {}", path.display());

    let raw = fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BindingsConfig = toml::from_str(&raw).map_err(|source| ProfileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "loaded binding profile: {} descriptions from {}",
        config.len(),
        path.display()
    );
    Ok(config)
}

/// Default profile location under the platform config directory.
pub fn default_profile_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("openinput").join("bindings.toml"))
}
