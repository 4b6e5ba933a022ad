//! Configuration and dependency initialization.

mod dependencies;
mod settings;

pub use dependencies::{ConnectionMode, Dependencies};
pub use settings::{Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
