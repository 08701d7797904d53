mod loader;
mod types;
mod watcher;

pub use types::{Config, TelemetryConfig};
pub use watcher::{ConfigEvent, ConfigWatcher};
