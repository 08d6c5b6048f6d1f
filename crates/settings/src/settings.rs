//! Watched configuration files and extension settings.
//!
//! Two files drive the extension's state: the project configuration
//! (`chalet.json` or `chalet.yaml`) and the per-workspace settings file
//! (`.chaletrc`), with a global per-user settings file as fallback. Both are
//! watched by polling (~1 s, content-compared) so atomic-replace editors
//! don't drop events, and re-reads are debounced on byte-identical content.

mod config;
mod files;
mod watcher;

pub use config::ExtensionConfig;
pub use files::{FileRead, WatchedFile};
pub use watcher::{watch, watch_with_interval, ConfigWatcher, POLL_INTERVAL};
