//! Centralized path management for chalet-ide.
//!
//! All well-known file locations are lazily initialized and cached.
//! Use `set_*` functions before first access to override for testing.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static GLOBAL_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Project configuration file names accepted at the workspace root,
/// in lookup order.
pub const PROJECT_FILE_NAMES: [&str; 2] = ["chalet.json", "chalet.yaml"];

/// Per-workspace local settings file name.
pub const LOCAL_SETTINGS_FILE: &str = ".chaletrc";

/// ~/.chalet (or overridden for tests)
pub fn global_dir() -> &'static PathBuf {
    GLOBAL_DIR.get_or_init(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chalet")
    })
}

/// Override the global directory (must be called before first access).
/// For testing.
pub fn set_global_dir(path: PathBuf) {
    let _ = GLOBAL_DIR.set(path);
}

/// Global settings file: global_dir()/config.json
pub fn global_settings_file() -> PathBuf {
    global_dir().join("config.json")
}

/// Resolve the project configuration file inside a workspace root.
///
/// Both accepted file names are probed in order; the first that exists wins.
/// Returns the default name's path when neither exists (callers treat a
/// missing file as an empty configuration).
pub fn project_file(workspace_root: &Path) -> PathBuf {
    for name in PROJECT_FILE_NAMES {
        let candidate = workspace_root.join(name);
        if candidate.exists() {
            return candidate;
        }
    }
    workspace_root.join(PROJECT_FILE_NAMES[0])
}

/// Per-workspace settings file: `<root>/.chaletrc`
pub fn local_settings_file(workspace_root: &Path) -> PathBuf {
    workspace_root.join(LOCAL_SETTINGS_FILE)
}
