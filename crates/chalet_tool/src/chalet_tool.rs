//! Interface to the external `chalet` executable.
//!
//! The tool is an opaque collaborator: this crate knows how to query it for
//! state (JSON documents, tab-separated architecture lists, a version
//! string), how to assemble command-line invocations for builds, and nothing
//! about what it does internally.

mod args;
mod query;
mod state;
mod version;

pub use args::{CommandKind, CommandOptions};
pub use query::{QueryKind, ToolRunner, EMPTY_OUTPUT_RETRIES};
pub use state::{ChaletState, SettingsState, ToolState};
pub use version::{ToolVersion, DOWNLOAD_URL, MINIMUM_VERSION};
