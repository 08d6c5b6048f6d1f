//! The chalet-ide extension core.
//!
//! [`Extension`] is the orchestrator: it reacts to changes of the two
//! watched configuration files, re-queries the external tool, keeps the
//! status-bar menus in sync, and dispatches build commands into the
//! terminal session controller. Everything host-facing goes through the
//! `host` traits; embedders construct a [`host::HostContext`] and hand it to
//! [`Extension::new`].

mod error;
mod orchestrator;

pub use error::ExtensionError;
pub use orchestrator::{Extension, TERMINAL_LABEL};

/// Initialize the logging system. Embedders call this once; tests skip it.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chalet_ide=info,warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    tracing::info!("chalet-ide v{} starting up", env!("CARGO_PKG_VERSION"));
}
