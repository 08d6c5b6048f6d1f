//! The extension's user-facing error type.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// An error on its way to the user.
///
/// Carries a log-once flag: the same error object frequently passes through
/// several nested handlers, and each of them may try to log it. Only the
/// first attempt writes to the log sink.
pub struct ExtensionError {
    message: String,
    logged: AtomicBool,
}

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            logged: AtomicBool::new(false),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Write to the log sink, once. Subsequent calls are no-ops.
    pub fn log(&self) {
        if !self.logged.swap(true, Ordering::SeqCst) {
            tracing::error!("{}", self.message);
        }
    }

    /// Whether this error already reached the log sink.
    pub fn was_logged(&self) -> bool {
        self.logged.load(Ordering::SeqCst)
    }
}

impl From<anyhow::Error> for ExtensionError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{:#}", error))
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionError")
            .field("message", &self.message)
            .field("logged", &self.was_logged())
            .finish()
    }
}

impl std::error::Error for ExtensionError {}
