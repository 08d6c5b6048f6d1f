//! Narrow interfaces onto the host IDE.
//!
//! Everything the extension needs from the surrounding editor — status-bar
//! items, quick-pick prompts, terminal views, message popups, per-workspace
//! storage, diagnostics publication — is consumed through the traits in this
//! crate. The rest of the workspace contains no host-API dependencies; an
//! embedder implements these traits once and threads a [`HostContext`]
//! through the component graph.
//!
//! The [`fake`] module provides recording in-memory implementations used by
//! the test suites.

pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// One selectable entry in a menu or quick-pick prompt.
///
/// Labels are unique within a menu; order is significant (the first item is
/// the default). The shape is persisted verbatim into workspace storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: Some(description.into()),
        }
    }
}

/// Handle to one status-bar item.
pub trait StatusItemHandle: Send + Sync {
    fn set_text(&self, text: &str);
    fn set_tooltip(&self, tooltip: &str);
    fn show(&self);
    fn hide(&self);
    fn dispose(&self);
}

/// Factory for status-bar items. Priority orders items left-to-right.
pub trait StatusBar: Send + Sync {
    fn create_item(&self, id: &str, priority: i32) -> Arc<dyn StatusItemHandle>;
}

/// Modal list prompt.
#[async_trait]
pub trait QuickPick: Send + Sync {
    /// Present the items; resolves to the picked entry, or `None` when the
    /// user dismisses the prompt.
    async fn pick(&self, placeholder: &str, items: &[MenuItem]) -> Option<MenuItem>;
}

/// Host popups.
#[async_trait]
pub trait MessageSink: Send + Sync {
    fn show_error(&self, message: &str);
    /// Non-blocking informational popup with action buttons; resolves to the
    /// chosen button label, or `None` when dismissed.
    async fn show_info(&self, message: &str, buttons: &[&str]) -> Option<String>;
}

/// Per-workspace durable key/value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    /// `None` deletes the entry.
    fn set(&self, key: &str, value: Option<serde_json::Value>);
}

/// Diagnostic severity as displayed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
}

/// Zero-based half-open source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// One problem record as displayed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Problem list publication. Each `publish` fully replaces the previous set.
pub trait DiagnosticsSink: Send + Sync {
    fn publish(&self, by_file: Vec<(PathBuf, Vec<Diagnostic>)>);
    fn clear(&self);
}

/// Raw keystrokes from a terminal view are routed into this sink.
pub trait InputSink: Send + Sync {
    /// The view attached its display; output may be written from now on.
    fn open(&self);
    fn handle_input(&self, data: &str);
    /// The user closed the terminal view.
    fn close(&self);
}

/// Writer rendering text into a terminal view. Accepts raw ANSI passthrough.
pub trait TerminalDisplay: Send + Sync {
    fn write(&self, data: &str);
}

/// Handle to one terminal view.
pub trait TerminalHandle: Send + Sync {
    fn show(&self, preserve_focus: bool);
    fn dispose(&self);
}

/// Find-or-create access to the host's terminal views.
pub trait TerminalHost: Send + Sync {
    fn find(&self, label: &str) -> Option<Arc<dyn TerminalHandle>>;
    /// Create a view backed by `input`; returns the view handle and the
    /// display writer bound to it.
    fn create(
        &self,
        label: &str,
        input: Arc<dyn InputSink>,
    ) -> (Arc<dyn TerminalHandle>, Arc<dyn TerminalDisplay>);
}

/// Read access to the host's user configuration.
pub trait Configuration: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn get_string(&self, key: &str) -> Option<String>;
}

/// Opens a URL in the user's browser.
pub trait ExternalOpener: Send + Sync {
    fn open_url(&self, url: &str);
}

/// Everything the extension needs from the host, bundled for injection.
#[derive(Clone)]
pub struct HostContext {
    pub status_bar: Arc<dyn StatusBar>,
    pub quick_pick: Arc<dyn QuickPick>,
    pub messages: Arc<dyn MessageSink>,
    pub storage: Arc<dyn KeyValueStore>,
    pub diagnostics: Arc<dyn DiagnosticsSink>,
    pub terminals: Arc<dyn TerminalHost>,
    pub config: Arc<dyn Configuration>,
    pub opener: Arc<dyn ExternalOpener>,
}
