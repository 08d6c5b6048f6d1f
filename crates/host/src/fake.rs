//! Recording in-memory host implementations for tests.
//!
//! Each fake records what the extension did to it and lets tests script the
//! answers that would normally come from the user (quick-pick choices,
//! popup buttons, terminal keystrokes).

use crate::{
    Configuration, Diagnostic, DiagnosticsSink, ExternalOpener, HostContext, InputSink,
    KeyValueStore, MenuItem, MessageSink, QuickPick, StatusBar, StatusItemHandle, TerminalDisplay,
    TerminalHandle, TerminalHost,
};
use async_trait::async_trait;
use collections::FxHashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Observable state of one fake status-bar item.
#[derive(Debug, Default, Clone)]
pub struct StatusItemState {
    pub text: String,
    pub tooltip: String,
    pub visible: bool,
    pub disposed: bool,
}

pub struct FakeStatusItem {
    pub id: String,
    state: Mutex<StatusItemState>,
}

impl FakeStatusItem {
    pub fn state(&self) -> StatusItemState {
        self.state.lock().clone()
    }
}

impl StatusItemHandle for FakeStatusItem {
    fn set_text(&self, text: &str) {
        self.state.lock().text = text.to_string();
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.state.lock().tooltip = tooltip.to_string();
    }

    fn show(&self) {
        self.state.lock().visible = true;
    }

    fn hide(&self) {
        self.state.lock().visible = false;
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.disposed = true;
    }
}

#[derive(Default)]
pub struct FakeStatusBar {
    items: Mutex<Vec<Arc<FakeStatusItem>>>,
}

impl FakeStatusBar {
    pub fn item(&self, id: &str) -> Option<Arc<FakeStatusItem>> {
        self.items.lock().iter().find(|i| i.id == id).cloned()
    }

    pub fn items(&self) -> Vec<Arc<FakeStatusItem>> {
        self.items.lock().clone()
    }
}

impl StatusBar for FakeStatusBar {
    fn create_item(&self, id: &str, _priority: i32) -> Arc<dyn StatusItemHandle> {
        let item = Arc::new(FakeStatusItem {
            id: id.to_string(),
            state: Mutex::default(),
        });
        self.items.lock().push(item.clone());
        item
    }
}

/// Quick-pick fake: answers are scripted by label, in order.
#[derive(Default)]
pub struct FakeQuickPick {
    answers: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<(String, Vec<MenuItem>)>>,
}

impl FakeQuickPick {
    /// Script the next answer: the label the "user" will pick.
    pub fn push_answer(&self, label: Option<&str>) {
        self.answers.lock().push_back(label.map(str::to_string));
    }

    /// Prompts shown so far, with the items that were offered.
    pub fn prompts(&self) -> Vec<(String, Vec<MenuItem>)> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl QuickPick for FakeQuickPick {
    async fn pick(&self, placeholder: &str, items: &[MenuItem]) -> Option<MenuItem> {
        self.prompts
            .lock()
            .push((placeholder.to_string(), items.to_vec()));
        let label = self.answers.lock().pop_front().flatten()?;
        items.iter().find(|i| i.label == label).cloned()
    }
}

#[derive(Default)]
pub struct FakeMessages {
    pub errors: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<String>>,
    info_answers: Mutex<VecDeque<Option<String>>>,
}

impl FakeMessages {
    pub fn push_info_answer(&self, button: Option<&str>) {
        self.info_answers
            .lock()
            .push_back(button.map(str::to_string));
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

#[async_trait]
impl MessageSink for FakeMessages {
    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    async fn show_info(&self, message: &str, _buttons: &[&str]) -> Option<String> {
        self.infos.lock().push(message.to_string());
        self.info_answers.lock().pop_front().flatten()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<FxHashMap<String, serde_json::Value>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<serde_json::Value>) {
        let mut entries = self.entries.lock();
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
    }
}

#[derive(Default)]
pub struct FakeDiagnostics {
    published: Mutex<Vec<(PathBuf, Vec<Diagnostic>)>>,
    pub publish_count: Mutex<usize>,
    pub clear_count: Mutex<usize>,
}

impl FakeDiagnostics {
    pub fn published(&self) -> Vec<(PathBuf, Vec<Diagnostic>)> {
        self.published.lock().clone()
    }
}

impl DiagnosticsSink for FakeDiagnostics {
    fn publish(&self, by_file: Vec<(PathBuf, Vec<Diagnostic>)>) {
        *self.published.lock() = by_file;
        *self.publish_count.lock() += 1;
    }

    fn clear(&self) {
        self.published.lock().clear();
        *self.clear_count.lock() += 1;
    }
}

#[derive(Debug, Default)]
struct FakeTerminalState {
    output: String,
    shown: bool,
    disposed: bool,
}

/// A fake terminal view. Implements both the handle and the display writer;
/// keeps the input sink so tests can type into it.
pub struct FakeTerminal {
    pub label: String,
    input: Arc<dyn InputSink>,
    state: Mutex<FakeTerminalState>,
}

impl FakeTerminal {
    /// Everything written to the display so far.
    pub fn output(&self) -> String {
        self.state.lock().output.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Simulate the user typing into the view.
    pub fn type_input(&self, data: &str) {
        self.input.handle_input(data);
    }

    /// Simulate the view attaching its display.
    pub fn attach(&self) {
        self.input.open();
    }
}

impl TerminalHandle for FakeTerminal {
    fn show(&self, _preserve_focus: bool) {
        self.state.lock().shown = true;
    }

    fn dispose(&self) {
        let mut state = self.state.lock();
        state.disposed = true;
        drop(state);
        self.input.close();
    }
}

impl TerminalDisplay for FakeTerminal {
    fn write(&self, data: &str) {
        self.state.lock().output.push_str(data);
    }
}

#[derive(Default)]
pub struct FakeTerminalHost {
    terminals: Mutex<Vec<Arc<FakeTerminal>>>,
}

impl FakeTerminalHost {
    pub fn terminal(&self, label: &str) -> Option<Arc<FakeTerminal>> {
        self.terminals
            .lock()
            .iter()
            .find(|t| t.label == label && !t.is_disposed())
            .cloned()
    }

    pub fn created_count(&self) -> usize {
        self.terminals.lock().len()
    }
}

impl TerminalHost for FakeTerminalHost {
    fn find(&self, label: &str) -> Option<Arc<dyn TerminalHandle>> {
        self.terminal(label).map(|t| t as Arc<dyn TerminalHandle>)
    }

    fn create(
        &self,
        label: &str,
        input: Arc<dyn InputSink>,
    ) -> (Arc<dyn TerminalHandle>, Arc<dyn TerminalDisplay>) {
        let terminal = Arc::new(FakeTerminal {
            label: label.to_string(),
            input,
            state: Mutex::default(),
        });
        self.terminals.lock().push(terminal.clone());
        // The real host attaches the display asynchronously; the fake does it
        // inline so tests see output immediately.
        terminal.attach();
        (terminal.clone(), terminal)
    }
}

#[derive(Default)]
pub struct FakeConfiguration {
    bools: Mutex<FxHashMap<String, bool>>,
    strings: Mutex<FxHashMap<String, String>>,
}

impl FakeConfiguration {
    pub fn set_bool(&self, key: &str, value: bool) {
        self.bools.lock().insert(key.to_string(), value);
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.strings
            .lock()
            .insert(key.to_string(), value.to_string());
    }
}

impl Configuration for FakeConfiguration {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.bools.lock().get(key).copied()
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.lock().get(key).cloned()
    }
}

#[derive(Default)]
pub struct FakeOpener {
    pub opened: Mutex<Vec<String>>,
}

impl ExternalOpener for FakeOpener {
    fn open_url(&self, url: &str) {
        self.opened.lock().push(url.to_string());
    }
}

/// All fakes bundled, plus a [`HostContext`] view over them.
pub struct FakeHost {
    pub status_bar: Arc<FakeStatusBar>,
    pub quick_pick: Arc<FakeQuickPick>,
    pub messages: Arc<FakeMessages>,
    pub storage: Arc<MemoryStore>,
    pub diagnostics: Arc<FakeDiagnostics>,
    pub terminals: Arc<FakeTerminalHost>,
    pub config: Arc<FakeConfiguration>,
    pub opener: Arc<FakeOpener>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            status_bar: Arc::new(FakeStatusBar::default()),
            quick_pick: Arc::new(FakeQuickPick::default()),
            messages: Arc::new(FakeMessages::default()),
            storage: Arc::new(MemoryStore::default()),
            diagnostics: Arc::new(FakeDiagnostics::default()),
            terminals: Arc::new(FakeTerminalHost::default()),
            config: Arc::new(FakeConfiguration::default()),
            opener: Arc::new(FakeOpener::default()),
        }
    }

    pub fn context(&self) -> HostContext {
        HostContext {
            status_bar: self.status_bar.clone(),
            quick_pick: self.quick_pick.clone(),
            messages: self.messages.clone(),
            storage: self.storage.clone(),
            diagnostics: self.diagnostics.clone(),
            terminals: self.terminals.clone(),
            config: self.config.clone(),
            opener: self.opener.clone(),
        }
    }
}
