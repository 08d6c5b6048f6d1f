//! The terminal session controller.
//!
//! One controller owns one logical terminal (looked up by label), one
//! process slot, and the bridge between them. Executions are serialized:
//! starting a new one always halts whatever was running.

use crate::bridge::TerminalBridge;
use crate::process::{ChaletProcess, ExecuteOptions, ProcessEvents, ProcessOutcome};
use anyhow::{bail, Result};
use host::{TerminalHandle, TerminalHost};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Settle time between showing a freshly created terminal view and spawning
/// the process. Keeps terminal-initialization output from interleaving with
/// process output — a heuristic, not a guarantee.
pub const STARTUP_DELAY: Duration = Duration::from_millis(250);

/// One execution request.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// Clear the terminal display before spawning.
    pub clear_before: bool,
}

pub struct TerminalController {
    label: String,
    terminals: Arc<dyn TerminalHost>,
    process: Arc<ChaletProcess>,
    bridge: Arc<TerminalBridge>,
    view: Mutex<Option<Arc<dyn TerminalHandle>>>,
    disposed: AtomicBool,
}

impl TerminalController {
    pub fn new(terminals: Arc<dyn TerminalHost>, label: impl Into<String>) -> Arc<Self> {
        let process = Arc::new(ChaletProcess::new());
        let bridge = Arc::new(TerminalBridge::new(process.clone()));
        Arc::new(Self {
            label: label.into(),
            terminals,
            process,
            bridge,
            view: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.process.is_running()
    }

    /// Run the tool in this controller's terminal.
    ///
    /// Finds or creates the terminal view, shows it, waits out the settle
    /// delay, optionally clears the display, then spawns. Resolves with the
    /// classified outcome when the child closes.
    pub async fn execute(
        &self,
        options: SessionOptions,
        events: Arc<dyn ProcessEvents>,
    ) -> Result<ProcessOutcome> {
        if self.disposed.load(Ordering::SeqCst) {
            bail!("terminal controller was disposed");
        }

        let view = self.find_or_create_view();
        view.show(true);
        tokio::time::sleep(STARTUP_DELAY).await;

        if options.clear_before {
            self.bridge.clear_display();
        }

        let execute = ExecuteOptions {
            executable: options.executable,
            args: options.args,
            cwd: options.cwd,
            env: options.env,
            label: self.label.clone(),
        };
        let forwarding = Arc::new(ForwardingEvents {
            bridge: self.bridge.clone(),
            inner: events,
        });
        self.process.execute(execute, forwarding).await
    }

    /// Write directly into the terminal view (status text, error coloring).
    pub fn write_to_display(&self, text: &str) {
        self.bridge.write_to_display(text);
    }

    pub fn interrupt(&self) {
        self.process.interrupt();
    }

    pub fn terminate(&self) {
        self.process.terminate();
    }

    /// Tear down process, view, and bridge, in that order. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.process.terminate();
        if let Some(view) = self.view.lock().take() {
            view.dispose();
        }
        self.bridge.detach_display();
    }

    fn find_or_create_view(&self) -> Arc<dyn TerminalHandle> {
        // The user may have closed the view since last time; always ask the
        // host rather than trusting the cached handle alone.
        if let Some(existing) = self.terminals.find(&self.label) {
            *self.view.lock() = Some(existing.clone());
            return existing;
        }
        let (handle, display) = self
            .terminals
            .create(&self.label, self.bridge.clone() as Arc<dyn host::InputSink>);
        self.bridge.attach_display(display);
        *self.view.lock() = Some(handle.clone());
        handle
    }
}

/// Splices process output into the terminal display on its way to the
/// caller's observer.
struct ForwardingEvents {
    bridge: Arc<TerminalBridge>,
    inner: Arc<dyn ProcessEvents>,
}

impl ProcessEvents for ForwardingEvents {
    fn on_output(&self, chunk: &str) {
        self.bridge.write_to_display(chunk);
        self.inner.on_output(chunk);
    }

    fn on_capture(&self, buffer: &str) {
        self.inner.on_capture(buffer);
    }

    fn on_exit(&self, outcome: &ProcessOutcome) {
        self.inner.on_exit(outcome);
    }

    fn on_failure(&self, message: &str) {
        self.inner.on_failure(message);
    }
}
