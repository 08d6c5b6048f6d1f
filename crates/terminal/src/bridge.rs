//! The pseudo-terminal bridge: the host terminal's input/display contract
//! over a child process.
//!
//! Keystrokes arrive from the host as raw chunks. Control sequences pass
//! straight through to the child; printable input is line-buffered locally
//! (the child only sees whole lines), echoed to the display as typed, and
//! flushed atomically on Enter.

use crate::process::ChaletProcess;
use anyhow::Result;
use host::{InputSink, TerminalDisplay};
use parking_lot::Mutex;
use std::sync::Arc;

/// Where buffered input lines are flushed to. Implemented by
/// [`ChaletProcess`]; tests substitute a recorder.
pub trait InputTarget: Send + Sync {
    fn write_input(&self, data: &[u8]) -> Result<()>;
    /// Halt the target because the terminal view went away.
    fn shutdown(&self);
}

impl InputTarget for ChaletProcess {
    fn write_input(&self, data: &[u8]) -> Result<()> {
        ChaletProcess::write_input(self, data)
    }

    fn shutdown(&self) {
        self.terminate();
    }
}

/// End-of-text: the interrupt character (Ctrl+C).
const ETX: &str = "\x03";
/// DEL, what terminals send for the backspace key.
const BACKSPACE: &str = "\x7f";
/// Erase sequence echoed to the display for one deleted character.
const ERASE: &str = "\x08 \x08";
/// The Enter chunk as delivered by the host terminal.
const CRLF: &str = "\r\n";

/// Control sequences forwarded to the child without buffering: arrows,
/// paging, insert, delete.
const PASSTHROUGH_SEQUENCES: [&str; 8] = [
    "\x1b[A", "\x1b[B", "\x1b[C", "\x1b[D", // arrows
    "\x1b[5~", "\x1b[6~", // page up/down
    "\x1b[2~", "\x1b[3~", // insert/delete
];

struct BridgeState {
    display: Option<Arc<dyn TerminalDisplay>>,
    line_buffer: String,
    open: bool,
}

/// Implements [`host::InputSink`] for one terminal view.
pub struct TerminalBridge {
    target: Arc<dyn InputTarget>,
    state: Mutex<BridgeState>,
}

impl TerminalBridge {
    pub fn new(target: Arc<dyn InputTarget>) -> Self {
        Self {
            target,
            state: Mutex::new(BridgeState {
                display: None,
                line_buffer: String::new(),
                open: false,
            }),
        }
    }

    /// Bind the display writer returned by the host when the view was
    /// created.
    pub fn attach_display(&self, display: Arc<dyn TerminalDisplay>) {
        self.state.lock().display = Some(display);
    }

    pub fn detach_display(&self) {
        let mut state = self.state.lock();
        state.display = None;
        state.open = false;
    }

    /// Render process output (or our own echo) into the view.
    pub fn write_to_display(&self, text: &str) {
        let state = self.state.lock();
        if let Some(display) = &state.display {
            display.write(text);
        }
    }

    /// Clear the terminal view.
    pub fn clear_display(&self) {
        self.write_to_display("\x1b[2J\x1b[3J\x1b[H");
    }

    fn forward(&self, data: &str) {
        if let Err(error) = self.target.write_input(data.as_bytes()) {
            tracing::debug!("dropping terminal input, no child: {}", error);
        }
    }
}

impl InputSink for TerminalBridge {
    fn open(&self) {
        self.state.lock().open = true;
    }

    fn handle_input(&self, data: &str) {
        // Unbuffered control input goes straight to the child.
        if data == ETX || PASSTHROUGH_SEQUENCES.contains(&data) {
            self.forward(data);
            return;
        }

        if data == BACKSPACE {
            let erase = {
                let mut state = self.state.lock();
                state.line_buffer.pop().is_some()
            };
            // Only erase what was actually typed.
            if erase {
                self.write_to_display(ERASE);
            }
            return;
        }

        if data == CRLF {
            // Flush the whole line atomically, then clear it.
            let line = {
                let mut state = self.state.lock();
                std::mem::take(&mut state.line_buffer)
            };
            let mut payload = line;
            payload.push_str(platform::INPUT_LINE_ENDING);
            self.forward(&payload);
            self.write_to_display("\r\n");
            return;
        }

        // Everything else accumulates until Enter.
        self.state.lock().line_buffer.push_str(data);
        self.write_to_display(data);
    }

    fn close(&self) {
        tracing::debug!("terminal view closed by the host");
        self.target.shutdown();
        self.detach_display();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        written: Mutex<Vec<Vec<u8>>>,
        shutdowns: Mutex<usize>,
    }

    impl RecordingTarget {
        fn written_strings(&self) -> Vec<String> {
            self.written
                .lock()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect()
        }
    }

    impl InputTarget for RecordingTarget {
        fn write_input(&self, data: &[u8]) -> Result<()> {
            self.written.lock().push(data.to_vec());
            Ok(())
        }

        fn shutdown(&self) {
            *self.shutdowns.lock() += 1;
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        text: Mutex<String>,
    }

    impl TerminalDisplay for RecordingDisplay {
        fn write(&self, data: &str) {
            self.text.lock().push_str(data);
        }
    }

    fn bridge() -> (TerminalBridge, Arc<RecordingTarget>, Arc<RecordingDisplay>) {
        let target = Arc::new(RecordingTarget::default());
        let display = Arc::new(RecordingDisplay::default());
        let bridge = TerminalBridge::new(target.clone());
        bridge.attach_display(display.clone());
        bridge.open();
        (bridge, target, display)
    }

    #[test]
    fn printable_input_buffers_until_enter() {
        let (bridge, target, _display) = bridge();
        bridge.handle_input("m");
        bridge.handle_input("a");
        bridge.handle_input("ke");
        assert!(target.written_strings().is_empty());

        bridge.handle_input("\r\n");
        assert_eq!(
            target.written_strings(),
            vec![format!("make{}", platform::INPUT_LINE_ENDING)]
        );
    }

    #[test]
    fn enter_clears_the_buffer() {
        let (bridge, target, _display) = bridge();
        bridge.handle_input("a");
        bridge.handle_input("\r\n");
        bridge.handle_input("\r\n");
        assert_eq!(
            target.written_strings(),
            vec![
                format!("a{}", platform::INPUT_LINE_ENDING),
                platform::INPUT_LINE_ENDING.to_string(),
            ]
        );
    }

    #[test]
    fn interrupt_character_passes_through_unbuffered() {
        let (bridge, target, _display) = bridge();
        bridge.handle_input("a");
        bridge.handle_input("\x03");
        // The pending line stays put; only the interrupt went through.
        assert_eq!(target.written_strings(), vec!["\x03".to_string()]);
    }

    #[test]
    fn arrow_and_paging_keys_pass_through() {
        let (bridge, target, _display) = bridge();
        for sequence in ["\x1b[A", "\x1b[B", "\x1b[5~", "\x1b[3~"] {
            bridge.handle_input(sequence);
        }
        assert_eq!(
            target.written_strings(),
            vec!["\x1b[A", "\x1b[B", "\x1b[5~", "\x1b[3~"]
        );
    }

    #[test]
    fn backspace_erases_only_when_buffer_nonempty() {
        let (bridge, _target, display) = bridge();
        bridge.handle_input("\x7f");
        assert!(!display.text.lock().contains(ERASE));

        bridge.handle_input("x");
        bridge.handle_input("\x7f");
        assert!(display.text.lock().contains(ERASE));
    }

    #[test]
    fn backspace_edits_the_line_buffer() {
        let (bridge, target, _display) = bridge();
        bridge.handle_input("ab");
        bridge.handle_input("\x7f");
        bridge.handle_input("\r\n");
        assert_eq!(
            target.written_strings(),
            vec![format!("a{}", platform::INPUT_LINE_ENDING)]
        );
    }

    #[test]
    fn typed_characters_echo_to_the_display() {
        let (bridge, _target, display) = bridge();
        bridge.handle_input("hi");
        assert_eq!(display.text.lock().as_str(), "hi");
    }

    #[test]
    fn close_shuts_down_the_target() {
        let (bridge, target, _display) = bridge();
        bridge.close();
        bridge.close();
        assert_eq!(*target.shutdowns.lock(), 2);
    }

    #[test]
    fn output_without_display_is_dropped() {
        let target = Arc::new(RecordingTarget::default());
        let bridge = TerminalBridge::new(target);
        // No display attached; must not panic.
        bridge.write_to_display("orphan output");
    }
}
