//! Terminal execution core.
//!
//! Three layers, composed bottom-up:
//! - [`ChaletProcess`] owns the child-process lifecycle: PTY spawn, output
//!   streaming, sentinel-bounded capture, cross-platform interrupt and
//!   termination, exit classification.
//! - [`TerminalBridge`] implements the host terminal's input contract over
//!   the process: control-sequence passthrough, local line buffering with
//!   backspace echo, CR+LF flush.
//! - [`TerminalController`] finds-or-creates the terminal view and
//!   serializes executions so at most one child is ever live per controller.
//!
//! This crate contains no host-UI dependencies beyond the `host` traits —
//! it's the pure logic layer.

mod bridge;
mod process;
mod session;

pub use bridge::{InputTarget, TerminalBridge};
pub use process::{ChaletProcess, ExecuteOptions, ProcessEvents, ProcessOutcome};
pub use session::{SessionOptions, TerminalController, STARTUP_DELAY};
