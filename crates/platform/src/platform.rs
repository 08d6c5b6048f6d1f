//! Cross-platform child-process signalling.
//!
//! POSIX: signals are delivered to the child's process group so the whole
//! build tree stops, not just the immediate child.
//! Windows: the runtime cannot deliver an interrupt to a child process tree,
//! so both paths shell out to the `taskkill` helper instead.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{interrupt_process, terminate_process};
#[cfg(windows)]
pub use windows::{interrupt_process, terminate_process};

/// Line ending for input flushed to a child's stdin.
#[cfg(windows)]
pub const INPUT_LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const INPUT_LINE_ENDING: &str = "\n";
