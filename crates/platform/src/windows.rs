//! Windows process-tree termination via `taskkill`.

use std::process::Command;

/// Request a graceful stop of the child's process tree.
///
/// `taskkill` is invoked twice in sequence: the first invocation is
/// frequently ineffective against a freshly-signalled tree and its failure
/// is expected, so only the second result is worth logging. The root cause
/// of the first invocation's unreliability is unknown; the double call is
/// kept for compatibility with observed behavior.
pub fn interrupt_process(pid: u32) {
    let first = run_taskkill(pid, false);
    if let Err(error) = first {
        tracing::debug!("first taskkill for {} failed (expected): {}", pid, error);
    }
    if let Err(error) = run_taskkill(pid, false) {
        tracing::debug!("second taskkill for {} failed: {}", pid, error);
    }
}

/// Forceful stop: `taskkill /F /T` kills the full process tree.
pub fn terminate_process(pid: u32) {
    if let Err(error) = run_taskkill(pid, true) {
        tracing::debug!("taskkill /F for {} failed: {}", pid, error);
    }
}

fn run_taskkill(pid: u32, force: bool) -> std::io::Result<()> {
    let mut command = Command::new("taskkill");
    command.args(["/PID", &pid.to_string(), "/T"]);
    if force {
        command.arg("/F");
    }
    let status = command.status()?;
    if !status.success() {
        return Err(std::io::Error::other(format!(
            "taskkill exited with {:?}",
            status.code()
        )));
    }
    Ok(())
}
