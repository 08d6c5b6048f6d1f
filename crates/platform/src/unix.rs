//! POSIX signal delivery.

/// Request a graceful stop: SIGINT to the child's process group.
///
/// Delivery failures are logged and swallowed — the target having already
/// exited is an expected race, not an error.
pub fn interrupt_process(pid: u32) {
    send_signal(pid, libc::SIGINT);
}

/// Forceful stop: SIGTERM to the child's process group.
pub fn terminate_process(pid: u32) {
    send_signal(pid, libc::SIGTERM);
}

fn send_signal(pid: u32, signal: i32) {
    // Negative pid addresses the whole process group.
    let result = unsafe { libc::kill(-(pid as i32), signal) };
    if result != 0 {
        let errno = std::io::Error::last_os_error();
        tracing::debug!("signal {} to process group {} failed: {}", signal, pid, errno);
    }
}
