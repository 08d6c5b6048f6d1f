//! Child-process lifecycle management.

use anyhow::{anyhow, Context, Result};
use diagnostics::{RULE_SENTINEL, RUN_BANNER_SENTINEL};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Normal exit with the given code.
    Completed(i32),
    /// Stopped by an interrupt or kill we delivered.
    Interrupted,
    /// The executable was not found in PATH.
    NotFound,
}

/// Observer for one execution. All methods default to no-ops; implementors
/// override what they need. Called from the reader/waiter threads.
pub trait ProcessEvents: Send + Sync {
    /// Verbatim output chunk, as it arrived.
    fn on_output(&self, _chunk: &str) {}
    /// The capture buffer, delivered exactly once per run: when a sentinel
    /// appears in the stream, or at process close if none ever did.
    fn on_capture(&self, _buffer: &str) {}
    fn on_exit(&self, _outcome: &ProcessOutcome) {}
    /// Spawn-level failure, after the execution has already been rejected.
    fn on_failure(&self, _message: &str) {}
}

/// What to run.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub label: String,
}

struct RunningChild {
    generation: u64,
    pid: Option<u32>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    writer: Box<dyn Write + Send>,
    interrupted: Arc<AtomicBool>,
    killed: Arc<AtomicBool>,
}

/// The single child-process slot. Starting a new execution always halts the
/// previous child first, so at most one child is live per instance.
pub struct ChaletProcess {
    slot: Mutex<Option<RunningChild>>,
    generation: AtomicU64,
}

impl Default for ChaletProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl ChaletProcess {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Spawn the child and resolve with its classified outcome.
    ///
    /// Any previously running child under this instance is halted first,
    /// best-effort — the halt signal is fired without waiting for the old
    /// child to die.
    pub async fn execute(
        &self,
        options: ExecuteOptions,
        events: Arc<dyn ProcessEvents>,
    ) -> Result<ProcessOutcome> {
        self.halt();

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("failed to open PTY")?;

        let mut command = CommandBuilder::new(&options.executable);
        command.args(&options.args);
        command.cwd(&options.cwd);
        command.env("TERM", "xterm-256color");
        for (key, value) in &options.env {
            command.env(key, value);
        }

        let mut child = match pair.slave.spawn_command(command) {
            Ok(child) => child,
            Err(error) => {
                let message = if is_not_found(&error) {
                    format!("{} was not found in PATH", options.executable.display())
                } else {
                    format!("failed to spawn {}: {}", options.executable.display(), error)
                };
                events.on_failure(&message);
                return Err(anyhow!(message));
            }
        };
        drop(pair.slave);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let pid = child.process_id();
        let killer = child.clone_killer();
        let writer = pair
            .master
            .take_writer()
            .context("failed to get PTY writer")?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .context("failed to get PTY reader")?;

        let interrupted = Arc::new(AtomicBool::new(false));
        let killed = Arc::new(AtomicBool::new(false));

        *self.slot.lock() = Some(RunningChild {
            generation,
            pid,
            killer,
            writer,
            interrupted: interrupted.clone(),
            killed: killed.clone(),
        });

        tracing::debug!(
            "spawned {} (pid {:?}) for '{}'",
            options.executable.display(),
            pid,
            options.label
        );

        let reader_events = events.clone();
        thread::Builder::new()
            .name("chalet-pty-reader".into())
            .spawn(move || read_loop(&mut reader, reader_events.as_ref()))
            .context("failed to spawn PTY reader thread")?;

        // The waiter owns the child and the master half: the master must stay
        // alive until the child exits or the PTY tears down under it.
        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        let master = pair.master;
        let waiter_events = events.clone();
        thread::Builder::new()
            .name("chalet-pty-wait".into())
            .spawn(move || {
                let status = child.wait();
                drop(master);
                let outcome = match status {
                    Ok(status) => classify_exit(
                        status.exit_code() as i32,
                        interrupted.load(Ordering::SeqCst),
                        killed.load(Ordering::SeqCst),
                    ),
                    Err(error) => {
                        tracing::warn!("wait for child failed: {}", error);
                        ProcessOutcome::Interrupted
                    }
                };
                waiter_events.on_exit(&outcome);
                let _ = exit_tx.send(outcome);
            })
            .context("failed to spawn PTY wait thread")?;

        let outcome = exit_rx
            .await
            .context("child exit channel dropped")?;

        // Clear the slot unless a newer execution already replaced it.
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|child| child.generation) == Some(generation) {
            *slot = None;
        }
        Ok(outcome)
    }

    /// Route raw bytes to the child's input stream.
    pub fn write_input(&self, data: &[u8]) -> Result<()> {
        let mut slot = self.slot.lock();
        let child = slot.as_mut().context("no child process is running")?;
        child.writer.write_all(data)?;
        child.writer.flush()?;
        Ok(())
    }

    /// Request a graceful stop of the current child, if any.
    ///
    /// Signal delivery failures are logged inside the platform layer and
    /// swallowed — the child having already exited is an expected race.
    pub fn interrupt(&self) {
        let mut slot = self.slot.lock();
        if let Some(child) = slot.as_mut() {
            child.interrupted.store(true, Ordering::SeqCst);
            match child.pid {
                Some(pid) => platform::interrupt_process(pid),
                None => {
                    if let Err(error) = child.killer.kill() {
                        tracing::debug!("kill fallback failed: {}", error);
                    }
                }
            }
        }
    }

    /// Forceful stop of the current child, if any.
    pub fn terminate(&self) {
        let mut slot = self.slot.lock();
        if let Some(child) = slot.as_mut() {
            child.killed.store(true, Ordering::SeqCst);
            match child.pid {
                Some(pid) => platform::terminate_process(pid),
                None => {}
            }
            // Belt and braces for the no-pid case and for stuck trees.
            if let Err(error) = child.killer.kill() {
                tracing::debug!("kill after terminate failed: {}", error);
            }
        }
    }

    fn halt(&self) {
        if self.is_running() {
            tracing::debug!("halting previous child before new execution");
            self.terminate();
        }
    }
}

/// Stream PTY output: forward every chunk verbatim, and accumulate into the
/// capture buffer until a sentinel shows up. The capture is delivered exactly
/// once — on sentinel, or at EOF if no sentinel ever appeared.
fn read_loop(reader: &mut dyn Read, events: &dyn ProcessEvents) {
    let mut buf = [0u8; 4096];
    let mut capture = String::new();
    let mut capturing = true;

    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                events.on_output(&text);
                if capturing {
                    capture.push_str(&text);
                    if let Some(end) = find_sentinel(&capture) {
                        capture.truncate(end);
                        capturing = false;
                        events.on_capture(&capture);
                    }
                }
            }
        }
    }
    if capturing && !capture.is_empty() {
        events.on_capture(&capture);
    }
}

/// Earliest occurrence of either end-of-capture sentinel.
fn find_sentinel(buffer: &str) -> Option<usize> {
    let banner = buffer.find(RUN_BANNER_SENTINEL);
    let rule = buffer.find(RULE_SENTINEL);
    match (banner, rule) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (position, None) | (None, position) => position,
    }
}

fn classify_exit(code: i32, interrupted: bool, killed: bool) -> ProcessOutcome {
    if code == -2 {
        return ProcessOutcome::NotFound;
    }
    if code != 0 && (interrupted || killed) {
        return ProcessOutcome::Interrupted;
    }
    ProcessOutcome::Completed(code)
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound)
        || error.to_string().contains("No such file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingEvents {
        output: Mutex<String>,
        captures: Mutex<Vec<String>>,
        exits: Mutex<Vec<ProcessOutcome>>,
        failures: Mutex<Vec<String>>,
    }

    impl ProcessEvents for RecordingEvents {
        fn on_output(&self, chunk: &str) {
            self.output.lock().push_str(chunk);
        }
        fn on_capture(&self, buffer: &str) {
            self.captures.lock().push(buffer.to_string());
        }
        fn on_exit(&self, outcome: &ProcessOutcome) {
            self.exits.lock().push(*outcome);
        }
        fn on_failure(&self, message: &str) {
            self.failures.lock().push(message.to_string());
        }
    }

    fn options(program: &str, args: &[&str]) -> ExecuteOptions {
        ExecuteOptions {
            executable: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: Vec::new(),
            label: "test".into(),
        }
    }

    #[test]
    fn classify_minus_two_is_not_found() {
        assert_eq!(classify_exit(-2, false, false), ProcessOutcome::NotFound);
    }

    #[test]
    fn classify_signalled_exit_is_interrupted_not_error() {
        assert_eq!(classify_exit(130, true, false), ProcessOutcome::Interrupted);
        assert_eq!(classify_exit(143, false, true), ProcessOutcome::Interrupted);
    }

    #[test]
    fn classify_clean_exit_wins_over_flags() {
        assert_eq!(classify_exit(0, true, false), ProcessOutcome::Completed(0));
    }

    #[test]
    fn sentinel_lookup_takes_earliest() {
        let buffer = format!("errors here\n{}\nRun: app\n", RULE_SENTINEL);
        assert_eq!(find_sentinel(&buffer), Some(12));
        assert_eq!(find_sentinel("no sentinel"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn execute_streams_output_and_completes() {
        let process = ChaletProcess::new();
        let events = Arc::new(RecordingEvents::default());
        let outcome = process
            .execute(options("sh", &["-c", "echo hello"]), events.clone())
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Completed(0));
        assert!(events.output.lock().contains("hello"));
        assert_eq!(events.exits.lock().as_slice(), &[outcome]);
        assert!(!process.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_stops_at_run_banner() {
        let process = ChaletProcess::new();
        let events = Arc::new(RecordingEvents::default());
        process
            .execute(
                options("sh", &["-c", "echo before; echo 'Run: app'; echo after"]),
                events.clone(),
            )
            .await
            .unwrap();

        let captures = events.captures.lock();
        assert_eq!(captures.len(), 1, "capture must be delivered exactly once");
        assert!(captures[0].contains("before"));
        assert!(!captures[0].contains("after"));
        // The display still received everything.
        assert!(events.output.lock().contains("after"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_delivered_at_close_when_no_sentinel() {
        let process = ChaletProcess::new();
        let events = Arc::new(RecordingEvents::default());
        process
            .execute(options("sh", &["-c", "echo only output"]), events.clone())
            .await
            .unwrap();

        let captures = events.captures.lock();
        assert_eq!(captures.len(), 1);
        assert!(captures[0].contains("only output"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_execute_halts_first_leaving_one_child() {
        let process = Arc::new(ChaletProcess::new());
        let first_events = Arc::new(RecordingEvents::default());
        let second_events = Arc::new(RecordingEvents::default());

        let first = tokio::spawn({
            let process = process.clone();
            let events = first_events.clone();
            async move { process.execute(options("sleep", &["30"]), events).await }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(process.is_running());

        let outcome = process
            .execute(options("sh", &["-c", "echo second"]), second_events.clone())
            .await
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::Completed(0));

        let first_outcome = first.await.unwrap().unwrap();
        assert_eq!(first_outcome, ProcessOutcome::Interrupted);
        assert!(!process.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_classifies_as_interrupted() {
        let process = Arc::new(ChaletProcess::new());
        let events = Arc::new(RecordingEvents::default());

        let running = tokio::spawn({
            let process = process.clone();
            let events = events.clone();
            async move { process.execute(options("sleep", &["30"]), events).await }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        process.interrupt();

        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, ProcessOutcome::Interrupted);
    }

    #[tokio::test]
    async fn spawn_failure_rejects_and_reports() {
        let process = ChaletProcess::new();
        let events = Arc::new(RecordingEvents::default());
        let result = process
            .execute(options("/nonexistent/chalet-tool", &[]), events.clone())
            .await;

        assert!(result.is_err());
        let failures = events.failures.lock();
        assert_eq!(failures.len(), 1);
        assert!(!process.is_running());
    }

    #[test]
    fn interrupt_with_no_child_is_a_no_op() {
        let process = ChaletProcess::new();
        process.interrupt();
        process.terminate();
        assert!(!process.is_running());
    }
}
