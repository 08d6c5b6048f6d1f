//! The extension orchestrator.

use crate::error::ExtensionError;
use chalet_tool::{CommandKind, ToolRunner, ToolState, DOWNLOAD_URL, MINIMUM_VERSION};
use diagnostics::{to_published, ProblemParser};
use host::HostContext;
use menus::MenuSet;
use parking_lot::Mutex;
use settings::{ExtensionConfig, FileRead, WatchedFile};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use terminal::{ProcessEvents, ProcessOutcome, SessionOptions, TerminalController};

/// Label of the terminal view all executions share.
pub const TERMINAL_LABEL: &str = "Chalet";

/// The extension: activation, file watching, tool-state refresh, menu sync,
/// and command dispatch.
pub struct Extension {
    host: HostContext,
    workspace_root: PathBuf,
    config: Mutex<ExtensionConfig>,
    menus: MenuSet,
    controller: Arc<TerminalController>,

    project_file: WatchedFile,
    local_settings: WatchedFile,
    global_settings: WatchedFile,

    tool_state: Mutex<ToolState>,
    /// Serializes the two file-change handlers: their callbacks may arrive
    /// interleaved, and both walk the same tool state.
    refresh_lock: tokio::sync::Mutex<()>,

    /// Cleared when a query fails hard; nothing runs until the next
    /// successful refresh cycle.
    active: AtomicBool,
    project_parsed: AtomicBool,
    settings_parsed: AtomicBool,
    disposed: AtomicBool,

    watcher: Mutex<Option<settings::ConfigWatcher>>,
}

impl Extension {
    pub fn new(host: HostContext, workspace_root: impl Into<PathBuf>) -> Arc<Self> {
        let workspace_root = workspace_root.into();
        let config = ExtensionConfig::load(host.config.as_ref());
        let menus = MenuSet::new(host.status_bar.as_ref(), host.storage.clone());
        let controller = TerminalController::new(host.terminals.clone(), TERMINAL_LABEL);

        Arc::new(Self {
            project_file: WatchedFile::new(chalet_paths::project_file(&workspace_root)),
            local_settings: WatchedFile::new(chalet_paths::local_settings_file(&workspace_root)),
            global_settings: WatchedFile::new(chalet_paths::global_settings_file()),
            host,
            workspace_root,
            config: Mutex::new(config),
            menus,
            controller,
            tool_state: Mutex::new(ToolState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            active: AtomicBool::new(false),
            project_parsed: AtomicBool::new(false),
            settings_parsed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            watcher: Mutex::new(None),
        })
    }

    /// Bring the extension up: version check, initial refresh of both
    /// watched files, then file watching.
    pub async fn activate(self: &Arc<Self>) -> Result<(), ExtensionError> {
        self.check_tool_version().await;

        self.refresh_project().await.unwrap_or_else(|error| {
            self.handle_refresh_failure(error);
        });
        self.refresh_settings().await.unwrap_or_else(|error| {
            self.handle_refresh_failure(error);
        });
        self.update_visibility();

        self.start_watching()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn menus(&self) -> &MenuSet {
        &self.menus
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Tear down watcher, terminal (process, view, pty — in that order), and
    /// status items. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.watcher.lock().take();
        self.controller.dispose();
        self.menus.dispose();
        self.host.diagnostics.clear();
        tracing::debug!("extension disposed");
    }

    // ---- file watching ------------------------------------------------

    fn start_watching(self: &Arc<Self>) -> Result<(), ExtensionError> {
        let watched = vec![
            self.project_file.path().to_path_buf(),
            self.local_settings.path().to_path_buf(),
            self.global_settings.path().to_path_buf(),
        ];
        let (watcher, mut rx) = settings::watch(watched).map_err(ExtensionError::from)?;
        *self.watcher.lock() = Some(watcher);

        let extension = self.clone();
        tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                if extension.disposed.load(Ordering::SeqCst) {
                    break;
                }
                extension.on_file_changed(&path).await;
            }
            tracing::debug!("file watch loop ended");
        });
        Ok(())
    }

    /// Route one file-change event. Public so hosts with their own watch
    /// mechanism can feed changes in directly.
    pub async fn on_file_changed(&self, path: &Path) {
        let result = if path == self.project_file.path() {
            self.refresh_project().await
        } else {
            self.refresh_settings().await
        };
        if let Err(error) = result {
            self.handle_refresh_failure(error);
        }
        self.update_visibility();
    }

    // ---- refresh cycles ------------------------------------------------

    /// Re-query configurations/targets/run-targets after a project-config
    /// change. Skipped entirely when the file content is byte-identical to
    /// the last processed read, and when the file is missing.
    async fn refresh_project(&self) -> Result<(), ExtensionError> {
        let _guard = self.refresh_lock.lock().await;

        match self.project_file.read() {
            FileRead::Unchanged => return Ok(()),
            FileRead::Missing => {
                self.project_parsed.store(false, Ordering::SeqCst);
                return Ok(());
            }
            FileRead::Changed(_) => {}
        }

        let chalet = self.runner().state_chalet().await?;
        {
            let mut state = self.tool_state.lock();
            state.chalet = chalet;
        }
        self.project_parsed.store(true, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        let snapshot = self.tool_state.lock().clone();
        self.menus.sync(&snapshot);
        tracing::debug!("project state refreshed");
        Ok(())
    }

    /// Re-query toolchains/strategies/selections after a settings change,
    /// with the same content debouncing. The local settings file wins; the
    /// global per-user file is the fallback.
    async fn refresh_settings(&self) -> Result<(), ExtensionError> {
        let _guard = self.refresh_lock.lock().await;

        match self.local_settings.read() {
            FileRead::Unchanged => return Ok(()),
            FileRead::Changed(_) => {}
            FileRead::Missing => match self.global_settings.read() {
                FileRead::Unchanged => return Ok(()),
                FileRead::Changed(_) => {}
                FileRead::Missing => {
                    self.settings_parsed.store(false, Ordering::SeqCst);
                    return Ok(());
                }
            },
        }

        let runner = self.runner();
        let settings = runner.state_settings().await?;
        let toolchain = settings.toolchain.clone().unwrap_or_default();
        let architectures = runner.architectures(&toolchain).await?;
        {
            let mut state = self.tool_state.lock();
            state.settings = settings;
            state.architectures.insert(toolchain, architectures);
        }
        self.settings_parsed.store(true, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        let snapshot = self.tool_state.lock().clone();
        self.menus.sync(&snapshot);
        tracing::debug!("settings state refreshed");
        Ok(())
    }

    fn handle_refresh_failure(&self, error: ExtensionError) {
        self.active.store(false, Ordering::SeqCst);
        self.report_error(&error);
    }

    /// The whole UI surface shows only when both files have completed at
    /// least one successful parse, no query has failed since, and the
    /// status-bar buttons are enabled.
    pub fn update_visibility(&self) {
        let enabled = self.active.load(Ordering::SeqCst)
            && self.project_parsed.load(Ordering::SeqCst)
            && self.settings_parsed.load(Ordering::SeqCst)
            && self.config.lock().status_bar_buttons;
        self.menus.update_visibility(enabled);
    }

    // ---- user interactions ---------------------------------------------

    pub async fn prompt_build_command(&self) {
        let _ = self
            .menus
            .build_command
            .prompt(self.host.quick_pick.as_ref())
            .await;
        self.update_visibility();
    }

    pub async fn prompt_configuration(&self) {
        let _ = self
            .menus
            .configuration
            .prompt(self.host.quick_pick.as_ref())
            .await;
    }

    /// Toolchain picks re-query the architectures the new toolchain can
    /// target (cached per toolchain name) before visibility is re-derived.
    pub async fn prompt_toolchain(&self) {
        let picked = self
            .menus
            .toolchain
            .prompt(self.host.quick_pick.as_ref())
            .await;
        if let Some(picked) = picked {
            if let Err(error) = self.refresh_architectures(&picked.label).await {
                self.report_error(&error);
            }
        }
        self.update_visibility();
    }

    pub async fn prompt_architecture(&self) {
        let _ = self
            .menus
            .architecture
            .prompt(self.host.quick_pick.as_ref())
            .await;
    }

    pub async fn prompt_run_target(&self) {
        let _ = self
            .menus
            .run_target
            .prompt(self.host.quick_pick.as_ref())
            .await;
    }

    pub async fn prompt_build_strategy(&self) {
        let _ = self
            .menus
            .build_strategy
            .prompt(self.host.quick_pick.as_ref())
            .await;
    }

    pub async fn prompt_build_path_style(&self) {
        let _ = self
            .menus
            .build_path_style
            .prompt(self.host.quick_pick.as_ref())
            .await;
    }

    async fn refresh_architectures(&self, toolchain: &str) -> Result<(), ExtensionError> {
        let cached = self.tool_state.lock().architectures.get(toolchain).cloned();
        let architectures = match cached {
            Some(architectures) => architectures,
            None => {
                let fetched = self.runner().architectures(toolchain).await?;
                self.tool_state
                    .lock()
                    .architectures
                    .insert(toolchain.to_string(), fetched.clone());
                fetched
            }
        };
        self.menus.architecture.set_menu(
            architectures
                .iter()
                .map(host::MenuItem::new)
                .collect(),
        );
        Ok(())
    }

    // ---- command dispatch ----------------------------------------------

    /// Assemble arguments from the current menu state and run the selected
    /// command in the shared terminal. Trailing tool output is parsed into
    /// problems that fully replace the previous run's set.
    pub async fn run_selected_command(&self) -> Result<ProcessOutcome, ExtensionError> {
        self.run_command(self.menus.command()).await
    }

    pub async fn run_command(&self, command: CommandKind) -> Result<ProcessOutcome, ExtensionError> {
        if !self.is_active() {
            return Err(ExtensionError::new(
                "chalet-ide is inactive until its configuration files parse",
            ));
        }

        let config = self.config.lock().clone();
        let mut options = self.menus.command_options();
        options.input_file = existing_path(self.project_file.path());
        options.settings_file = existing_path(self.local_settings.path())
            .or_else(|| existing_path(self.global_settings.path()));
        options.env_file = existing_path(&self.workspace_root.join(&config.env_file));
        options.root_dir = Some(self.workspace_root.to_string_lossy().into_owned());

        let args = options.assemble(command, &self.workspace_root);
        tracing::info!("running: {} {}", config.executable().display(), args.join(" "));

        self.host.diagnostics.clear();
        let events = Arc::new(RunEvents {
            host: self.host.clone(),
            controller: self.controller.clone(),
            parser: ProblemParser::default(),
            cwd: self.workspace_root.clone(),
        });

        let outcome = self
            .controller
            .execute(
                SessionOptions {
                    executable: config.executable(),
                    args,
                    cwd: self.workspace_root.clone(),
                    env: Vec::new(),
                    clear_before: true,
                },
                events,
            )
            .await?;

        if outcome == ProcessOutcome::NotFound {
            let error = ExtensionError::new(format!(
                "{} was not found in PATH",
                config.executable().display()
            ));
            self.report_error(&error);
        }
        Ok(outcome)
    }

    pub fn interrupt_running_command(&self) {
        self.controller.interrupt();
    }

    // ---- plumbing ------------------------------------------------------

    fn runner(&self) -> ToolRunner {
        let config = self.config.lock();
        ToolRunner::new(config.executable(), &self.workspace_root)
    }

    /// Non-blocking version gate: too-old tools get an informational prompt
    /// with a download choice, never a hard failure.
    async fn check_tool_version(&self) {
        let version = match self.runner().version().await {
            Ok(version) => version,
            Err(error) => {
                tracing::warn!("could not determine tool version: {:#}", error);
                return;
            }
        };
        if version.satisfies_minimum() {
            tracing::debug!("tool version {} ok", version);
            return;
        }
        let message = format!(
            "Chalet {} is older than the minimum supported version {}.",
            version, MINIMUM_VERSION
        );
        let choice = self
            .host
            .messages
            .show_info(&message, &["Download"])
            .await;
        if choice.as_deref() == Some("Download") {
            self.host.opener.open_url(DOWNLOAD_URL);
        }
    }

    /// Single error sink: the log (once, via the error's own flag) and the
    /// host error channel.
    fn report_error(&self, error: &ExtensionError) {
        error.log();
        self.host.messages.show_error(error.message());
    }
}

fn existing_path(path: &Path) -> Option<String> {
    path.exists()
        .then(|| path.to_string_lossy().into_owned())
}

/// Per-run observer: streams captured output into the diagnostics parser and
/// surfaces spawn failures on both the terminal and the error channel.
struct RunEvents {
    host: HostContext,
    controller: Arc<TerminalController>,
    parser: ProblemParser,
    cwd: PathBuf,
}

impl ProcessEvents for RunEvents {
    fn on_capture(&self, buffer: &str) {
        let problems = self.parser.parse(buffer, &self.cwd);
        if problems.is_empty() {
            return;
        }
        let total: usize = problems.values().map(Vec::len).sum();
        tracing::debug!("publishing {} problem(s) across {} file(s)", total, problems.len());
        self.host.diagnostics.publish(to_published(&problems));
    }

    fn on_failure(&self, message: &str) {
        self.controller
            .write_to_display(&format!("\x1b[31m{}\x1b[0m\r\n", message));
        self.host.messages.show_error(message);
    }
}
