//! The seven status-bar settings and their visibility rules.

use crate::command_menu::CommandMenu;
use chalet_tool::{CommandKind, CommandOptions, ToolState};
use host::{KeyValueStore, MenuItem, StatusBar};
use parking_lot::Mutex;
use std::sync::Arc;

fn to_items(labels: &[String]) -> Vec<MenuItem> {
    labels.iter().map(MenuItem::new).collect()
}

/// All command menus, wired to one status bar and one storage, with the
/// setting-specific visibility rules.
pub struct MenuSet {
    pub build_command: CommandMenu,
    pub configuration: CommandMenu,
    pub toolchain: CommandMenu,
    pub architecture: CommandMenu,
    pub run_target: CommandMenu,
    pub build_strategy: CommandMenu,
    pub build_path_style: CommandMenu,
    /// Presets from the last settings query; drives architecture visibility.
    toolchain_presets: Mutex<Vec<String>>,
    /// Last explicit run target, restored when the selector comes back.
    last_run_target: Mutex<Option<String>>,
}

impl MenuSet {
    pub fn new(status_bar: &dyn StatusBar, storage: Arc<dyn KeyValueStore>) -> Self {
        let build_command = CommandMenu::new(
            "buildCommand",
            "Chalet Command",
            10,
            status_bar,
            storage.clone(),
        );
        build_command.set_menu(
            CommandKind::ALL
                .iter()
                .map(|kind| MenuItem::with_description(kind.label(), kind.token()))
                .collect(),
        );

        Self {
            build_command,
            configuration: CommandMenu::new(
                "configuration",
                "Build Configuration",
                9,
                status_bar,
                storage.clone(),
            ),
            toolchain: CommandMenu::new("toolchain", "Toolchain", 8, status_bar, storage.clone()),
            architecture: CommandMenu::new(
                "architecture",
                "Architecture",
                7,
                status_bar,
                storage.clone(),
            ),
            run_target: CommandMenu::new("runTarget", "Run Target", 6, status_bar, storage.clone()),
            build_strategy: CommandMenu::new(
                "buildStrategy",
                "Build Strategy",
                5,
                status_bar,
                storage.clone(),
            ),
            build_path_style: CommandMenu::new(
                "buildPathStyle",
                "Build Path Style",
                4,
                status_bar,
                storage,
            ),
            toolchain_presets: Mutex::new(Vec::new()),
            last_run_target: Mutex::new(None),
        }
    }

    /// The currently selected build command.
    pub fn command(&self) -> CommandKind {
        self.build_command
            .selected_label()
            .and_then(|label| CommandKind::from_label(&label))
            .unwrap_or(CommandKind::BuildRun)
    }

    /// Re-synchronize all menus from a fresh tool-state snapshot.
    ///
    /// The tool's own current selections are applied verbatim when present;
    /// the strategy and path-style selectors are cleared back to the unset
    /// sentinel when the tool reports none.
    pub fn sync(&self, state: &ToolState) {
        self.configuration
            .set_menu(to_items(&state.chalet.configurations));
        if let Some(configuration) = &state.settings.configuration {
            self.configuration
                .set_value_from_string(Some(configuration.as_str()));
        }

        *self.toolchain_presets.lock() = state.settings.toolchain_presets.clone();
        self.toolchain.set_menu(to_items(&state.merged_toolchains()));
        if let Some(toolchain) = &state.settings.toolchain {
            self.toolchain.set_value_from_string(Some(toolchain.as_str()));
        }

        let toolchain = self.toolchain.selected_label().unwrap_or_default();
        let architectures = state
            .architectures
            .get(&toolchain)
            .cloned()
            .unwrap_or_else(|| vec!["auto".to_string()]);
        self.architecture.set_menu(to_items(&architectures));
        if let Some(architecture) = &state.settings.architecture {
            self.architecture
                .set_value_from_string(Some(architecture.as_str()));
        }

        self.run_target.set_menu(to_items(&state.chalet.run_targets));
        if let Some(target) = &state.settings.last_run_target {
            self.run_target.set_value_from_string(Some(target.as_str()));
        }

        self.build_strategy
            .set_menu(to_items(&state.settings.build_strategies));
        self.build_strategy
            .set_value_from_string(state.settings.build_strategy.as_deref());

        self.build_path_style
            .set_menu(to_items(&state.settings.build_path_styles));
        self.build_path_style
            .set_value_from_string(state.settings.build_path_style.as_deref());
    }

    /// Apply the per-setting visibility rules.
    ///
    /// With the UI surface disabled, everything hides. Otherwise: the
    /// configuration selector shows only for commands that take one; the
    /// architecture selector shows only for preset or LLVM-prefixed
    /// toolchains with a real choice to make; the run-target selector shows
    /// only for run-implying commands, restoring its cached value when it
    /// comes back.
    pub fn update_visibility(&self, ui_enabled: bool) {
        if !ui_enabled {
            self.hide_all();
            return;
        }

        // Remember any explicit run target before the selector may hide.
        if let Some(label) = self.run_target.selected_label() {
            *self.last_run_target.lock() = Some(label);
        }

        self.build_command.set_visible(true);
        self.toolchain.set_visible(true);
        self.build_strategy.set_visible(true);
        self.build_path_style.set_visible(true);

        let command = self.command();
        self.configuration
            .set_visible(command.requires_configuration());

        let toolchain = self.toolchain.selected_label().unwrap_or_default();
        let recognized = {
            let presets = self.toolchain_presets.lock();
            presets.iter().any(|preset| *preset == toolchain) || toolchain.starts_with("llvm")
        };
        let menu = self.architecture.menu();
        let has_real_choice =
            menu.len() > 1 || menu.first().is_some_and(|item| item.label != "auto");
        self.architecture.set_visible(recognized && has_real_choice);

        if command.implies_run() {
            if self.run_target.selection().is_none() {
                let last = self.last_run_target.lock().clone();
                if let Some(last) = last {
                    self.run_target.set_value_from_string(Some(last.as_str()));
                }
            }
            self.run_target.set_visible(true);
        } else {
            self.run_target.set_visible(false);
        }
    }

    pub fn hide_all(&self) {
        for menu in self.all() {
            menu.set_visible(false);
        }
    }

    pub fn dispose(&self) {
        for menu in self.all() {
            menu.dispose();
        }
    }

    /// Current selections, as the argument-assembly shape (paths are filled
    /// in by the orchestrator).
    pub fn command_options(&self) -> CommandOptions {
        CommandOptions {
            configuration: self.configuration.selected_label(),
            build_strategy: self.build_strategy.selected_label(),
            build_path_style: self.build_path_style.selected_label(),
            toolchain: self.toolchain.selected_label(),
            architecture: self.architecture.selected_label(),
            run_target: self.run_target.selected_label(),
            ..Default::default()
        }
    }

    fn all(&self) -> [&CommandMenu; 7] {
        [
            &self.build_command,
            &self.configuration,
            &self.toolchain,
            &self.architecture,
            &self.run_target,
            &self.build_strategy,
            &self.build_path_style,
        ]
    }
}
