//! Build-command kinds and CLI argument assembly.

use std::path::Path;

/// The positional subcommand token passed to the tool, plus the rules that
/// hang off it (which commands take a configuration, which ones run the
/// built target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    BuildRun,
    Run,
    Build,
    Rebuild,
    Clean,
    Bundle,
    Configure,
    Init,
    Export,
    TermTest,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::BuildRun,
        CommandKind::Run,
        CommandKind::Build,
        CommandKind::Rebuild,
        CommandKind::Clean,
        CommandKind::Bundle,
        CommandKind::Configure,
        CommandKind::Init,
        CommandKind::Export,
        CommandKind::TermTest,
    ];

    /// The positional token as the tool expects it.
    pub fn token(&self) -> &'static str {
        match self {
            CommandKind::BuildRun => "buildrun",
            CommandKind::Run => "run",
            CommandKind::Build => "build",
            CommandKind::Rebuild => "rebuild",
            CommandKind::Clean => "clean",
            CommandKind::Bundle => "bundle",
            CommandKind::Configure => "configure",
            CommandKind::Init => "init",
            CommandKind::Export => "export",
            CommandKind::TermTest => "termtest",
        }
    }

    /// Menu label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::BuildRun => "Build & Run",
            CommandKind::Run => "Run",
            CommandKind::Build => "Build",
            CommandKind::Rebuild => "Rebuild",
            CommandKind::Clean => "Clean",
            CommandKind::Bundle => "Bundle",
            CommandKind::Configure => "Configure",
            CommandKind::Init => "Initialize",
            CommandKind::Export => "Export",
            CommandKind::TermTest => "Terminal Test",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.label() == label)
    }

    /// Commands that take `--configuration`.
    pub fn requires_configuration(&self) -> bool {
        matches!(
            self,
            CommandKind::Run
                | CommandKind::BuildRun
                | CommandKind::Build
                | CommandKind::Rebuild
                | CommandKind::Clean
        )
    }

    /// Commands that run the built target (take the run-target positional).
    pub fn implies_run(&self) -> bool {
        matches!(self, CommandKind::Run | CommandKind::BuildRun)
    }
}

/// Everything needed to assemble one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub input_file: Option<String>,
    pub settings_file: Option<String>,
    pub env_file: Option<String>,
    pub root_dir: Option<String>,
    pub configuration: Option<String>,
    pub build_strategy: Option<String>,
    pub build_path_style: Option<String>,
    pub toolchain: Option<String>,
    pub architecture: Option<String>,
    pub run_target: Option<String>,
}

impl CommandOptions {
    /// Assemble the argument list for `command`.
    ///
    /// Flag order is fixed; paths are stripped of the working-directory
    /// prefix; the strategy and path-style flags are omitted entirely when
    /// unset; `--configuration` only appears for commands that take one; the
    /// run-target positional only follows `run`/`buildrun`.
    pub fn assemble(&self, command: CommandKind, cwd: &Path) -> Vec<String> {
        let mut argv = Vec::new();

        let push_path = |argv: &mut Vec<String>, flag: &str, value: &Option<String>| {
            if let Some(value) = value {
                argv.push(flag.to_string());
                argv.push(strip_cwd(value, cwd));
            }
        };

        push_path(&mut argv, "--input-file", &self.input_file);
        push_path(&mut argv, "--settings-file", &self.settings_file);
        push_path(&mut argv, "--env-file", &self.env_file);
        push_path(&mut argv, "--root-dir", &self.root_dir);

        if command.requires_configuration() {
            if let Some(configuration) = &self.configuration {
                argv.push("--configuration".to_string());
                argv.push(configuration.clone());
            }
        }
        if let Some(strategy) = self.build_strategy.as_deref().filter(|s| !s.is_empty()) {
            argv.push("--build-strategy".to_string());
            argv.push(strategy.to_string());
        }
        if let Some(style) = self.build_path_style.as_deref().filter(|s| !s.is_empty()) {
            argv.push("--build-path-style".to_string());
            argv.push(style.to_string());
        }
        if let Some(toolchain) = &self.toolchain {
            argv.push("--toolchain".to_string());
            argv.push(toolchain.clone());
        }
        if let Some(architecture) = &self.architecture {
            argv.push("--arch".to_string());
            argv.push(architecture.clone());
        }

        argv.push(command.token().to_string());

        if command.implies_run() {
            if let Some(target) = &self.run_target {
                argv.push(target.clone());
            }
        }

        argv
    }
}

/// Strip the working-directory prefix from a path-like argument.
fn strip_cwd(value: &str, cwd: &Path) -> String {
    match Path::new(value).strip_prefix(cwd) {
        Ok(stripped) if !stripped.as_os_str().is_empty() => {
            stripped.to_string_lossy().into_owned()
        }
        _ => value.to_string(),
    }
}
