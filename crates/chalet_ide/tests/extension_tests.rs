//! End-to-end extension tests against the in-memory host fakes and a
//! scripted stand-in for the chalet executable.

#![cfg(unix)]

use chalet_ide::Extension;
use host::fake::FakeHost;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A workspace directory with config files and a scripted tool executable
/// that logs every invocation to `calls.log`.
struct Workspace {
    dir: tempfile::TempDir,
    tool: PathBuf,
}

const DEFAULT_TOOL_SCRIPT: &str = r#"
LOG="$(dirname "$0")/calls.log"
echo "$*" >> "$LOG"
case "$1" in
  --version) echo "Chalet version 1.0.0" ;;
  query)
    case "$2" in
      state-chalet-json) echo '{"configurations":["Release","Debug"],"targets":["app"],"runTargets":["app","tests"]}' ;;
      state-settings-json) echo '{"toolchainPresets":["llvm","gcc"],"userToolchains":[],"buildStrategies":["ninja"],"buildPathStyles":["target-triple"],"toolchain":"llvm"}' ;;
      architectures) printf 'auto\tx86_64\n' ;;
    esac ;;
  *)
    echo "/src/main.c:10:7: error: incompatible integer to pointer conversion"
    echo "Run: app" ;;
esac
"#;

impl Workspace {
    fn new(script: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        // Point the global settings dir somewhere harmless, once per process.
        chalet_paths::set_global_dir(std::env::temp_dir().join("chalet-ide-test-global"));

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("chalet");
        std::fs::write(&tool, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, tool }
    }

    fn with_config_files(script: &str) -> Self {
        let workspace = Self::new(script);
        std::fs::write(
            workspace.root().join("chalet.json"),
            r#"{"name":"demo-project"}"#,
        )
        .unwrap();
        std::fs::write(workspace.root().join(".chaletrc"), r#"{"options":{}}"#).unwrap();
        workspace
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn host(&self) -> FakeHost {
        let host = FakeHost::new();
        host.config
            .set_string("executablePath", &self.tool.to_string_lossy());
        host
    }

    fn query_count(&self, needle: &str) -> usize {
        std::fs::read_to_string(self.root().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

async fn activated(workspace: &Workspace, host: &FakeHost) -> Arc<Extension> {
    let extension = Extension::new(host.context(), workspace.root());
    extension.activate().await.unwrap();
    extension
}

#[tokio::test]
async fn activation_queries_state_and_shows_the_ui() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;

    assert!(extension.is_active());
    assert_eq!(workspace.query_count("state-chalet-json"), 1);
    assert_eq!(workspace.query_count("state-settings-json"), 1);

    let build_command = host.status_bar.item("buildCommand").unwrap().state();
    assert!(build_command.visible);
    assert_eq!(build_command.text, "Build & Run");

    let configuration = host.status_bar.item("configuration").unwrap().state();
    assert!(configuration.visible);
    assert_eq!(configuration.text, "Release");

    let toolchain = host.status_bar.item("toolchain").unwrap().state();
    assert_eq!(toolchain.text, "llvm");

    // llvm is a preset with a real architecture choice.
    assert!(host.status_bar.item("architecture").unwrap().state().visible);

    extension.dispose();
}

#[tokio::test]
async fn byte_identical_file_touch_issues_no_new_query() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;
    assert_eq!(workspace.query_count("state-chalet-json"), 1);

    // Touch with identical bytes, then deliver the change event.
    std::fs::write(
        workspace.root().join("chalet.json"),
        r#"{"name":"demo-project"}"#,
    )
    .unwrap();
    extension
        .on_file_changed(&workspace.root().join("chalet.json"))
        .await;

    assert_eq!(workspace.query_count("state-chalet-json"), 1);
    extension.dispose();
}

#[tokio::test]
async fn modified_project_file_requeries() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;

    std::fs::write(
        workspace.root().join("chalet.json"),
        r#"{"name":"demo-project","version":"2"}"#,
    )
    .unwrap();
    extension
        .on_file_changed(&workspace.root().join("chalet.json"))
        .await;

    assert_eq!(workspace.query_count("state-chalet-json"), 2);
    extension.dispose();
}

#[tokio::test]
async fn missing_project_file_skips_query_without_error() {
    let workspace = Workspace::new(DEFAULT_TOOL_SCRIPT);
    std::fs::write(workspace.root().join(".chaletrc"), "{}").unwrap();
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;

    assert_eq!(workspace.query_count("state-chalet-json"), 0);
    assert!(host.messages.errors().is_empty());
    // Without a parsed project file the surface stays hidden.
    assert!(!host.status_bar.item("buildCommand").unwrap().state().visible);
    extension.dispose();
}

#[tokio::test]
async fn query_failure_disables_the_extension_until_next_cycle() {
    let failing_script = r#"
LOG="$(dirname "$0")/calls.log"
echo "$*" >> "$LOG"
case "$1" in
  --version) echo "Chalet version 1.0.0" ;;
  query) echo "Chalet: error: chalet.json was malformed" ;;
esac
"#;
    let workspace = Workspace::with_config_files(failing_script);
    let host = workspace.host();
    let extension = Extension::new(host.context(), workspace.root());
    extension.activate().await.unwrap();

    assert!(!extension.is_active());
    assert!(!host.messages.errors().is_empty());
    for item in host.status_bar.items() {
        assert!(!item.state().visible);
    }

    let result = extension.run_selected_command().await;
    assert!(result.is_err());
    extension.dispose();
}

#[tokio::test]
async fn run_command_streams_output_and_publishes_diagnostics() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;

    let outcome = extension.run_selected_command().await.unwrap();
    assert_eq!(outcome, terminal::ProcessOutcome::Completed(0));
    assert_eq!(workspace.query_count("buildrun"), 1);

    // The terminal view received the raw output, banner included.
    let output = host.terminals.terminal("Chalet").unwrap().output();
    assert!(output.contains("incompatible integer to pointer conversion"));
    assert!(output.contains("Run: app"));

    // The diagnostic line before the banner became one problem record,
    // re-resolved under the workspace root.
    let published = host.diagnostics.published();
    assert_eq!(published.len(), 1);
    let (file, problems) = &published[0];
    assert_eq!(*file, workspace.root().join("src").join("main.c"));
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].severity, host::DiagnosticSeverity::Error);
    assert_eq!(problems[0].range.start_line, 9);
    assert_eq!(problems[0].range.start_column, 6);

    extension.dispose();
}

#[tokio::test]
async fn each_run_replaces_the_published_problem_set() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;

    extension.run_selected_command().await.unwrap();
    let first = host.diagnostics.published();
    assert_eq!(first.len(), 1);

    extension.run_selected_command().await.unwrap();
    let second = host.diagnostics.published();
    // Identical input produces an identical — not accumulated — set.
    assert_eq!(second, first);

    extension.dispose();
}

#[tokio::test]
async fn outdated_tool_version_prompts_for_download() {
    let old_version_script = r#"
case "$1" in
  --version) echo "Chalet version 0.1.0" ;;
esac
"#;
    let workspace = Workspace::with_config_files(old_version_script);
    let host = workspace.host();
    host.messages.push_info_answer(Some("Download"));

    let extension = Extension::new(host.context(), workspace.root());
    extension.activate().await.unwrap();

    assert_eq!(host.messages.infos.lock().len(), 1);
    assert_eq!(
        host.opener.opened.lock().as_slice(),
        &[chalet_tool::DOWNLOAD_URL.to_string()]
    );
    extension.dispose();
}

#[tokio::test]
async fn status_bar_buttons_setting_gates_the_whole_surface() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    host.config.set_bool("statusBarButtons", false);

    let extension = Extension::new(host.context(), workspace.root());
    extension.activate().await.unwrap();

    assert!(extension.is_active());
    for item in host.status_bar.items() {
        assert!(!item.state().visible);
    }
    extension.dispose();
}

#[tokio::test]
async fn dispose_is_idempotent_and_tears_everything_down() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;
    extension.run_selected_command().await.unwrap();

    extension.dispose();
    extension.dispose();

    for item in host.status_bar.items() {
        assert!(item.state().disposed);
    }
    assert!(host.terminals.terminal("Chalet").is_none());
}

#[tokio::test]
async fn toolchain_pick_refreshes_architectures_from_the_cacheable_query() {
    let workspace = Workspace::with_config_files(DEFAULT_TOOL_SCRIPT);
    let host = workspace.host();
    let extension = activated(&workspace, &host).await;
    let architectures_before = workspace.query_count("architectures");

    host.quick_pick.push_answer(Some("gcc"));
    extension.prompt_toolchain().await;
    assert_eq!(workspace.query_count("architectures"), architectures_before + 1);

    // Picking the already-cached toolchain issues no further query.
    host.quick_pick.push_answer(Some("llvm"));
    extension.prompt_toolchain().await;
    assert_eq!(workspace.query_count("architectures"), architectures_before + 1);

    extension.dispose();
}
