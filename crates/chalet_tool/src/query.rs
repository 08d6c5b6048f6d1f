//! One-shot tool invocations with output capture.
//!
//! Queries run the executable to completion and capture stdout; they never
//! go through a terminal. Empty output is retried a bounded number of times
//! (the tool occasionally produces nothing while its own caches settle);
//! output opening with the tool's banner is an error report, not state.

use crate::state::{ChaletState, SettingsState};
use crate::version::ToolVersion;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use util::truncate_for_log;

/// Consecutive empty-output retries before a query is surfaced as failed.
pub const EMPTY_OUTPUT_RETRIES: u32 = 5;

/// Query output opening with this banner is the tool reporting an error.
const TOOL_BANNER: &str = "Chalet";

/// One of the tool's query subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    StateChaletJson,
    StateSettingsJson,
    Architectures(String),
    SchemaChaletJson,
    SchemaSettingsJson,
}

impl QueryKind {
    fn argv(&self) -> Vec<String> {
        match self {
            QueryKind::StateChaletJson => vec!["query".into(), "state-chalet-json".into()],
            QueryKind::StateSettingsJson => vec!["query".into(), "state-settings-json".into()],
            QueryKind::Architectures(toolchain) => {
                vec!["query".into(), "architectures".into(), toolchain.clone()]
            }
            QueryKind::SchemaChaletJson => vec!["query".into(), "schema-chalet-json".into()],
            QueryKind::SchemaSettingsJson => vec!["query".into(), "schema-settings-json".into()],
        }
    }
}

/// Runs the tool executable in one-shot capture mode.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    executable: PathBuf,
    cwd: PathBuf,
}

impl ToolRunner {
    pub fn new(executable: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            cwd: cwd.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run a query, retrying empty output up to [`EMPTY_OUTPUT_RETRIES`]
    /// times before surfacing a hard failure.
    pub async fn query(&self, kind: &QueryKind) -> Result<String> {
        let argv = kind.argv();
        for attempt in 0..=EMPTY_OUTPUT_RETRIES {
            let output = self.capture(&argv).await?;
            if output.trim().is_empty() {
                tracing::debug!(
                    "empty output for {:?} (attempt {}/{})",
                    kind,
                    attempt + 1,
                    EMPTY_OUTPUT_RETRIES + 1
                );
                continue;
            }
            if output.trim_start().starts_with(TOOL_BANNER) {
                bail!(
                    "tool reported an error for {:?}: {}",
                    kind,
                    truncate_for_log(output.trim(), 200)
                );
            }
            return Ok(output);
        }
        bail!(
            "tool produced no output for {:?} after {} retries",
            kind,
            EMPTY_OUTPUT_RETRIES
        );
    }

    /// Run a query and parse its stdout as JSON.
    pub async fn query_json<T: DeserializeOwned>(&self, kind: &QueryKind) -> Result<T> {
        let output = self.query(kind).await?;
        serde_json::from_str(&output)
            .with_context(|| format!("malformed JSON from {:?}", kind))
    }

    pub async fn state_chalet(&self) -> Result<ChaletState> {
        self.query_json(&QueryKind::StateChaletJson).await
    }

    pub async fn state_settings(&self) -> Result<SettingsState> {
        self.query_json(&QueryKind::StateSettingsJson).await
    }

    pub async fn schema_chalet(&self) -> Result<serde_json::Value> {
        self.query_json(&QueryKind::SchemaChaletJson).await
    }

    pub async fn schema_settings(&self) -> Result<serde_json::Value> {
        self.query_json(&QueryKind::SchemaSettingsJson).await
    }

    /// Architectures the given toolchain can target (tab-separated list).
    ///
    /// The empty toolchain name resolves to `["auto"]` without spawning
    /// anything.
    pub async fn architectures(&self, toolchain: &str) -> Result<Vec<String>> {
        if toolchain.is_empty() {
            return Ok(vec!["auto".to_string()]);
        }
        let output = self
            .query(&QueryKind::Architectures(toolchain.to_string()))
            .await?;
        Ok(output
            .trim()
            .split('\t')
            .map(|arch| arch.trim().to_string())
            .filter(|arch| !arch.is_empty())
            .collect())
    }

    /// `--version`, parsed.
    pub async fn version(&self) -> Result<ToolVersion> {
        let output = self.capture(&["--version".to_string()]).await?;
        ToolVersion::from_version_output(&output)
            .with_context(|| format!("unrecognized version output: {}", output.trim()))
    }

    async fn capture(&self, argv: &[String]) -> Result<String> {
        let output = Command::new(&self.executable)
            .args(argv)
            .current_dir(&self.cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                if error.kind() == std::io::ErrorKind::NotFound {
                    anyhow::anyhow!(
                        "{} was not found in PATH",
                        self.executable.display()
                    )
                } else {
                    anyhow::Error::from(error)
                        .context(format!("failed to spawn {}", self.executable.display()))
                }
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
