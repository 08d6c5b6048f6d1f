//! JSON state documents returned by the tool's query interface.

use collections::FxHashMap;
use serde::Deserialize;

/// `query state-chalet-json`: what the project file defines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChaletState {
    pub configurations: Vec<String>,
    pub targets: Vec<String>,
    pub run_targets: Vec<String>,
}

/// `query state-settings-json`: toolchains, strategies, and the tool's own
/// current selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsState {
    pub toolchain_presets: Vec<String>,
    pub user_toolchains: Vec<String>,
    pub build_strategies: Vec<String>,
    pub build_path_styles: Vec<String>,
    pub toolchain: Option<String>,
    pub architecture: Option<String>,
    pub configuration: Option<String>,
    pub build_strategy: Option<String>,
    pub build_path_style: Option<String>,
    pub last_run_target: Option<String>,
}

/// Aggregated snapshot of everything queried from the tool. Rebuilt
/// wholesale on each successful refresh; the previous snapshot is retained
/// across failed refresh cycles until retries are exhausted.
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    pub chalet: ChaletState,
    pub settings: SettingsState,
    /// toolchain name → architectures it can target
    pub architectures: FxHashMap<String, Vec<String>>,
}

impl ToolState {
    /// Toolchain menu source: user-declared toolchains ahead of presets,
    /// first-seen order, intentionally not de-duplicated.
    pub fn merged_toolchains(&self) -> Vec<String> {
        let mut merged = self.settings.user_toolchains.clone();
        merged.extend(self.settings.toolchain_presets.iter().cloned());
        merged
    }
}
