//! Typed view over the host's user configuration.

use host::Configuration;
use std::path::PathBuf;

const KEY_STATUS_BAR_BUTTONS: &str = "statusBarButtons";
const KEY_EXECUTABLE_PATH: &str = "executablePath";
const KEY_ENV_FILE: &str = "envFile";

/// Extension settings as configured in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    /// Whether the status-bar button surface is enabled at all.
    pub status_bar_buttons: bool,
    /// Override for the tool executable; `None` means "chalet" from PATH.
    pub executable_path: Option<String>,
    /// Environment file passed via `--env-file`.
    pub env_file: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            status_bar_buttons: true,
            executable_path: None,
            env_file: ".env".to_string(),
        }
    }
}

impl ExtensionConfig {
    pub fn load(config: &dyn Configuration) -> Self {
        Self {
            status_bar_buttons: config.get_bool(KEY_STATUS_BAR_BUTTONS).unwrap_or(true),
            executable_path: config
                .get_string(KEY_EXECUTABLE_PATH)
                .filter(|path| !path.is_empty()),
            env_file: config
                .get_string(KEY_ENV_FILE)
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| ".env".to_string()),
        }
    }

    /// The tool executable to invoke.
    pub fn executable(&self) -> PathBuf {
        self.executable_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("chalet"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::fake::FakeConfiguration;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_when_host_has_no_values() {
        let config = ExtensionConfig::load(&FakeConfiguration::default());
        assert_eq!(config, ExtensionConfig::default());
        assert_eq!(config.executable(), PathBuf::from("chalet"));
    }

    #[test]
    fn reads_host_values() {
        let host_config = FakeConfiguration::default();
        host_config.set_bool("statusBarButtons", false);
        host_config.set_string("executablePath", "/opt/chalet/bin/chalet");
        host_config.set_string("envFile", ".env.local");

        let config = ExtensionConfig::load(&host_config);
        assert!(!config.status_bar_buttons);
        assert_eq!(config.executable(), PathBuf::from("/opt/chalet/bin/chalet"));
        assert_eq!(config.env_file, ".env.local");
    }

    #[test]
    fn empty_executable_override_falls_back_to_path_lookup() {
        let host_config = FakeConfiguration::default();
        host_config.set_string("executablePath", "");
        let config = ExtensionConfig::load(&host_config);
        assert_eq!(config.executable(), PathBuf::from("chalet"));
    }
}
