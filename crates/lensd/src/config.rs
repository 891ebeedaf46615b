//! gpulens.toml configuration.

use std::path::{Path, PathBuf};

use gpulens_diag::DiagnosticConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LensdConfig {
    pub server: ServerConfig,
    pub diagnostics: DiagnosticConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding the snapshot store.
    pub data_dir: PathBuf,
    /// Name reported with every diagnostic.
    pub cluster: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8470,
            data_dir: PathBuf::from("/var/lib/gpulens"),
            cluster: "default".to_string(),
        }
    }
}

impl LensdConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LensdConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Read `path` if given, otherwise use the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpulens_diag::InputPolicy;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
cluster = "us-east-h100"

[diagnostics]
input_policy = "reject"

[diagnostics.load]
hotspot_band = 15.0
"#
        )
        .unwrap();

        let config = LensdConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.cluster, "us-east-h100");
        assert_eq!(config.server.port, 8470);
        assert_eq!(config.diagnostics.input_policy, InputPolicy::Reject);
        assert_eq!(config.diagnostics.load.hotspot_band, 15.0);
        assert_eq!(config.diagnostics.load.allocation_weight, 0.6);
        assert_eq!(config.diagnostics.fragmentation.critical_threshold, 60.0);
    }

    #[test]
    fn empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = LensdConfig::from_file(file.path()).unwrap();
        assert_eq!(config, LensdConfig::default());
    }

    #[test]
    fn default_toml_round_trips() {
        let config = LensdConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[server]"));
        assert!(text.contains("[diagnostics.fragmentation]"));

        let parsed: LensdConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_without_path_uses_defaults() {
        assert_eq!(LensdConfig::load(None).unwrap(), LensdConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(LensdConfig::load(Some(Path::new("/nonexistent/gpulens.toml"))).is_err());
    }
}
