use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use hivekit_platform::PlatformConfig;
use hivekit_types::View;
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "hivekit.toml";
/// Snapshot file used when neither `--store` nor the config names one.
pub const DEFAULT_STORE_FILE: &str = "hivekit-store.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store_path: PathBuf,
    pub view: View,
    /// Used only when the snapshot file does not exist yet.
    pub platform: PlatformConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            view: View::Default,
            platform: PlatformConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load an explicit config file, or the default one if it exists.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivekit_types::Bitness;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.store_path, PathBuf::from(DEFAULT_STORE_FILE));
        assert_eq!(c.view, View::Default);
        assert!(c.platform.dual_view);
    }

    #[test]
    fn parse_toml() {
        let c = CliConfig::from_toml(
            r#"
            store_path = "/var/lib/hivekit/store.json"
            view = "Force32"

            [platform]
            dual_view = false
            native_bitness = "Bits32"
            "#,
        )
        .unwrap();
        assert_eq!(c.store_path, PathBuf::from("/var/lib/hivekit/store.json"));
        assert_eq!(c.view, View::Force32);
        assert_eq!(c.platform, PlatformConfig::single_view(Bitness::Bits32));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = CliConfig::from_toml("view = \"Force64\"").unwrap();
        assert_eq!(c.view, View::Force64);
        assert_eq!(c.store_path, PathBuf::from(DEFAULT_STORE_FILE));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hivekit.toml");
        fs::write(&path, "store_path = \"other.json\"").unwrap();
        let c = CliConfig::resolve(Some(&path)).unwrap();
        assert_eq!(c.store_path, PathBuf::from("other.json"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::resolve(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(CliConfig::from_toml("view = 3").is_err());
    }
}
