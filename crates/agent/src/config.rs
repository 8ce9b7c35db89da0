use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Agent configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the identity discovery registry.
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    /// Base URL of the trust graph service.
    #[serde(default = "default_trust_url")]
    pub trust_url: String,
    /// Directory holding key records.
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    /// Identifier used for outbound signatures when set.
    #[serde(default)]
    pub active_identifier: Option<String>,
    /// Keystore passphrase; secrets are stored in plaintext records when
    /// absent.
    #[serde(default)]
    pub passphrase: Option<String>,
}

fn default_discovery_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_trust_url() -> String {
    "http://localhost:3002".to_string()
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("./keys")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            trust_url: default_trust_url(),
            key_dir: default_key_dir(),
            active_identifier: None,
            passphrase: None,
        }
    }
}

impl AgentConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> AgentResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AgentError::Configuration(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| AgentError::Configuration(format!("Invalid config: {}", e)))
    }

    /// Load a configuration file, falling back to defaults when it does not
    /// exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> AgentResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> AgentResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AgentError::Configuration(format!("Failed to serialize config: {}", e)))?;
        fs::write(path.as_ref(), content).map_err(|e| {
            AgentError::Configuration(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config: AgentConfig = toml::from_str("discovery_url = \"https://registry.test\"").unwrap();
        assert_eq!(config.discovery_url, "https://registry.test");
        assert_eq!(config.trust_url, default_trust_url());
        assert_eq!(config.key_dir, default_key_dir());
        assert!(config.active_identifier.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fides.toml");

        let mut config = AgentConfig::default();
        config.active_identifier = Some("did:fides:abc".to_string());
        config.save(&path).unwrap();

        let loaded = AgentConfig::load(&path).unwrap();
        assert_eq!(loaded.active_identifier.as_deref(), Some("did:fides:abc"));
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let dir = tempdir().unwrap();
        let config = AgentConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.trust_url, default_trust_url());
    }
}
