use crate::CoreError;
use nbstack_build::KNOWN_BACKENDS;
use nbstack_schema::reference::has_digest;
use nbstack_schema::validate_image_reference;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the configured builder.
pub const BUILDER_ENV: &str = "NBSTACK_BUILDER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Image builder: `docker`, `podman`, or `mock`.
    #[serde(default = "default_builder")]
    pub builder: String,
    /// Repository name for images whose manifest declares no output tag.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
    /// Always ask the builder to pull a newer base image.
    #[serde(default)]
    pub pull: bool,
}

fn default_builder() -> String {
    "docker".to_owned()
}

fn default_tag_prefix() -> String {
    "nbstack".to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            builder: default_builder(),
            tag_prefix: default_tag_prefix(),
            pull: false,
        }
    }
}

impl Config {
    /// Load config from `~/.config/nbstack/config.json`, falling back to defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, CoreError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CoreError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `NBSTACK_BUILDER` if it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(BUILDER_ENV) {
            Ok(builder) if !builder.trim().is_empty() => self.with_builder(builder.trim()),
            _ => self,
        }
    }

    #[must_use]
    pub fn with_builder(mut self, builder: &str) -> Self {
        builder.clone_into(&mut self.builder);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !KNOWN_BACKENDS.contains(&self.builder.as_str()) {
            return Err(CoreError::Config(format!(
                "unknown builder '{}' (expected one of: {})",
                self.builder,
                KNOWN_BACKENDS.join(", ")
            )));
        }
        // The short id is appended as the tag, so the prefix must not carry
        // one. A registry port before the last `/` is fine.
        let repository = self.tag_prefix.rsplit('/').next().unwrap_or_default();
        let prefix_ok = !self.tag_prefix.is_empty()
            && !repository.contains(':')
            && !has_digest(&self.tag_prefix)
            && validate_image_reference(&self.tag_prefix).is_ok();
        if !prefix_ok {
            return Err(CoreError::Config(format!(
                "tag_prefix '{}' is not a valid repository name",
                self.tag_prefix
            )));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/nbstack/config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let config = Config {
            builder: "podman".to_owned(),
            tag_prefix: "lumberjacks/notebooks".to_owned(),
            pull: true,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "pull": true }"#).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.builder, "docker");
        assert_eq!(loaded.tag_prefix, "nbstack");
        assert!(loaded.pull);
    }

    #[test]
    fn rejects_unknown_builder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "builder": "kaniko" }"#).unwrap();
        assert!(matches!(Config::load(&path), Err(CoreError::Config(_))));
    }

    #[test]
    fn rejects_tag_prefix_with_tag() {
        let config = Config {
            tag_prefix: "nbstack:latest".to_owned(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            tag_prefix: "localhost:5000/team/nb:v1".to_owned(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_tag_prefix_with_registry_port() {
        let config = Config {
            tag_prefix: "localhost:5000/team/nb".to_owned(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert!(validate_image_reference(&format!("{}:0123456789ab", config.tag_prefix)).is_ok());
    }

    #[test]
    fn with_builder_replaces_builder() {
        let config = Config::default().with_builder("mock");
        assert_eq!(config.builder, "mock");
        assert!(config.validate().is_ok());
    }
}
