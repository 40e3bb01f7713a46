use crate::package::PackageManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to serialize manifest: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("unsupported manifest_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("base.image must not be empty")]
    EmptyBaseImage,
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidImageReference {
        reference: String,
        reason: &'static str,
    },
    #[error("output.tag must not pin a digest: '{0}'")]
    DigestInOutputTag(String),
    #[error("package group #{index} ({manager}) has no packages")]
    EmptyGroup {
        index: usize,
        manager: PackageManager,
    },
    #[error("package group #{index}: invalid channel '{channel}'")]
    InvalidChannel { index: usize, channel: String },
    #[error("package group #{index}: invalid package name '{name}': {reason}")]
    InvalidPackageName {
        index: usize,
        name: String,
        reason: &'static str,
    },
    #[error("package group #{index}: invalid version '{constraint}' for '{name}': {reason}")]
    InvalidConstraint {
        index: usize,
        name: String,
        constraint: String,
        reason: &'static str,
    },
    #[error("package group #{index}: conflicting versions of '{name}': '{first}' vs '{second}'")]
    ConflictingConstraint {
        index: usize,
        name: String,
        first: String,
        second: String,
    },
    #[error("postlude.fix_permissions entry is invalid: '{0}'")]
    InvalidPostludePath(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestV1 {
    pub manifest_version: u32,
    pub base: BaseSection,
    #[serde(default, skip_serializing_if = "OutputSection::is_empty")]
    pub output: OutputSection,
    #[serde(default, skip_serializing_if = "PostludeSection::is_default")]
    pub postlude: PostludeSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_groups: Vec<GroupSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BaseSection {
    pub image: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl OutputSection {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PostludeSection {
    #[serde(default = "default_fix_permissions")]
    pub fix_permissions: Vec<String>,
}

impl Default for PostludeSection {
    fn default() -> Self {
        Self {
            fix_permissions: default_fix_permissions(),
        }
    }
}

impl PostludeSection {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Paths the Jupyter docker-stacks images expect to be re-owned after every install.
pub fn default_fix_permissions() -> Vec<String> {
    vec!["${CONDA_DIR}".to_owned(), "/home/${NB_USER}".to_owned()]
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GroupSection {
    pub manager: PackageManager,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

/// A package as written in the manifest: either a bare name or a `{ name, version }` table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PackageEntry {
    Name(String),
    Pinned(PinnedPackage),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PinnedPackage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Pinned(p) => &p.name,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Pinned(p) => p.version.as_deref(),
        }
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ManifestV1, ManifestError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ManifestV1, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

impl ManifestV1 {
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
