use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters that start a version constraint in conda and pip requirement strings.
const CONSTRAINT_OPERATORS: &[char] = &['=', '<', '>', '!', '~'];

/// Package manager a group of packages is installed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Conda,
    Pip,
    /// JupyterLab extensions installed from npm via `jupyter labextension`.
    #[serde(rename = "labextension", alias = "npm-extension")]
    LabExtension,
}

impl PackageManager {
    pub const ALL: [PackageManager; 3] = [Self::Conda, Self::Pip, Self::LabExtension];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conda => "conda",
            Self::Pip => "pip",
            Self::LabExtension => "labextension",
        }
    }

    /// Bring a user-written constraint into the form the renderer emits.
    ///
    /// Whitespace next to an operator or comma is dropped, and a bare version
    /// gets the manager's exact-match operator so that `name<constraint>` is
    /// always a valid requirement. Conda's `version build` pair becomes
    /// `=version=build`.
    pub fn canonical_constraint(self, raw: &str) -> Option<String> {
        let mut compact = String::with_capacity(raw.len());
        for word in raw.split_whitespace() {
            let glued = compact.is_empty()
                || compact.ends_with(CONSTRAINT_OPERATORS)
                || compact.ends_with(',')
                || word.starts_with(CONSTRAINT_OPERATORS)
                || word.starts_with(',');
            if !glued && self == Self::Conda {
                compact.push('=');
            }
            compact.push_str(word);
        }
        if compact.is_empty() {
            return None;
        }
        let canonical = match self {
            Self::Conda if !compact.starts_with(CONSTRAINT_OPERATORS) => format!("={compact}"),
            Self::Pip if !compact.starts_with(CONSTRAINT_OPERATORS) => format!("=={compact}"),
            _ => compact,
        };
        Some(canonical)
    }

    /// Lexical checks that keep a rendered requirement unambiguous.
    pub fn check_name(self, name: &str) -> Result<(), &'static str> {
        if name.is_empty() {
            return Err("package name must not be empty");
        }
        if name.chars().any(char::is_whitespace) {
            return Err("package name must not contain whitespace");
        }
        if name.starts_with('-') {
            return Err("package name must not start with '-'");
        }
        match self {
            Self::Conda | Self::Pip => {
                if name.contains(CONSTRAINT_OPERATORS) {
                    return Err(
                        "package name must not contain a version operator; use the `version` field",
                    );
                }
            }
            Self::LabExtension => {
                let unscoped = name.strip_prefix('@').unwrap_or(name);
                if unscoped.is_empty() || unscoped.contains('@') {
                    return Err(
                        "extension name must not contain '@' except a leading scope; \
                         use the `version` field",
                    );
                }
            }
        }
        Ok(())
    }

    /// Checks on an already canonical constraint.
    ///
    /// An extension requirement is split at its last `@`, so the version part
    /// must not contain one.
    pub fn check_constraint(self, constraint: &str) -> Result<(), &'static str> {
        match self {
            Self::LabExtension if constraint.contains('@') => {
                Err("extension versions must not contain '@'")
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conda" => Ok(Self::Conda),
            "pip" => Ok(Self::Pip),
            "labextension" | "npm-extension" => Ok(Self::LabExtension),
            other => Err(format!(
                "unknown package manager '{other}' (expected: conda, pip, labextension)"
            )),
        }
    }
}

/// A single package with an optional, already canonicalized version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_constraint: None,
        }
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.version_constraint = Some(constraint.into());
        self
    }

    /// The requirement string as passed on the package manager's command line.
    pub fn requirement(&self, manager: PackageManager) -> String {
        match (&self.version_constraint, manager) {
            (None, _) => self.name.clone(),
            (Some(c), PackageManager::LabExtension) => format!("{}@{c}", self.name),
            (Some(c), _) => format!("{}{c}", self.name),
        }
    }

    /// Split a requirement string back into name and constraint.
    pub fn from_requirement(manager: PackageManager, requirement: &str) -> Self {
        let split = match manager {
            PackageManager::Conda | PackageManager::Pip => {
                requirement.find(CONSTRAINT_OPERATORS)
            }
            PackageManager::LabExtension => requirement.rfind('@').filter(|&i| i > 0),
        };
        match split {
            Some(idx) => {
                let (name, rest) = requirement.split_at(idx);
                let constraint = match manager {
                    PackageManager::LabExtension => &rest[1..],
                    _ => rest,
                };
                Self {
                    name: name.to_owned(),
                    version_constraint: (!constraint.is_empty()).then(|| constraint.to_owned()),
                }
            }
            None => Self::new(requirement),
        }
    }
}

/// An ordered set of packages installed by one package-manager invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageGroup {
    pub manager: PackageManager,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub packages: Vec<PackageSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_versions_get_manager_operator() {
        assert_eq!(
            PackageManager::Conda.canonical_constraint("8.0").as_deref(),
            Some("=8.0")
        );
        assert_eq!(
            PackageManager::Pip.canonical_constraint(" 3.5 ").as_deref(),
            Some("==3.5")
        );
        assert_eq!(
            PackageManager::LabExtension.canonical_constraint("^2.0").as_deref(),
            Some("^2.0")
        );
        assert_eq!(
            PackageManager::Pip.canonical_constraint(">=1.0, <2").as_deref(),
            Some(">=1.0,<2")
        );
        assert!(PackageManager::Conda.canonical_constraint("  ").is_none());
    }

    #[test]
    fn conda_build_string_joined_with_equals() {
        assert_eq!(
            PackageManager::Conda.canonical_constraint("1.0 py38_0").as_deref(),
            Some("=1.0=py38_0")
        );
        assert_eq!(
            PackageManager::Conda.canonical_constraint(">= 1.0, < 2").as_deref(),
            Some(">=1.0,<2")
        );
        let spec = PackageSpec::new("numpy").with_constraint("=1.0=py38_0");
        assert_eq!(
            PackageSpec::from_requirement(
                PackageManager::Conda,
                &spec.requirement(PackageManager::Conda)
            ),
            spec
        );
    }

    #[test]
    fn extension_versions_reject_at_sign() {
        let ext = PackageManager::LabExtension;
        let constraint = ext.canonical_constraint("npm:@plotly/ext@4.14").unwrap();
        assert!(ext.check_constraint(&constraint).is_err());
        assert!(ext.check_constraint("^4.14").is_ok());
        assert!(PackageManager::Pip.check_constraint(">=1.0").is_ok());
    }

    #[test]
    fn requirement_formats_per_manager() {
        let spec = PackageSpec::new("nltk").with_constraint(">=3.5");
        assert_eq!(spec.requirement(PackageManager::Pip), "nltk>=3.5");
        let ext = PackageSpec::new("@jupyter-widgets/jupyterlab-manager").with_constraint("2.0");
        assert_eq!(
            ext.requirement(PackageManager::LabExtension),
            "@jupyter-widgets/jupyterlab-manager@2.0"
        );
        assert_eq!(
            PackageSpec::new("pillow").requirement(PackageManager::Conda),
            "pillow"
        );
    }

    #[test]
    fn from_requirement_splits_at_operator() {
        let spec = PackageSpec::from_requirement(PackageManager::Conda, "geomdl=5.2.10");
        assert_eq!(spec.name, "geomdl");
        assert_eq!(spec.version_constraint.as_deref(), Some("=5.2.10"));

        let spec = PackageSpec::from_requirement(PackageManager::Pip, "scrapy");
        assert_eq!(spec, PackageSpec::new("scrapy"));
    }

    #[test]
    fn from_requirement_keeps_npm_scope() {
        let spec = PackageSpec::from_requirement(
            PackageManager::LabExtension,
            "@jupyter-widgets/jupyterlab-manager",
        );
        assert_eq!(spec.name, "@jupyter-widgets/jupyterlab-manager");
        assert!(spec.version_constraint.is_none());

        let spec = PackageSpec::from_requirement(
            PackageManager::LabExtension,
            "@bokeh/jupyter_bokeh@2.0.4",
        );
        assert_eq!(spec.name, "@bokeh/jupyter_bokeh");
        assert_eq!(spec.version_constraint.as_deref(), Some("2.0.4"));
    }

    #[test]
    fn names_with_operators_rejected() {
        assert!(PackageManager::Conda.check_name("numpy=1.0").is_err());
        assert!(PackageManager::Pip.check_name("two words").is_err());
        assert!(PackageManager::LabExtension.check_name("@scope/ext@1").is_err());
        assert!(PackageManager::LabExtension.check_name("@scope/ext").is_ok());
        assert!(PackageManager::Pip.check_name("requests[socks]").is_ok());
    }

    #[test]
    fn names_starting_with_dash_rejected() {
        for manager in PackageManager::ALL {
            assert!(manager.check_name("--pre").is_err());
            assert!(manager.check_name("-e").is_err());
        }
        assert!(PackageManager::Pip.check_name("scrapy-splash").is_ok());
    }

    #[test]
    fn manager_parses_aliases() {
        assert_eq!(
            "npm-extension".parse::<PackageManager>().unwrap(),
            PackageManager::LabExtension
        );
        assert_eq!("Conda".parse::<PackageManager>().unwrap(), PackageManager::Conda);
        assert!("apt".parse::<PackageManager>().is_err());
    }
}
