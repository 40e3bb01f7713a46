use crate::postlude::postlude;
use crate::quote::{join_args, quote_arg};
use nbstack_schema::{
    compute_identity, ManifestDigest, NormalizedManifest, PackageGroup, PackageManager,
    DIGEST_LABEL,
};
use serde::Serialize;
use std::fmt::Write as _;

/// One container build instruction: consecutive groups of the same manager
/// installed in order, then that manager's postlude.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Step {
    pub manager: PackageManager,
    pub install: Vec<String>,
    pub postlude: Vec<String>,
}

impl Step {
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.install
            .iter()
            .chain(self.postlude.iter())
            .map(String::as_str)
    }
}

/// The shell commands that realize a manifest on top of its base image.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderPlan {
    pub base_image: String,
    pub digest: ManifestDigest,
    pub steps: Vec<Step>,
}

impl RenderPlan {
    /// All commands in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(Step::commands)
            .map(str::to_owned)
            .collect()
    }

    pub fn to_dockerfile(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "FROM {}", self.base_image);
        out.push('\n');
        let _ = writeln!(out, "LABEL {DIGEST_LABEL}=\"{}\"", self.digest);
        for step in &self.steps {
            out.push('\n');
            let body = step.commands().collect::<Vec<_>>().join(" && \\\n    ");
            let _ = writeln!(out, "RUN {body}");
        }
        out
    }
}

/// Render a normalized manifest. Deterministic and infallible.
pub fn render(manifest: &NormalizedManifest) -> RenderPlan {
    let identity = compute_identity(manifest);
    let mut steps: Vec<Step> = Vec::new();

    for group in &manifest.package_groups {
        let command = install_command(group);
        match steps.last_mut() {
            Some(step) if step.manager == group.manager => step.install.push(command),
            _ => steps.push(Step {
                manager: group.manager,
                install: vec![command],
                postlude: postlude(group.manager, &manifest.fix_permissions),
            }),
        }
    }

    RenderPlan {
        base_image: manifest.base_image.clone(),
        digest: identity.digest,
        steps,
    }
}

pub fn install_command(group: &PackageGroup) -> String {
    let mut prefix = String::new();
    let mut args: Vec<String> = match group.manager {
        PackageManager::Conda => vec![
            "conda".into(),
            "install".into(),
            "--quiet".into(),
            "--yes".into(),
        ],
        PackageManager::Pip => vec![
            "pip".into(),
            "install".into(),
            "--quiet".into(),
            "--no-cache-dir".into(),
        ],
        PackageManager::LabExtension => vec![
            "jupyter".into(),
            "labextension".into(),
            "install".into(),
            "--no-build".into(),
        ],
    };

    if let Some(channel) = &group.channel {
        match group.manager {
            PackageManager::Conda => args.extend(["-c".to_owned(), channel.clone()]),
            PackageManager::Pip => args.extend(["--extra-index-url".to_owned(), channel.clone()]),
            PackageManager::LabExtension => {
                prefix = format!("NPM_CONFIG_REGISTRY={} ", quote_arg(channel));
            }
        }
    }

    args.extend(group.packages.iter().map(|p| p.requirement(group.manager)));
    format!("{prefix}{}", join_args(&args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbstack_schema::parse_manifest_str;

    fn normalized(input: &str) -> NormalizedManifest {
        parse_manifest_str(input).unwrap().normalize().unwrap()
    }

    #[test]
    fn same_manager_groups_share_one_cleanup_block() {
        let plan = render(&normalized(
            r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook"
[[package_groups]]
manager = "conda"
packages = ["pillow"]
[[package_groups]]
manager = "conda"
channel = "orbingol"
packages = ["geomdl"]
"#,
        ));
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(
            plan.commands(),
            vec![
                "conda install --quiet --yes pillow",
                "conda install --quiet --yes -c orbingol geomdl",
                "conda clean --all -f -y",
                "fix-permissions \"${CONDA_DIR}\"",
                "fix-permissions \"/home/${NB_USER}\"",
            ]
        );
    }

    #[test]
    fn manager_change_starts_new_step() {
        let plan = render(&normalized(
            r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook"
[[package_groups]]
manager = "conda"
packages = ["scrapy"]
[[package_groups]]
manager = "pip"
packages = [{ name = "selenium", version = ">=4" }]
[[package_groups]]
manager = "conda"
packages = ["lxml"]
"#,
        ));
        let managers: Vec<_> = plan.steps.iter().map(|s| s.manager).collect();
        assert_eq!(
            managers,
            vec![PackageManager::Conda, PackageManager::Pip, PackageManager::Conda]
        );
        assert_eq!(
            plan.steps[1].install,
            vec!["pip install --quiet --no-cache-dir 'selenium>=4'"]
        );
    }

    #[test]
    fn pip_and_labextension_channels() {
        let plan = render(&normalized(
            r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook"
[[package_groups]]
manager = "pip"
channel = "https://pypi.example.org/simple"
packages = ["textblob"]
[[package_groups]]
manager = "labextension"
channel = "https://npm.example.org"
packages = [{ name = "@jupyter-widgets/jupyterlab-manager", version = "^2.0" }]
"#,
        ));
        assert_eq!(
            plan.steps[0].install[0],
            "pip install --quiet --no-cache-dir --extra-index-url https://pypi.example.org/simple textblob"
        );
        assert_eq!(
            plan.steps[1].install[0],
            "NPM_CONFIG_REGISTRY=https://npm.example.org jupyter labextension install --no-build '@jupyter-widgets/jupyterlab-manager@^2.0'"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook"
[[package_groups]]
manager = "conda"
channel = "conda-forge"
packages = ["nltk", "spacy"]
"#;
        assert_eq!(render(&normalized(input)), render(&normalized(input)));
    }

    #[test]
    fn empty_manifest_renders_no_commands() {
        let plan = render(&normalized(
            r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook"
"#,
        ));
        assert!(plan.commands().is_empty());
        let dockerfile = plan.to_dockerfile();
        assert!(dockerfile.starts_with("FROM jupyter/scipy-notebook\n"));
        assert!(!dockerfile.contains("RUN"));
    }

    #[test]
    fn dockerfile_has_one_run_per_step() {
        let plan = render(&normalized(
            r#"
manifest_version = 1
[base]
image = "jupyter/scipy-notebook:latest"
[[package_groups]]
manager = "conda"
packages = ["pillow"]
[[package_groups]]
manager = "pip"
packages = ["scrapy"]
"#,
        ));
        let dockerfile = plan.to_dockerfile();
        assert_eq!(dockerfile.matches("\nRUN ").count(), 2);
        assert!(dockerfile.contains(&format!("LABEL {DIGEST_LABEL}=\"{}\"", plan.digest)));
        assert!(dockerfile.contains(
            "RUN conda install --quiet --yes pillow && \\\n    conda clean --all -f -y"
        ));
    }
}
