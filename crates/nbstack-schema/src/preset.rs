use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub manifest: &'static str,
}

pub const BUILTIN_PRESETS: &[Preset] = &[
    Preset {
        name: "minimal",
        description: "SciPy notebook image with no extra packages",
        manifest: r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:latest"
"#,
    },
    Preset {
        name: "scipy-imaging",
        description: "Imaging and NURBS geometry on top of the SciPy notebook",
        manifest: r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:latest"

[[package_groups]]
manager = "conda"
packages = ["pillow"]

[[package_groups]]
manager = "conda"
channel = "orbingol"
packages = ["geomdl"]
"#,
    },
    Preset {
        name: "scipy-nlp",
        description: "Natural language processing toolkits",
        manifest: r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:latest"

[[package_groups]]
manager = "conda"
channel = "conda-forge"
packages = ["nltk", "spacy", "gensim"]

[[package_groups]]
manager = "pip"
packages = ["textblob"]
"#,
    },
    Preset {
        name: "scipy-scraping",
        description: "Web scraping stack (pip covers what conda cannot install cleanly)",
        manifest: r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:latest"

[[package_groups]]
manager = "conda"
packages = ["scrapy", "beautifulsoup4", "lxml"]

[[package_groups]]
manager = "pip"
packages = ["selenium"]
"#,
    },
    Preset {
        name: "scipy-viz",
        description: "Statistical plotting with interactive widgets in JupyterLab",
        manifest: r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:latest"

[[package_groups]]
manager = "conda"
packages = ["seaborn", "statsmodels", "ipywidgets"]

[[package_groups]]
manager = "labextension"
packages = ["@jupyter-widgets/jupyterlab-manager"]
"#,
    },
];

pub fn get_preset(name: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn list_presets() -> &'static [Preset] {
    BUILTIN_PRESETS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_normalize() {
        for preset in BUILTIN_PRESETS {
            let result = crate::parse_manifest_str(preset.manifest).map(|m| m.normalize());
            assert!(
                matches!(result, Ok(Ok(_))),
                "preset '{}' failed: {:?}",
                preset.name,
                result
            );
        }
    }

    #[test]
    fn get_preset_by_name() {
        assert!(get_preset("scipy-imaging").is_some());
        assert!(get_preset("nonexistent").is_none());
    }

    #[test]
    fn all_presets_have_unique_names() {
        let mut names: Vec<&str> = BUILTIN_PRESETS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN_PRESETS.len());
    }
}
