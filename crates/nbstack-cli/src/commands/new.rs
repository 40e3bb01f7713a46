use super::{json_pretty, write_atomic, EXIT_SUCCESS};
use dialoguer::{Confirm, Input, Select};
use nbstack_schema::{
    get_preset, list_presets, parse_manifest_str, BaseSection, GroupSection, ManifestV1,
    OutputSection, PackageEntry, PackageManager, PackageSpec, PinnedPackage, PostludeSection,
};
use std::io::{stderr, stdin, IsTerminal};
use std::path::Path;

const DEST_MANIFEST: &str = "nbstack.toml";
const DEFAULT_BASE_IMAGE: &str = "jupyter/scipy-notebook:latest";

fn preset_source(name: &str) -> Result<&'static str, String> {
    let preset = get_preset(name).ok_or_else(|| {
        let names: Vec<_> = list_presets().iter().map(|p| p.name).collect();
        format!("unknown preset '{name}' (expected: {})", names.join(", "))
    })?;
    Ok(preset.manifest)
}

fn ensure_can_write(dest: &Path, force: bool, is_tty: bool) -> Result<(), String> {
    if !dest.exists() || force {
        return Ok(());
    }
    if !is_tty {
        return Err(format!(
            "refusing to overwrite existing ./{DEST_MANIFEST} (pass --force)"
        ));
    }
    let overwrite = Confirm::new()
        .with_prompt(format!("overwrite ./{DEST_MANIFEST}?"))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))?;
    if overwrite {
        Ok(())
    } else {
        Err(format!(
            "refusing to overwrite existing ./{DEST_MANIFEST} (pass --force)"
        ))
    }
}

/// Turn whitespace-separated requirements like `nltk>=3.5 pillow` into entries.
fn package_entries(manager: PackageManager, line: &str) -> Vec<PackageEntry> {
    line.split_whitespace()
        .map(|req| PackageSpec::from_requirement(manager, req))
        .map(|spec| match spec.version_constraint {
            None => PackageEntry::Name(spec.name),
            Some(version) => PackageEntry::Pinned(PinnedPackage {
                name: spec.name,
                version: Some(version),
            }),
        })
        .collect()
}

fn prompt_manifest() -> Result<ManifestV1, String> {
    let image: String = Input::new()
        .with_prompt("base image")
        .default(DEFAULT_BASE_IMAGE.to_owned())
        .interact_text()
        .map_err(|e| format!("prompt failed: {e}"))?;
    let tag: String = Input::new()
        .with_prompt("output tag (empty for a digest-derived tag)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| format!("prompt failed: {e}"))?;

    let mut groups = Vec::new();
    let choices = ["conda", "pip", "labextension", "done"];
    loop {
        let idx = Select::new()
            .with_prompt("add a package group")
            .items(&choices)
            .default(if groups.is_empty() { 0 } else { choices.len() - 1 })
            .interact()
            .map_err(|e| format!("prompt failed: {e}"))?;
        let Some(manager) = PackageManager::ALL.get(idx).copied() else {
            break;
        };
        let channel: String = Input::new()
            .with_prompt("channel (empty for the default)")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| format!("prompt failed: {e}"))?;
        let packages: String = Input::new()
            .with_prompt("packages (space-separated)")
            .interact_text()
            .map_err(|e| format!("prompt failed: {e}"))?;
        groups.push(GroupSection {
            manager,
            channel: Some(channel.trim().to_owned()).filter(|c| !c.is_empty()),
            packages: package_entries(manager, &packages),
        });
    }

    Ok(ManifestV1 {
        manifest_version: 1,
        base: BaseSection { image },
        output: OutputSection {
            tag: Some(tag.trim().to_owned()).filter(|t| !t.is_empty()),
        },
        postlude: PostludeSection::default(),
        package_groups: groups,
    })
}

fn print_result(preset: Option<&str>, groups: usize, json: bool) -> Result<(), String> {
    if json {
        let payload = serde_json::json!({
            "status": "written",
            "path": format!("./{DEST_MANIFEST}"),
            "preset": preset,
            "package_groups": groups,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote ./{DEST_MANIFEST} ({groups} package group(s))");
        if let Some(name) = preset {
            println!("preset: {name}");
        }
    }
    Ok(())
}

pub fn run(preset: Option<&str>, force: bool, json: bool) -> Result<u8, String> {
    let dest = Path::new(DEST_MANIFEST);
    let is_tty = stdin().is_terminal() && stderr().is_terminal();

    let content = if let Some(name) = preset {
        let source = preset_source(name)?;
        ensure_can_write(dest, force, is_tty)?;
        source.to_owned()
    } else {
        if !is_tty {
            return Err("no --preset provided and stdin is not a TTY".to_owned());
        }
        ensure_can_write(dest, force, is_tty)?;
        toml::to_string_pretty(&prompt_manifest()?)
            .map_err(|e| format!("TOML serialization failed: {e}"))?
    };

    // Never write a manifest that would not load back.
    let manifest = parse_manifest_str(&content).map_err(|e| format!("manifest error: {e}"))?;
    manifest
        .normalize()
        .map_err(|e| format!("manifest error: {e}"))?;

    write_atomic(dest, &content)?;
    print_result(preset, manifest.package_groups.len(), json)?;
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve() {
        for preset in list_presets() {
            let source = preset_source(preset.name).unwrap();
            let manifest = parse_manifest_str(source).unwrap();
            assert!(!manifest.base.image.is_empty());
        }
    }

    #[test]
    fn unknown_preset_lists_choices() {
        let err = preset_source("scipy-gis").unwrap_err();
        assert!(err.contains("scipy-imaging"));
    }

    #[test]
    fn package_entries_split_versions() {
        let entries = package_entries(PackageManager::Pip, "scrapy nltk>=3.5");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], PackageEntry::Name("scrapy".to_owned()));
        assert_eq!(entries[1].name(), "nltk");
        assert_eq!(entries[1].version(), Some(">=3.5"));
    }
}
