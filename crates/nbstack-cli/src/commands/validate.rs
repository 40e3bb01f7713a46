use super::{json_pretty, make_engine, EXIT_SUCCESS};
use nbstack_core::Config;
use std::path::Path;

pub fn run(config: Config, manifest: &Path, json: bool) -> Result<u8, String> {
    let engine = make_engine(config)?;
    let loaded = engine.load(manifest).map_err(|e| e.to_string())?;
    if json {
        let payload = serde_json::json!({
            "valid": true,
            "manifest": manifest.display().to_string(),
            "digest": loaded.identity.digest,
            "package_groups": loaded.normalized.package_groups.len(),
            "packages": loaded.normalized.package_count(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{} is valid: {} package(s) in {} group(s)",
            manifest.display(),
            loaded.normalized.package_count(),
            loaded.normalized.package_groups.len()
        );
    }
    Ok(EXIT_SUCCESS)
}
