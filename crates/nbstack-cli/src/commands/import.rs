use super::{json_pretty, make_engine, write_atomic, EXIT_SUCCESS};
use nbstack_core::Config;
use std::path::Path;

pub fn run(
    config: Config,
    dockerfile: &Path,
    output: Option<&Path>,
    force: bool,
    json: bool,
) -> Result<u8, String> {
    if let Some(dest) = output {
        if dest.exists() && !force {
            return Err(format!(
                "refusing to overwrite existing {} (pass --force)",
                dest.display()
            ));
        }
    }

    let engine = make_engine(config)?;
    let manifest = engine.import(dockerfile).map_err(|e| e.to_string())?;
    let toml = manifest.to_toml().map_err(|e| e.to_string())?;

    match output {
        Some(dest) => {
            write_atomic(dest, &toml)?;
            if json {
                let payload = serde_json::json!({
                    "status": "written",
                    "path": dest.display().to_string(),
                    "package_groups": manifest.package_groups.len(),
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!(
                    "wrote {} ({} package group(s))",
                    dest.display(),
                    manifest.package_groups.len()
                );
            }
        }
        None if json => println!("{}", json_pretty(&manifest)?),
        None => print!("{toml}"),
    }
    Ok(EXIT_SUCCESS)
}
