use super::{colorize_manager, json_pretty, make_engine, EXIT_SUCCESS};
use nbstack_core::Config;
use std::path::Path;

pub fn run(config: Config, manifest: &Path, json: bool) -> Result<u8, String> {
    let engine = make_engine(config)?;
    let rendered = engine.render(manifest).map_err(|e| e.to_string())?;
    let normalized = &rendered.loaded.normalized;
    let identity = &rendered.loaded.identity;

    if json {
        let payload = serde_json::json!({
            "digest": identity.digest,
            "short_id": identity.short_id,
            "tag": rendered.tag,
            "base_image": normalized.base_image,
            "fix_permissions": normalized.fix_permissions,
            "package_groups": normalized.package_groups,
            "steps": rendered.plan.steps.len(),
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("digest:      {}", identity.digest);
    println!("short_id:    {}", identity.short_id);
    println!("tag:         {}", rendered.tag);
    println!("base_image:  {}", normalized.base_image);
    println!("steps:       {}", rendered.plan.steps.len());
    println!("groups:");
    for (i, group) in normalized.package_groups.iter().enumerate() {
        let channel = group
            .channel
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let packages: Vec<String> = group
            .packages
            .iter()
            .map(|p| p.requirement(group.manager))
            .collect();
        println!(
            "  {i}: {}{channel} {}",
            colorize_manager(group.manager),
            packages.join(" ")
        );
    }
    Ok(EXIT_SUCCESS)
}
