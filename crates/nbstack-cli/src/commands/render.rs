use super::{json_pretty, make_engine, write_atomic, EXIT_SUCCESS};
use crate::RenderFormat;
use nbstack_core::Config;
use std::path::Path;

pub fn run(
    config: Config,
    manifest: &Path,
    format: RenderFormat,
    output: Option<&Path>,
) -> Result<u8, String> {
    let engine = make_engine(config)?;
    let rendered = engine.render(manifest).map_err(|e| e.to_string())?;

    let text = match format {
        RenderFormat::Dockerfile => rendered.dockerfile(),
        RenderFormat::Commands => {
            let mut out = rendered.plan.commands().join("\n");
            out.push('\n');
            out
        }
        RenderFormat::Json => {
            let payload = serde_json::json!({
                "digest": rendered.loaded.identity.digest,
                "short_id": rendered.loaded.identity.short_id,
                "tag": rendered.tag,
                "base_image": rendered.plan.base_image,
                "steps": rendered.plan.steps,
                "commands": rendered.plan.commands(),
            });
            let mut out = json_pretty(&payload)?;
            out.push('\n');
            out
        }
    };

    match output {
        Some(path) => {
            write_atomic(path, &text)?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(EXIT_SUCCESS)
}
