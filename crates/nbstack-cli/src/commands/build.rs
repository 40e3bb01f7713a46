use super::{json_pretty, make_engine, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use nbstack_build::{check_builder_prereqs, format_missing};
use nbstack_core::{BuildOptions, BuildStatus, Config};
use std::path::Path;

pub fn run(
    config: Config,
    manifest: &Path,
    options: &BuildOptions,
    json: bool,
) -> Result<u8, String> {
    let engine = make_engine(config)?;
    if !options.dry_run && std::env::var("NBSTACK_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_builder_prereqs(&engine.config().builder);
        if !missing.is_empty() {
            eprintln!("error: {}", format_missing(&missing));
            return Ok(EXIT_FAILURE);
        }
    }

    // The builder's own progress goes to stderr; a spinner would garble it.
    let pb = if json || !options.quiet || options.dry_run {
        None
    } else {
        Some(spinner("building image..."))
    };

    let result = match engine.build(manifest, options) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                let msg = match r.status {
                    BuildStatus::UpToDate => "image up to date",
                    _ => "image built",
                };
                spin_ok(pb, msg);
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "build failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&result)?);
    } else {
        match result.status {
            BuildStatus::DryRun => {
                print!("{}", result.dockerfile);
                eprintln!("dry run: would build {}", result.tag);
            }
            BuildStatus::UpToDate => {
                eprintln!("{} is up to date ({})", result.tag, result.identity.short_id);
                println!("{}", result.image_ref());
            }
            BuildStatus::Built => {
                eprintln!("built {} ({})", result.tag, result.identity.short_id);
                println!("{}", result.image_ref());
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
