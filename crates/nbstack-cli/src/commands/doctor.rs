use super::{EXIT_FAILURE, EXIT_SUCCESS};
use nbstack_build::{check_builder_prereqs, format_missing};
use nbstack_core::{default_config_path, Config, Engine};
use std::path::Path;

const DEFAULT_MANIFEST: &str = "nbstack.toml";

pub fn run(config: &Config, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_config(config, &mut checks, &mut all_pass);
    check_builder(config, &mut checks, &mut all_pass);
    check_manifest(config, Path::new(DEFAULT_MANIFEST), &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_config(config: &Config, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match default_config_path() {
        Some(path) if path.exists() => checks.push(Check::info(
            "config",
            &format!("Config file: {}", path.display()),
        )),
        _ => checks.push(Check::info("config", "No config file (using defaults)")),
    }
    match config.validate() {
        Ok(()) => checks.push(Check::pass(
            "config_valid",
            &format!(
                "Builder '{}', tag prefix '{}'",
                config.builder, config.tag_prefix
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("config_valid", &e.to_string()));
        }
    }
}

fn check_builder(config: &Config, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = check_builder_prereqs(&config.builder);
    if missing.is_empty() {
        checks.push(Check::pass(
            "builder_prereqs",
            &format!("Builder '{}' is available", config.builder),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail("builder_prereqs", &format_missing(&missing)));
    }
}

fn check_manifest(config: &Config, path: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if !path.exists() {
        checks.push(Check::info(
            "manifest",
            &format!("No ./{DEFAULT_MANIFEST} in this directory (create one with `nbstack new`)"),
        ));
        return;
    }
    let loaded = Engine::new(config.clone()).and_then(|engine| engine.load(path));
    match loaded {
        Ok(loaded) => checks.push(Check::pass(
            "manifest",
            &format!(
                "./{DEFAULT_MANIFEST} is valid ({})",
                loaded.identity.short_id
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("manifest", &e.to_string()));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("nbstack doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn pass(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "pass",
            message: message.to_owned(),
        }
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "fail",
            message: message.to_owned(),
        }
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self {
            name,
            status: "info",
            message: message.to_owned(),
        }
    }
}
