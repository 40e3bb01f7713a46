//! CLI subprocess integration tests.
//!
//! These tests invoke the `nbstack` binary as a subprocess with the mock
//! builder and an isolated HOME, and verify exit codes, stdout content, and
//! JSON output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const IMAGING_MANIFEST: &str = r#"manifest_version = 1

[base]
image = "jupyter/scipy-notebook:2023-10-20"

[[package_groups]]
manager = "conda"
packages = ["pillow"]

[[package_groups]]
manager = "conda"
channel = "orbingol"
packages = ["geomdl"]

[[package_groups]]
manager = "pip"
packages = [{ name = "textblob", version = "0.17.1" }]
"#;

struct Project {
    home: tempfile::TempDir,
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn nbstack(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_nbstack"));
        cmd.current_dir(self.dir.path())
            .env("HOME", self.home.path())
            .env("NBSTACK_BUILDER", "mock")
            .env_remove("NBSTACK_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.nbstack().args(args).output().unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!("stdout is not JSON ({e}): {}", stdout(output));
    })
}

#[test]
fn cli_version_exits_zero() {
    let project = Project::new();
    let output = project.run(&["--version"]);
    assert!(output.status.success(), "nbstack --version must exit 0");
    assert!(stdout(&output).contains("nbstack"));
}

#[test]
fn cli_help_lists_commands() {
    let project = Project::new();
    let output = project.run(&["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["build", "render", "validate", "import", "presets"] {
        assert!(help.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_build_prints_image_id() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["build", "--quiet"]);
    assert!(
        output.status.success(),
        "build must exit 0. stderr: {}",
        stderr(&output)
    );
    assert!(stdout(&output).trim().starts_with("sha256:"));
}

#[test]
fn cli_build_json_reports_identity() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["--json", "build", "--tag", "lumberjacks/imaging:dev"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value = json(&output);
    assert_eq!(value["status"], "built");
    assert_eq!(value["tag"], "lumberjacks/imaging:dev");
    assert_eq!(value["digest"].as_str().unwrap().len(), 64);
    assert_eq!(value["short_id"].as_str().unwrap().len(), 12);
    assert!(value["image_id"].as_str().unwrap().starts_with("sha256:"));
}

#[test]
fn cli_build_dry_run_prints_dockerfile() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["build", "--dry-run"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("FROM jupyter/scipy-notebook:2023-10-20\n"));
    assert!(out.contains("LABEL io.nbstack.manifest-digest="));
    assert!(stderr(&output).contains("dry run"));
}

#[test]
fn cli_build_with_explicit_builder_flag() {
    let project = Project::new();
    let manifest = project.write("custom.toml", IMAGING_MANIFEST);

    let output = project
        .nbstack()
        .env_remove("NBSTACK_BUILDER")
        .args(["build", "--builder", "mock", "--quiet"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn cli_render_commands_in_declared_order() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["render", "--format", "commands"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let lines: Vec<String> = stdout(&output).lines().map(str::to_owned).collect();
    assert_eq!(lines[0], "conda install --quiet --yes pillow");
    assert_eq!(lines[1], "conda install --quiet --yes -c orbingol geomdl");
    assert_eq!(lines[2], "conda clean --all -f -y");
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("conda clean")).count(),
        1,
        "consecutive conda groups share one cleanup block"
    );
    let pip = lines
        .iter()
        .position(|l| l.starts_with("pip install"))
        .unwrap();
    assert!(pip > 2);
    assert_eq!(lines[pip], "pip install --quiet --no-cache-dir textblob==0.17.1");
}

#[test]
fn cli_render_is_deterministic() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let first = project.run(&["render"]);
    let second = project.run(&["render"]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn cli_render_writes_output_file() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["render", "--output", "Dockerfile"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let dockerfile = std::fs::read_to_string(project.path().join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("RUN conda install --quiet --yes pillow && \\\n"));
}

#[test]
fn cli_import_round_trips_rendered_dockerfile() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let render = project.run(&["render", "--output", "Dockerfile"]);
    assert!(render.status.success());
    let import = project.run(&["import", "Dockerfile", "--output", "imported.toml"]);
    assert!(import.status.success(), "stderr: {}", stderr(&import));

    let original = json(&project.run(&["--json", "inspect"]));
    let imported = json(&project.run(&["--json", "inspect", "imported.toml"]));
    assert_eq!(original["digest"], imported["digest"]);
    assert_eq!(original["package_groups"], imported["package_groups"]);
}

#[test]
fn cli_import_refuses_to_overwrite() {
    let project = Project::new();
    project.write("Dockerfile", "FROM jupyter/base-notebook\nRUN pip install scrapy\n");
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["import", "Dockerfile", "--output", "nbstack.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--force"));

    let forced = project.run(&["import", "Dockerfile", "--output", "nbstack.toml", "--force"]);
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));
    let written = std::fs::read_to_string(project.path().join("nbstack.toml")).unwrap();
    assert!(written.contains("jupyter/base-notebook"));
    assert!(written.contains("scrapy"));
}

#[test]
fn cli_import_multi_stage_is_manifest_error() {
    let project = Project::new();
    project.write("Dockerfile", "FROM a AS one\nFROM b\nRUN pip install x\n");
    let output = project.run(&["import", "Dockerfile"]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
}

#[test]
fn cli_validate_reports_counts() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);

    let output = project.run(&["--json", "validate"]);
    assert!(output.status.success());
    let value = json(&output);
    assert_eq!(value["valid"], true);
    assert_eq!(value["package_groups"], 3);
    assert_eq!(value["packages"], 3);
}

#[test]
fn cli_invalid_manifest_exits_two() {
    let project = Project::new();
    project.write(
        "nbstack.toml",
        r#"manifest_version = 1
[base]
image = "jupyter/base-notebook"
[[package_groups]]
manager = "conda"
packages = []
"#,
    );
    let output = project.run(&["validate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("no packages"));
}

#[test]
fn cli_unknown_manager_exits_two() {
    let project = Project::new();
    project.write(
        "nbstack.toml",
        r#"manifest_version = 1
[base]
image = "x"
[[package_groups]]
manager = "apt"
packages = ["git"]
"#,
    );
    let output = project.run(&["build"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_missing_manifest_exits_two() {
    let project = Project::new();
    let output = project.run(&["build"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("failed to read manifest"));
}

#[test]
fn cli_new_from_preset_writes_valid_manifest() {
    let project = Project::new();
    let output = project.run(&["new", "--preset", "scipy-nlp"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(project.path().join("nbstack.toml").exists());

    let validate = project.run(&["validate"]);
    assert!(validate.status.success());

    let again = project.run(&["new", "--preset", "minimal"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("--force"));
}

#[test]
fn cli_new_unknown_preset_fails() {
    let project = Project::new();
    let output = project.run(&["new", "--preset", "scipy-gis"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown preset"));
}

#[test]
fn cli_presets_json_lists_builtins() {
    let project = Project::new();
    let output = project.run(&["--json", "presets"]);
    assert!(output.status.success());
    let value = json(&output);
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"minimal"));
    assert!(names.contains(&"scipy-scraping"));
}

#[test]
fn cli_config_file_sets_tag_prefix() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);
    let config = project.write(
        "config.json",
        r#"{ "builder": "mock", "tag_prefix": "lumberjacks/notebooks" }"#,
    );

    let output = project
        .nbstack()
        .arg("--config")
        .arg(&config)
        .args(["--json", "build", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value = json(&output);
    assert_eq!(value["status"], "dry-run");
    assert!(value["tag"]
        .as_str()
        .unwrap()
        .starts_with("lumberjacks/notebooks:"));
}

#[test]
fn cli_invalid_config_exits_one() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);
    let config = project.write("config.json", r#"{ "builder": "kaniko" }"#);

    let output = project
        .nbstack()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config error"));
}

#[test]
fn cli_doctor_with_mock_builder_is_healthy() {
    let project = Project::new();
    project.write("nbstack.toml", IMAGING_MANIFEST);
    let output = project.run(&["--json", "doctor"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert_eq!(json(&output)["healthy"], true);
}

#[test]
fn cli_completions_bash() {
    let project = Project::new();
    let output = project.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("nbstack"));
}

#[test]
fn cli_man_pages_written() {
    let project = Project::new();
    let output = project.run(&["man-pages", "man"]);
    assert!(output.status.success());
    assert!(project.path().join("man/nbstack.1").exists());
    assert!(project.path().join("man/nbstack-build.1").exists());
}
