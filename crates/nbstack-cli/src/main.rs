mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{EXIT_BUILD_ERROR, EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use nbstack_core::{install_signal_handler, BuildOptions, Config};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "nbstack",
    version,
    about = "Declarative package manifests for Jupyter notebook images"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// Config file to use instead of ~/.config/nbstack/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Dockerfile,
    Commands,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build a notebook image from a manifest.
    Build {
        /// Path to manifest TOML file.
        #[arg(default_value = "nbstack.toml")]
        manifest: PathBuf,
        /// Tag for the built image (overrides output.tag).
        #[arg(long)]
        tag: Option<String>,
        /// Image builder: docker, podman, or mock.
        #[arg(long)]
        builder: Option<String>,
        /// Do not use the builder's layer cache.
        #[arg(long, default_value_t = false)]
        no_cache: bool,
        /// Always pull a newer version of the base image.
        #[arg(long, default_value_t = false)]
        pull: bool,
        /// Render and report without building.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Skip the build if the tag already holds an image of this manifest.
        #[arg(long, default_value_t = false)]
        skip_existing: bool,
        /// Hide the builder's own output.
        #[arg(short, long, default_value_t = false)]
        quiet: bool,
    },
    /// Print the Dockerfile or shell commands a manifest renders to.
    Render {
        /// Path to manifest TOML file.
        #[arg(default_value = "nbstack.toml")]
        manifest: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderFormat::Dockerfile)]
        format: RenderFormat,
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a manifest parses and normalizes.
    Validate {
        /// Path to manifest TOML file.
        #[arg(default_value = "nbstack.toml")]
        manifest: PathBuf,
    },
    /// Show a manifest's digest, image tag, and package groups.
    Inspect {
        /// Path to manifest TOML file.
        #[arg(default_value = "nbstack.toml")]
        manifest: PathBuf,
    },
    /// Recover a manifest from an existing Dockerfile.
    Import {
        /// Dockerfile to read.
        dockerfile: PathBuf,
        /// Where to write the manifest (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Write a new nbstack.toml, from a preset or interactively.
    New {
        /// Built-in preset to start from (see `nbstack presets`).
        #[arg(long)]
        preset: Option<String>,
        /// Overwrite an existing nbstack.toml.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List built-in presets.
    Presets,
    /// Check that the configured builder is usable.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("NBSTACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Build {
            manifest,
            tag,
            builder,
            no_cache,
            pull,
            dry_run,
            skip_existing,
            quiet,
        } => {
            let config = match builder {
                Some(b) => config.with_builder(&b),
                None => config,
            };
            commands::build::run(
                config,
                &manifest,
                &BuildOptions {
                    tag,
                    no_cache,
                    pull,
                    dry_run,
                    skip_existing,
                    quiet,
                },
                json_output,
            )
        }
        Commands::Render {
            manifest,
            format,
            output,
        } => commands::render::run(config, &manifest, format, output.as_deref()),
        Commands::Validate { manifest } => commands::validate::run(config, &manifest, json_output),
        Commands::Inspect { manifest } => commands::inspect::run(config, &manifest, json_output),
        Commands::Import {
            dockerfile,
            output,
            force,
        } => commands::import::run(config, &dockerfile, output.as_deref(), force, json_output),
        Commands::New { preset, force } => {
            commands::new::run(preset.as_deref(), force, json_output)
        }
        Commands::Presets => commands::presets::run(json_output),
        Commands::Doctor => commands::doctor::run(&config, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let config = match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
    .map_err(|e| e.to_string())?
    .with_env_overrides();
    tracing::debug!(
        "builder '{}', tag prefix '{}'",
        config.builder,
        config.tag_prefix
    );
    Ok(config)
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest error:")
        || msg.starts_with("Dockerfile parse error:")
        || msg.starts_with("failed to parse manifest")
        || msg.starts_with("failed to read manifest")
    {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("build error:") || msg.starts_with("interrupted") {
        EXIT_BUILD_ERROR
    } else {
        EXIT_FAILURE
    }
}
