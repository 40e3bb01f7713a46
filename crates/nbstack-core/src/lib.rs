//! Orchestration for nbstack.
//!
//! `Engine` ties the schema, renderer, and build backends together: it loads
//! and normalizes a manifest, renders it, and hands the Dockerfile to the
//! configured builder, skipping the build when an image with the same manifest
//! digest already exists. This crate also owns user configuration and Ctrl-C
//! handling.

pub mod concurrency;
pub mod config;
pub mod engine;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use config::{default_config_path, Config, BUILDER_ENV};
pub use engine::{BuildOptions, BuildResult, BuildStatus, Engine, LoadedManifest, RenderedManifest};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] nbstack_schema::ManifestError),
    #[error("Dockerfile parse error: {0}")]
    Parse(#[from] nbstack_render::ParseError),
    #[error("build error: {0}")]
    Build(#[from] nbstack_build::BuildError),
    #[error("config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("interrupted")]
    Interrupted,
}
