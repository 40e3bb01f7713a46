//! Rendering of nbstack manifests into shell commands and Dockerfiles.
//!
//! `render` turns a `NormalizedManifest` into a `RenderPlan`: one step per run
//! of same-manager package groups, each step's install commands followed by
//! that manager's cleanup and permission-fix postlude. `parse_commands` and
//! `parse_dockerfile` go the other way, recovering package groups from
//! rendered (or hand-written) commands.

pub mod parse;
pub mod plan;
pub mod postlude;
pub mod quote;

pub use parse::{parse_commands, parse_dockerfile, ParsedDockerfile};
pub use plan::{install_command, render, RenderPlan, Step};
pub use postlude::postlude;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unterminated quote in: {0}")]
    UnterminatedQuote(String),
    #[error("no FROM instruction before the first RUN")]
    MissingFrom,
    #[error("line {0}: multi-stage Dockerfiles are not supported")]
    MultipleStages(usize),
    #[error("line {0}: exec-form RUN instructions are not supported")]
    ExecFormRun(usize),
    #[error("more than one channel in: {0}")]
    MultipleChannels(String),
    #[error("option '{0}' requires a value")]
    MissingValue(String),
    #[error("install command names no packages: {0}")]
    NoPackages(String),
    #[error("cannot recover packages from '{command}': {reason}")]
    Unsupported {
        command: String,
        reason: &'static str,
    },
}
