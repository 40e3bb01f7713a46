//! Image build backends for nbstack.
//!
//! Rendering is pure; this crate is where a rendered Dockerfile meets an
//! external builder. It provides the pluggable `BuildBackend` trait with a
//! docker/podman command-line backend and an in-memory mock, prerequisite
//! checks, and classification of builder output into coarse failure kinds.
//! Failures are reported as they happened; nothing here retries.

pub mod backend;
pub mod cli;
pub mod failure;
pub mod mock;
pub mod prereq;

pub use backend::{select_backend, BuildBackend, BuildSpec, BuiltImage, KNOWN_BACKENDS};
pub use cli::CliBackend;
pub use failure::{classify, FailureKind};
pub use mock::MockBackend;
pub use prereq::{check_builder_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("builder '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("{kind} (builder exit code {code}):\n{output}")]
    Failed {
        kind: FailureKind,
        code: i32,
        output: String,
    },
    #[error("image build interrupted")]
    Interrupted,
    #[error("built image '{0}' could not be inspected")]
    InspectFailed(String),
}
