use crate::BuildError;
use nbstack_schema::{ImageId, ImageTag};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a backend needs to produce one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSpec {
    pub tag: ImageTag,
    pub dockerfile: String,
    /// Build context directory. Rendered Dockerfiles copy nothing, so an empty
    /// directory is enough.
    pub context_dir: PathBuf,
    pub no_cache: bool,
    pub pull: bool,
    /// Suppress the builder's own progress output.
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuiltImage {
    pub tag: ImageTag,
    pub image_id: ImageId,
}

pub trait BuildBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Build and tag the image described by `spec`.
    fn build(&self, spec: &BuildSpec) -> Result<BuiltImage, BuildError>;

    /// Look up a label on an existing image. `Ok(None)` when either the image
    /// or the label does not exist.
    fn image_label(&self, tag: &ImageTag, key: &str) -> Result<Option<String>, BuildError>;

    /// Id of the image currently holding `tag`, if any.
    fn image_id(&self, tag: &ImageTag) -> Result<Option<ImageId>, BuildError>;
}

pub const KNOWN_BACKENDS: &[&str] = &["docker", "podman", "mock"];

pub fn select_backend(name: &str) -> Result<Box<dyn BuildBackend>, BuildError> {
    match name {
        "docker" => Ok(Box::new(crate::cli::CliBackend::docker())),
        "podman" => Ok(Box::new(crate::cli::CliBackend::podman())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(BuildError::BackendUnavailable(other.to_owned())),
    }
}
