use crate::backend::{BuildBackend, BuildSpec, BuiltImage};
use crate::failure::classify;
use crate::BuildError;
use nbstack_schema::{ImageId, ImageTag};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory backend: "builds" by remembering the Dockerfile under its tag.
pub struct MockBackend {
    images: Mutex<HashMap<String, MockImage>>,
    builds: Mutex<usize>,
    fail_with: Option<String>,
}

#[derive(Debug, Clone)]
struct MockImage {
    id: ImageId,
    dockerfile: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
            builds: Mutex::new(0),
            fail_with: None,
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every build fails with the given builder output.
    pub fn failing(output: impl Into<String>) -> Self {
        Self {
            fail_with: Some(output.into()),
            ..Self::default()
        }
    }

    /// Number of builds actually executed.
    pub fn build_count(&self) -> usize {
        self.builds.lock().map(|n| *n).unwrap_or(0)
    }

    fn poisoned<T>(e: &std::sync::PoisonError<T>) -> BuildError {
        BuildError::Io(std::io::Error::other(format!("mutex poisoned: {e}")))
    }
}

fn label_from_dockerfile(dockerfile: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}=\"");
    dockerfile
        .lines()
        .filter_map(|line| line.trim().strip_prefix("LABEL "))
        .find_map(|rest| rest.trim().strip_prefix(prefix.as_str()))
        .and_then(|value| value.strip_suffix('"'))
        .map(str::to_owned)
}

impl BuildBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn build(&self, spec: &BuildSpec) -> Result<BuiltImage, BuildError> {
        *self.builds.lock().map_err(|e| Self::poisoned(&e))? += 1;

        if let Some(output) = &self.fail_with {
            return Err(BuildError::Failed {
                kind: classify(output),
                code: 1,
                output: output.clone(),
            });
        }

        let seed = format!("mock-image:{}\n{}", spec.tag, spec.dockerfile);
        let digest = blake3::hash(seed.as_bytes());
        let id = ImageId::new(format!("sha256:{}", digest.to_hex()));
        self.images.lock().map_err(|e| Self::poisoned(&e))?.insert(
            spec.tag.to_string(),
            MockImage {
                id: id.clone(),
                dockerfile: spec.dockerfile.clone(),
            },
        );

        Ok(BuiltImage {
            tag: spec.tag.clone(),
            image_id: id,
        })
    }

    fn image_label(&self, tag: &ImageTag, key: &str) -> Result<Option<String>, BuildError> {
        let images = self.images.lock().map_err(|e| Self::poisoned(&e))?;
        Ok(images
            .get(tag.as_str())
            .and_then(|image| label_from_dockerfile(&image.dockerfile, key)))
    }

    fn image_id(&self, tag: &ImageTag) -> Result<Option<ImageId>, BuildError> {
        let images = self.images.lock().map_err(|e| Self::poisoned(&e))?;
        Ok(images.get(tag.as_str()).map(|image| image.id.clone()))
    }
}
