use crate::concurrency::shutdown_requested;
use crate::config::Config;
use crate::CoreError;
use nbstack_build::{select_backend, BuildBackend, BuildError, BuildSpec};
use nbstack_render::{parse_dockerfile, render, RenderPlan};
use nbstack_schema::reference::has_digest;
use nbstack_schema::{
    compute_identity, parse_manifest_file, validate_image_reference, ImageId, ImageTag,
    ManifestError, ManifestIdentity, ManifestV1, NormalizedManifest, DIGEST_LABEL,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Builds notebook images from manifests with the configured backend.
pub struct Engine {
    config: Config,
    backend: Box<dyn BuildBackend>,
}

/// A manifest as read from disk, with its validated form and identity.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: ManifestV1,
    pub normalized: NormalizedManifest,
    pub identity: ManifestIdentity,
}

#[derive(Debug, Clone)]
pub struct RenderedManifest {
    pub loaded: LoadedManifest,
    pub plan: RenderPlan,
    /// Tag the image gets unless the caller overrides it.
    pub tag: ImageTag,
}

impl RenderedManifest {
    pub fn dockerfile(&self) -> String {
        self.plan.to_dockerfile()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Overrides both `output.tag` and the digest-derived default.
    pub tag: Option<String>,
    pub no_cache: bool,
    pub pull: bool,
    /// Render and report without invoking the builder.
    pub dry_run: bool,
    /// Skip the build when the target tag already carries this manifest's digest.
    pub skip_existing: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStatus {
    Built,
    UpToDate,
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub status: BuildStatus,
    #[serde(flatten)]
    pub identity: ManifestIdentity,
    pub tag: ImageTag,
    /// Present only when the builder actually produced an image.
    pub image_id: Option<ImageId>,
    #[serde(skip)]
    pub dockerfile: String,
}

impl BuildResult {
    /// Identifier to report to the user: the image id when one was built,
    /// otherwise the tag.
    pub fn image_ref(&self) -> &str {
        self.image_id
            .as_ref()
            .map_or_else(|| self.tag.as_str(), ImageId::as_str)
    }
}

impl Engine {
    pub fn new(config: Config) -> Result<Self, CoreError> {
        config.validate()?;
        let backend = select_backend(&config.builder)?;
        Ok(Self { config, backend })
    }

    pub fn with_backend(config: Config, backend: Box<dyn BuildBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &dyn BuildBackend {
        self.backend.as_ref()
    }

    pub fn load(&self, manifest_path: &Path) -> Result<LoadedManifest, CoreError> {
        debug!("loading manifest {}", manifest_path.display());
        let manifest = parse_manifest_file(manifest_path)?;
        let normalized = manifest.normalize()?;
        let identity = compute_identity(&normalized);
        debug!(
            "manifest {} has {} group(s), {} package(s)",
            identity.short_id,
            normalized.package_groups.len(),
            normalized.package_count()
        );
        Ok(LoadedManifest {
            manifest,
            normalized,
            identity,
        })
    }

    pub fn render(&self, manifest_path: &Path) -> Result<RenderedManifest, CoreError> {
        let loaded = self.load(manifest_path)?;
        let plan = render(&loaded.normalized);
        let tag = loaded
            .normalized
            .image_tag(&loaded.identity, &self.config.tag_prefix);
        Ok(RenderedManifest { loaded, plan, tag })
    }

    /// Recover a manifest from a Dockerfile. The result is validated before it
    /// is returned, so it always loads back.
    pub fn import(&self, dockerfile_path: &Path) -> Result<ManifestV1, CoreError> {
        let text = std::fs::read_to_string(dockerfile_path)?;
        let parsed = parse_dockerfile(&text)?;
        let manifest = parsed.into_manifest();
        manifest.normalize()?;
        info!(
            "imported {} package group(s) from {}",
            manifest.package_groups.len(),
            dockerfile_path.display()
        );
        Ok(manifest)
    }

    pub fn build(
        &self,
        manifest_path: &Path,
        options: &BuildOptions,
    ) -> Result<BuildResult, CoreError> {
        let rendered = self.render(manifest_path)?;
        let tag = match options.tag.as_deref().map(str::trim) {
            None | Some("") => rendered.tag.clone(),
            Some(tag) => checked_tag(tag)?,
        };
        let dockerfile = rendered.dockerfile();
        let identity = rendered.loaded.identity;

        let result = |status, image_id| BuildResult {
            status,
            identity: identity.clone(),
            tag: tag.clone(),
            image_id,
            dockerfile: dockerfile.clone(),
        };

        if options.dry_run {
            info!("dry run: not building {tag}");
            return Ok(result(BuildStatus::DryRun, None));
        }

        if options.skip_existing {
            let existing = self.backend.image_label(&tag, DIGEST_LABEL)?;
            if existing.as_deref() == Some(identity.digest.as_str()) {
                info!("{tag} is up to date ({})", identity.short_id);
                let image_id = self.backend.image_id(&tag)?;
                return Ok(result(BuildStatus::UpToDate, image_id));
            }
            debug!("{tag} needs a build (existing digest: {existing:?})");
        }

        if shutdown_requested() {
            return Err(CoreError::Interrupted);
        }

        let context = tempfile::tempdir()?;
        let spec = BuildSpec {
            tag: tag.clone(),
            dockerfile: dockerfile.clone(),
            context_dir: context.path().to_path_buf(),
            no_cache: options.no_cache,
            pull: options.pull || self.config.pull,
            quiet: options.quiet,
        };

        info!(
            "building {tag} from {} with {}",
            rendered.loaded.normalized.base_image,
            self.backend.name()
        );
        let built = match self.backend.build(&spec) {
            Ok(built) => built,
            Err(BuildError::Interrupted) => return Err(CoreError::Interrupted),
            Err(_) if shutdown_requested() => return Err(CoreError::Interrupted),
            Err(e) => return Err(e.into()),
        };

        Ok(result(BuildStatus::Built, Some(built.image_id)))
    }
}

fn checked_tag(tag: &str) -> Result<ImageTag, CoreError> {
    validate_image_reference(tag).map_err(|reason| ManifestError::InvalidImageReference {
        reference: tag.to_owned(),
        reason,
    })?;
    if has_digest(tag) {
        return Err(ManifestError::DigestInOutputTag(tag.to_owned()).into());
    }
    Ok(ImageTag::new(tag))
}
