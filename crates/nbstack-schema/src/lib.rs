//! Manifest parsing, normalization, identity, and presets for nbstack.
//!
//! This crate defines the schema layer: TOML manifest parsing (`ManifestV1`),
//! the validated, order-preserving representation (`NormalizedManifest`),
//! package-manager semantics for requirement strings (`PackageManager`),
//! image reference validation, deterministic manifest identity
//! (`compute_identity`), and built-in preset manifests.

pub mod identity;
pub mod manifest;
pub mod normalize;
pub mod package;
pub mod preset;
pub mod reference;
pub mod types;

pub use identity::{compute_identity, ManifestIdentity, DIGEST_LABEL};
pub use manifest::{
    default_fix_permissions, parse_manifest_file, parse_manifest_str, BaseSection, GroupSection,
    ManifestError, ManifestV1, OutputSection, PackageEntry, PinnedPackage, PostludeSection,
};
pub use normalize::NormalizedManifest;
pub use package::{PackageGroup, PackageManager, PackageSpec};
pub use preset::{get_preset, list_presets, Preset, BUILTIN_PRESETS};
pub use reference::validate_image_reference;
pub use types::{ImageId, ImageTag, ManifestDigest, ShortId};
