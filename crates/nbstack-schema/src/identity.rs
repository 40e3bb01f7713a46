use crate::normalize::NormalizedManifest;
use crate::types::{ManifestDigest, ShortId};
use serde::Serialize;

/// Label under which the manifest digest is stamped into built images.
pub const DIGEST_LABEL: &str = "io.nbstack.manifest-digest";

/// Deterministic identity of a manifest, derived from its normalized content.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestIdentity {
    pub digest: ManifestDigest,
    pub short_id: ShortId,
}

/// Hash the normalized manifest.
///
/// Group and package order participate in the hash, so reordering a manifest
/// changes its identity even when the package set is the same.
pub fn compute_identity(normalized: &NormalizedManifest) -> ManifestIdentity {
    let mut hasher = blake3::Hasher::new();

    hasher.update(b"nbstack-manifest-v1\0");
    hasher.update(normalized.canonical_json().as_bytes());

    let hex = hasher.finalize().to_hex().to_string();
    let short = hex[..12].to_owned();

    ManifestIdentity {
        digest: ManifestDigest::new(hex),
        short_id: ShortId::new(short),
    }
}
