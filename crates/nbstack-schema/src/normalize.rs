use crate::identity::ManifestIdentity;
use crate::manifest::{GroupSection, ManifestError, ManifestV1};
use crate::package::{PackageGroup, PackageSpec};
use crate::reference::{has_digest, validate_image_reference};
use crate::types::ImageTag;
use serde::{Deserialize, Serialize};

/// Characters that would end or escape the double-quoted `fix-permissions` argument.
const UNSAFE_PATH_CHARS: &[char] = &['"', '\\', '`', '\n', '\r'];

/// Validated representation of a parsed manifest.
///
/// Unlike most canonical forms, groups and packages keep their declared order:
/// later groups may rely on what earlier ones installed. Only whitespace,
/// version spelling, and exact duplicates are normalized away. This is the
/// input to identity hashing and rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedManifest {
    pub manifest_version: u32,
    pub base_image: String,
    pub output_tag: Option<String>,
    pub fix_permissions: Vec<String>,
    pub package_groups: Vec<PackageGroup>,
}

impl ManifestV1 {
    /// Normalize the manifest: validate fields, canonicalize constraints, keep order.
    pub fn normalize(&self) -> Result<NormalizedManifest, ManifestError> {
        if self.manifest_version != 1 {
            return Err(ManifestError::UnsupportedVersion(self.manifest_version));
        }

        let base_image = self.base.image.trim().to_owned();
        if base_image.is_empty() {
            return Err(ManifestError::EmptyBaseImage);
        }
        check_reference(&base_image)?;

        let output_tag = match self.output.tag.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tag) => {
                check_reference(tag)?;
                if has_digest(tag) {
                    return Err(ManifestError::DigestInOutputTag(tag.to_owned()));
                }
                Some(tag.to_owned())
            }
        };

        let mut fix_permissions: Vec<String> = Vec::new();
        for path in &self.postlude.fix_permissions {
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            if path.contains(UNSAFE_PATH_CHARS) {
                return Err(ManifestError::InvalidPostludePath(path.to_owned()));
            }
            if !fix_permissions.iter().any(|p| p == path) {
                fix_permissions.push(path.to_owned());
            }
        }

        let package_groups = self
            .package_groups
            .iter()
            .enumerate()
            .map(|(index, group)| normalize_group(index, group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NormalizedManifest {
            manifest_version: self.manifest_version,
            base_image,
            output_tag,
            fix_permissions,
            package_groups,
        })
    }
}

impl NormalizedManifest {
    pub fn canonical_json(&self) -> String {
        // Plain strings, enums, and vectors only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Tag for the built image: the declared output tag, or `<prefix>:<short_id>`.
    pub fn image_tag(&self, identity: &ManifestIdentity, prefix: &str) -> ImageTag {
        match &self.output_tag {
            Some(tag) => ImageTag::new(tag.clone()),
            None => ImageTag::new(format!("{prefix}:{}", identity.short_id)),
        }
    }

    pub fn package_count(&self) -> usize {
        self.package_groups.iter().map(|g| g.packages.len()).sum()
    }
}

fn check_reference(reference: &str) -> Result<(), ManifestError> {
    validate_image_reference(reference).map_err(|reason| ManifestError::InvalidImageReference {
        reference: reference.to_owned(),
        reason,
    })
}

fn normalize_group(index: usize, group: &GroupSection) -> Result<PackageGroup, ManifestError> {
    let manager = group.manager;

    let channel = match group.channel.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(ch) if ch.chars().any(char::is_whitespace) || ch.contains('"') => {
            return Err(ManifestError::InvalidChannel {
                index,
                channel: ch.to_owned(),
            });
        }
        Some(ch) => Some(ch.to_owned()),
    };

    let mut packages: Vec<PackageSpec> = Vec::with_capacity(group.packages.len());
    for entry in &group.packages {
        let name = entry.name().trim();
        manager
            .check_name(name)
            .map_err(|reason| ManifestError::InvalidPackageName {
                index,
                name: name.to_owned(),
                reason,
            })?;
        let version_constraint = entry.version().and_then(|v| manager.canonical_constraint(v));
        if let Some(constraint) = &version_constraint {
            manager
                .check_constraint(constraint)
                .map_err(|reason| ManifestError::InvalidConstraint {
                    index,
                    name: name.to_owned(),
                    constraint: constraint.clone(),
                    reason,
                })?;
        }
        let spec = PackageSpec {
            name: name.to_owned(),
            version_constraint,
        };

        match packages.iter().find(|p| p.name == spec.name) {
            Some(existing) if *existing == spec => {}
            Some(existing) => {
                let first = existing.requirement(manager);
                let second = spec.requirement(manager);
                return Err(ManifestError::ConflictingConstraint {
                    index,
                    name: spec.name,
                    first,
                    second,
                });
            }
            None => packages.push(spec),
        }
    }

    if packages.is_empty() {
        return Err(ManifestError::EmptyGroup { index, manager });
    }

    Ok(PackageGroup {
        manager,
        channel,
        packages,
    })
}
