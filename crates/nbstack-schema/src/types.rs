//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Full 64-character blake3 hex digest of a normalized manifest.
    ManifestDigest
);

string_newtype!(
    /// Truncated 12-character prefix of a [`ManifestDigest`], used for display and default tags.
    ShortId
);

string_newtype!(
    /// Image reference the build result is tagged with (`name[:tag]`).
    ImageTag
);

string_newtype!(
    /// Content identifier reported by the image builder (usually `sha256:...`).
    ImageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_display_and_as_ref() {
        let d = ManifestDigest::new("abc123");
        assert_eq!(d.to_string(), "abc123");
        assert_eq!(d.as_str(), "abc123");
        assert_eq!(AsRef::<str>::as_ref(&d), "abc123");
    }

    #[test]
    fn image_tag_serializes_as_plain_string() {
        let tag = ImageTag::new("nbstack:deadbeef0000");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"nbstack:deadbeef0000\"");
        let back: ImageTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn image_id_into_inner() {
        let id = ImageId::new("sha256:0123".to_owned());
        assert_eq!(id.into_inner(), "sha256:0123");
    }

    #[test]
    fn short_id_compares_with_str() {
        let sid = ShortId::from("abc123def456");
        assert_eq!(sid, "abc123def456");
        assert!(sid.starts_with("abc"));
    }
}
