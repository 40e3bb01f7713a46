use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Coarse cause of a failed build, as far as the builder's output reveals it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    PackageNotFound,
    VersionConflict,
    NetworkFailure,
    PermissionDenied,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PackageNotFound => "package not found",
            Self::VersionConflict => "version conflict",
            Self::NetworkFailure => "network failure",
            Self::PermissionDenied => "permission denied",
            Self::Other => "build failed",
        };
        f.write_str(s)
    }
}

// Matched case-insensitively, in table order. pip still ends an offline run
// with "no matching distribution found", so transport errors are checked
// before missing packages. A missing package is otherwise often reported
// alongside a generic HTTP error, so it wins over the remaining tables.
const CONNECTION_FAILURE: &[&str] = &[
    "newconnectionerror",
    "failed to establish a new connection",
    "temporary failure in name resolution",
    "name or service not known",
    "could not resolve host",
    "network is unreachable",
    "connection refused",
    "readtimeouterror",
    "max retries exceeded",
];

const PACKAGE_NOT_FOUND: &[&str] = &[
    "packagesnotfounderror",
    "the following packages are not available from current channels",
    "no matching distribution found",
    "could not find a version that satisfies the requirement",
    "npm err! 404",
    "npm error 404",
    "npm err! code e404",
    "npm error code e404",
    "pull access denied",
    "manifest unknown",
    "repository does not exist",
];

const VERSION_CONFLICT: &[&str] = &[
    "unsatisfiableerror",
    "the following specifications were found to be incompatible",
    "resolutionimpossible",
    "conflicting dependencies",
    "libmambaunsatisfiableerror",
    "eresolve",
    "could not resolve dependency",
];

const NETWORK_FAILURE: &[&str] = &[
    "condahttperror",
    "connection reset",
    "timed out",
    "etimedout",
    "econnreset",
    "enotfound",
    "tls handshake timeout",
];

const PERMISSION_DENIED: &[&str] = &[
    "permission denied",
    "eacces",
    "environmentnotwritableerror",
    "operation not permitted",
    "got permission denied while trying to connect to the docker daemon",
];

pub fn classify(output: &str) -> FailureKind {
    let lower = output.to_lowercase();
    let table: [(&[&str], FailureKind); 5] = [
        (CONNECTION_FAILURE, FailureKind::NetworkFailure),
        (PACKAGE_NOT_FOUND, FailureKind::PackageNotFound),
        (VERSION_CONFLICT, FailureKind::VersionConflict),
        (NETWORK_FAILURE, FailureKind::NetworkFailure),
        (PERMISSION_DENIED, FailureKind::PermissionDenied),
    ];
    table
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map_or(FailureKind::Other, |(_, kind)| *kind)
}

/// Bounded tail of builder output kept for error reports.
#[derive(Debug)]
pub struct OutputTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl OutputTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}
