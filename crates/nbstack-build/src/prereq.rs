use std::fmt;
use std::process::{Command, Stdio};

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn runs_ok(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn install_hint(builder: &str) -> &'static str {
    match builder {
        "podman" => {
            "zypper install podman | apt install podman | dnf install podman | \
             pacman -S podman"
        }
        _ => {
            "https://docs.docker.com/engine/install/ \
             (or apt install docker.io | dnf install moby-engine)"
        }
    }
}

/// Check prerequisites for building with the named builder.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_builder_prereqs(builder: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if builder == "mock" {
        return missing;
    }

    if !runs_ok(builder, &["--version"]) {
        missing.push(MissingPrereq {
            name: builder.to_owned(),
            purpose: "building container images",
            install_hint: install_hint(builder),
        });
    } else if !runs_ok(builder, &["info"]) {
        missing.push(MissingPrereq {
            name: format!("{builder} service"),
            purpose: "reachable image build service",
            install_hint: if builder == "docker" {
                "start the daemon (systemctl start docker) and make sure your user may \
                 use its socket"
            } else {
                "check `podman info` output; rootless podman needs subuid/subgid ranges"
            },
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str(
        "\nnbstack hands image builds to docker or podman; \
         install one of them or pass --builder.",
    );
    msg
}
