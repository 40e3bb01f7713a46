//! Reverse of rendering: recover package groups from commands or a Dockerfile.
//!
//! Only install commands carry information; postlude and unrelated commands are
//! skipped. Anything that would make the recovered groups ambiguous (requirement
//! files, several channels in one command) is an error rather than a guess.

use crate::quote::{split_chain, split_words};
use crate::ParseError;
use nbstack_schema::{
    BaseSection, GroupSection, ManifestV1, OutputSection, PackageEntry, PackageGroup,
    PackageManager, PackageSpec, PinnedPackage, PostludeSection,
};
use serde::Serialize;
use tracing::debug;

/// What a Dockerfile declares, in manifest terms.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParsedDockerfile {
    pub base_image: String,
    pub groups: Vec<PackageGroup>,
    pub fix_permissions: Vec<String>,
}

impl ParsedDockerfile {
    pub fn into_manifest(self) -> ManifestV1 {
        ManifestV1 {
            manifest_version: 1,
            base: BaseSection {
                image: self.base_image,
            },
            output: OutputSection::default(),
            postlude: PostludeSection {
                fix_permissions: self.fix_permissions,
            },
            package_groups: self.groups.into_iter().map(group_section).collect(),
        }
    }
}

fn group_section(group: PackageGroup) -> GroupSection {
    GroupSection {
        manager: group.manager,
        channel: group.channel,
        packages: group
            .packages
            .into_iter()
            .map(|p| match p.version_constraint {
                None => PackageEntry::Name(p.name),
                Some(version) => PackageEntry::Pinned(PinnedPackage {
                    name: p.name,
                    version: Some(version),
                }),
            })
            .collect(),
    }
}

/// Recover the package groups from a rendered command sequence, in order.
pub fn parse_commands<S: AsRef<str>>(commands: &[S]) -> Result<Vec<PackageGroup>, ParseError> {
    let mut groups = Vec::new();
    for command in commands {
        let words = split_words(command.as_ref())?;
        if let Some(group) = parse_install(&words)? {
            groups.push(group);
        } else {
            debug!("skipping non-install command: {}", command.as_ref());
        }
    }
    Ok(groups)
}

pub fn parse_dockerfile(text: &str) -> Result<ParsedDockerfile, ParseError> {
    let mut base_image: Option<String> = None;
    let mut groups = Vec::new();
    let mut fix_permissions: Vec<String> = Vec::new();

    for (line_no, instruction) in logical_lines(text) {
        let (keyword, rest) = match instruction.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (instruction.as_str(), ""),
        };
        match keyword.to_ascii_uppercase().as_str() {
            "FROM" => {
                if base_image.is_some() {
                    return Err(ParseError::MultipleStages(line_no));
                }
                let image = rest
                    .split_whitespace()
                    .find(|w| !w.starts_with("--"))
                    .ok_or(ParseError::MissingFrom)?;
                base_image = Some(image.to_owned());
            }
            "RUN" => {
                if base_image.is_none() {
                    return Err(ParseError::MissingFrom);
                }
                if rest.starts_with('[') {
                    return Err(ParseError::ExecFormRun(line_no));
                }
                for command in split_chain(rest)? {
                    let words = split_words(&command)?;
                    if let Some(group) = parse_install(&words)? {
                        groups.push(group);
                    } else if let [cmd, path] = words.as_slice() {
                        if cmd == "fix-permissions" && !fix_permissions.contains(path) {
                            fix_permissions.push(path.clone());
                        }
                    }
                }
            }
            other => debug!("line {line_no}: ignoring {other} instruction"),
        }
    }

    Ok(ParsedDockerfile {
        base_image: base_image.ok_or(ParseError::MissingFrom)?,
        groups,
        fix_permissions,
    })
}

/// Join continuation lines and drop comments; yields (first line number, instruction).
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('#') || (line.is_empty() && current.is_empty()) {
            continue;
        }
        if current.is_empty() {
            start = idx + 1;
        }
        if let Some(body) = line.strip_suffix('\\') {
            current.push_str(body.trim_end());
            current.push(' ');
        } else {
            current.push_str(line);
            out.push((start, std::mem::take(&mut current).trim().to_owned()));
        }
    }
    if !current.trim().is_empty() {
        out.push((start, current.trim().to_owned()));
    }
    out
}

fn is_env_assignment(word: &str) -> bool {
    word.split_once('=').is_some_and(|(name, _)| {
        !name.is_empty()
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Options whose value is a separate word.
fn takes_value(manager: PackageManager, flag: &str) -> bool {
    match manager {
        PackageManager::Conda => matches!(flag, "-n" | "--name" | "-p" | "--prefix"),
        PackageManager::Pip => matches!(
            flag,
            "-t" | "--target" | "--prefix" | "--root" | "--trusted-host"
        ),
        PackageManager::LabExtension => matches!(flag, "--app-dir"),
    }
}

fn parse_install(words: &[String]) -> Result<Option<PackageGroup>, ParseError> {
    let mut env_channel: Option<String> = None;
    let mut rest = words;
    while let Some((first, tail)) = rest.split_first() {
        if !is_env_assignment(first) {
            break;
        }
        if let Some(registry) = first.strip_prefix("NPM_CONFIG_REGISTRY=") {
            env_channel = Some(registry.to_owned());
        }
        rest = tail;
    }

    let words: Vec<&str> = rest.iter().map(String::as_str).collect();
    let (manager, args) = match words.as_slice() {
        ["conda" | "mamba", "install", args @ ..] => (PackageManager::Conda, args),
        ["pip" | "pip3", "install", args @ ..]
        | ["python" | "python3", "-m", "pip", "install", args @ ..] => (PackageManager::Pip, args),
        ["jupyter", "labextension", "install", args @ ..] => (PackageManager::LabExtension, args),
        _ => return Ok(None),
    };
    let command = words.join(" ");

    let mut channel = match manager {
        PackageManager::LabExtension => env_channel,
        _ => None,
    };
    let mut set_channel = |value: &str| -> Result<(), ParseError> {
        if channel.is_some() {
            return Err(ParseError::MultipleChannels(command.clone()));
        }
        channel = Some(value.to_owned());
        Ok(())
    };

    let mut packages = Vec::new();
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        match (manager, arg) {
            (PackageManager::Conda, "-c" | "--channel")
            | (PackageManager::Pip, "--extra-index-url") => {
                let value = iter
                    .next()
                    .copied()
                    .ok_or_else(|| ParseError::MissingValue(arg.to_owned()))?;
                set_channel(value)?;
            }
            (PackageManager::Conda, a) if a.starts_with("--channel=") => {
                set_channel(&a["--channel=".len()..])?;
            }
            (PackageManager::Pip, a) if a.starts_with("--extra-index-url=") => {
                set_channel(&a["--extra-index-url=".len()..])?;
            }
            (PackageManager::Pip, a)
                if matches!(a, "-i" | "--index-url") || a.starts_with("--index-url=") =>
            {
                return Err(ParseError::Unsupported {
                    command: command.clone(),
                    reason: "a replacement package index cannot be expressed as a channel",
                });
            }
            (
                PackageManager::Pip,
                "-r" | "--requirement" | "-c" | "--constraint" | "-e" | "--editable",
            ) => {
                return Err(ParseError::Unsupported {
                    command: command.clone(),
                    reason: "requirement, constraint and editable inputs cannot be recovered",
                });
            }
            (_, a) if a.starts_with('-') => {
                if takes_value(manager, a) {
                    iter.next();
                }
            }
            (_, requirement) => {
                let spec = PackageSpec::from_requirement(manager, requirement);
                packages.push(PackageSpec {
                    name: spec.name.trim().to_owned(),
                    version_constraint: spec
                        .version_constraint
                        .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect()),
                });
            }
        }
    }

    if packages.is_empty() {
        return Err(ParseError::NoPackages(command));
    }
    Ok(Some(PackageGroup {
        manager,
        channel,
        packages,
    }))
}
