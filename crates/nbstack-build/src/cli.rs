//! Backend that drives a docker-compatible command-line builder.

use crate::backend::{BuildBackend, BuildSpec, BuiltImage};
use crate::failure::{classify, OutputTail};
use crate::BuildError;
use nbstack_schema::{ImageId, ImageTag};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Mutex;
use tracing::{debug, info};

const TAIL_LINES: usize = 200;

/// Exit status a process reports after SIGINT when run from a shell.
const SIGINT_EXIT: i32 = 130;

#[cfg(unix)]
const SIGINT: i32 = 2;

pub struct CliBackend {
    program: String,
}

impl CliBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn docker() -> Self {
        Self::new("docker")
    }

    pub fn podman() -> Self {
        Self::new("podman")
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn build_command(&self, spec: &BuildSpec) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("build")
            .arg("--tag")
            .arg(spec.tag.as_str())
            .arg("--file")
            .arg("-");
        if spec.no_cache {
            cmd.arg("--no-cache");
        }
        if spec.pull {
            cmd.arg("--pull");
        }
        cmd.arg(&spec.context_dir);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn inspect(&self, tag: &ImageTag, format: &str) -> Result<Option<String>, BuildError> {
        let output = Command::new(&self.program)
            .args(["image", "inspect", "--format", format, tag.as_str()])
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            debug!(
                "{} image inspect {tag} failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if value.is_empty() || value == "<no value>" {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

/// Forward one output stream line by line, keeping a shared tail for diagnostics.
fn pump(stream: impl Read, tail: &Mutex<OutputTail>, echo: bool) {
    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else { break };
        if echo {
            eprintln!("{line}");
        }
        if let Ok(mut tail) = tail.lock() {
            tail.push(line);
        }
    }
}

/// Only SIGINT counts; a builder killed any other way (OOM killer, SIGTERM)
/// failed.
fn interrupted(status: ExitStatus) -> bool {
    if status.code() == Some(SIGINT_EXIT) {
        return true;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal() == Some(SIGINT)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Exit code as a shell would report it: 128 + signal for a killed builder.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    status.code().unwrap_or(-1)
}

impl BuildBackend for CliBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn build(&self, spec: &BuildSpec) -> Result<BuiltImage, BuildError> {
        info!("building {} with {}", spec.tag, self.program);
        let mut child = self.build_command(spec).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::BackendUnavailable(self.program.clone())
            } else {
                BuildError::Io(e)
            }
        })?;

        let tail = Mutex::new(OutputTail::new(TAIL_LINES));
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = !spec.quiet;

        let write_result = std::thread::scope(|s| {
            if let Some(out) = stdout {
                s.spawn(|| pump(out, &tail, echo));
            }
            if let Some(err) = stderr {
                s.spawn(|| pump(err, &tail, echo));
            }
            // Dropping stdin closes it so the builder sees end of file.
            stdin.map_or(Ok(()), |mut input| input.write_all(spec.dockerfile.as_bytes()))
        });

        let status = child.wait()?;
        let output = tail.into_inner().map(|t| t.text()).unwrap_or_default();

        if !status.success() {
            if interrupted(status) {
                return Err(BuildError::Interrupted);
            }
            let kind = classify(&output);
            return Err(BuildError::Failed {
                kind,
                code: exit_code(status),
                output,
            });
        }
        // A builder that exits 0 without reading the Dockerfile is still a failure.
        write_result?;

        let image_id = self
            .inspect(&spec.tag, "{{.Id}}")?
            .ok_or_else(|| BuildError::InspectFailed(spec.tag.to_string()))?;
        info!("built {} ({image_id})", spec.tag);

        Ok(BuiltImage {
            tag: spec.tag.clone(),
            image_id: ImageId::new(image_id),
        })
    }

    fn image_label(&self, tag: &ImageTag, key: &str) -> Result<Option<String>, BuildError> {
        let format = format!("{{{{ index .Config.Labels \"{key}\" }}}}");
        self.inspect(tag, &format)
    }

    fn image_id(&self, tag: &ImageTag) -> Result<Option<ImageId>, BuildError> {
        Ok(self.inspect(tag, "{{.Id}}")?.map(ImageId::new))
    }
}
