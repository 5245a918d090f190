//! Daemon client driving the `docker` or `podman` command line
//!
//! Both CLIs share the `image inspect` and `save` subcommands, so one
//! implementation serves either.

use crate::daemon::{DaemonClient, ExportStream, ImageInspect};
use crate::error::{LayerError, LayerResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Container daemon reached through its CLI
#[derive(Debug, Clone)]
pub struct CliDaemonClient {
    command: String,
}

/// Subset of `image inspect` output
#[derive(Debug, Deserialize)]
struct InspectOutput {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Size", default)]
    size: Option<u64>,
    #[serde(rename = "VirtualSize", default)]
    virtual_size: Option<u64>,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
}

impl CliDaemonClient {
    /// Create a client invoking `command` (e.g. `docker` or `podman`)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn spawn_error(&self, args: &[&str], err: io::Error) -> LayerError {
        if err.kind() == io::ErrorKind::NotFound {
            LayerError::DaemonCliNotFound {
                name: self.command.clone(),
            }
        } else {
            LayerError::io(format!("running {} {:?}", self.command, args), err)
        }
    }

    /// Execute a command and return the output
    async fn exec(&self, args: &[&str]) -> LayerResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.command, args);

        Command::new(&self.command)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))
    }
}

#[async_trait]
impl DaemonClient for CliDaemonClient {
    async fn inspect(&self, image: &str) -> LayerResult<ImageInspect> {
        let output = self
            .exec(&["image", "inspect", "--format", "{{json .}}", image])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LayerError::upstream(
                format!("unable to inspect image {}", image),
                stderr.trim(),
            ));
        }

        parse_inspect(&output.stdout)
            .map_err(|e| LayerError::upstream(format!("unable to inspect image {}", image), e))
    }

    async fn save(&self, images: &[String]) -> LayerResult<Box<dyn ExportStream>> {
        let mut args = vec!["save"];
        args.extend(images.iter().map(String::as_str));
        info!("Saving image: {}", images.join(" "));

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(&args, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LayerError::upstream("unable to save image tar", "stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LayerError::upstream("unable to save image tar", "stderr not captured"))?;

        // drain stderr concurrently so a chatty daemon cannot stall the export
        let stderr = tokio::spawn(async move {
            let mut collected = String::new();
            let _ = stderr.read_to_string(&mut collected).await;
            collected
        });

        Ok(Box::new(ChildExport {
            child,
            stdout,
            stderr,
        }))
    }

    fn daemon_name(&self) -> &str {
        &self.command
    }
}

fn parse_inspect(stdout: &[u8]) -> Result<ImageInspect, String> {
    // `podman image inspect --format` may wrap the object in an array
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    let output: InspectOutput = if text.starts_with('[') {
        serde_json::from_str::<Vec<InspectOutput>>(text)
            .map_err(|e| e.to_string())?
            .into_iter()
            .next()
            .ok_or_else(|| "empty inspect output".to_string())?
    } else {
        serde_json::from_str(text).map_err(|e| e.to_string())?
    };

    let virtual_size = output
        .virtual_size
        .or(output.size)
        .ok_or_else(|| "inspect output has no size".to_string())?;

    Ok(ImageInspect {
        id: output.id,
        virtual_size,
        repo_tags: output.repo_tags.unwrap_or_default(),
    })
}

/// Stdout of a running `save` process
struct ChildExport {
    child: Child,
    stdout: ChildStdout,
    stderr: JoinHandle<String>,
}

impl AsyncRead for ChildExport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

#[async_trait]
impl ExportStream for ChildExport {
    async fn close(self: Box<Self>) -> LayerResult<()> {
        let ChildExport {
            mut child,
            stdout,
            stderr,
        } = *self;
        drop(stdout);

        let status = child
            .wait()
            .await
            .map_err(|e| LayerError::io("waiting for image save", e))?;
        let stderr = stderr.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(LayerError::upstream(
                "unable to save image tar",
                format!("exit status {}: {}", status, stderr.trim()),
            ))
        }
    }
}
