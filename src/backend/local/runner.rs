// src/backend/local/runner.rs

//! Tools process runner.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::events::{Channel, ImportEvent};

/// A parse job handed to [`run_import`].
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub request_id: String,
    pub tools_path: String,
    pub input_path: String,
    pub output_path: String,
}

/// Captured result of a synchronous tools invocation.
#[derive(Debug, Clone)]
pub struct CapturedRun {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedRun {
    /// Best human-readable failure reason: the last stderr line, else the
    /// exit code.
    pub fn failure_message(&self, tools_path: &str) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{tools_path} exited with code {}", self.code))
    }
}

fn tools_command(tools_path: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(tools_path);
    cmd.args(args);
    cmd
}

/// Run the tools executable to completion and capture its output.
pub async fn run_captured(tools_path: &str, args: &[&str]) -> Result<CapturedRun> {
    debug!(tools = tools_path, ?args, "running tools command");

    let output = tools_command(tools_path, args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to spawn {tools_path}"))?;

    let run = CapturedRun {
        success: output.status.success(),
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(
        tools = tools_path,
        ?args,
        exit_code = run.code,
        success = run.success,
        "tools command exited"
    );

    Ok(run)
}

/// Run a parse job, streaming output lines as progress events and
/// publishing exactly one completion event.
///
/// If the cancel channel fires, the child process is killed and **no**
/// completion is published for that request; the controller has already
/// settled the session locally.
pub async fn run_import(
    job: ImportJob,
    channel: Channel<ImportEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let request_id = job.request_id.clone();
    if let Err(err) = run_import_inner(job, &channel, cancel_rx).await {
        error!(request_id = %request_id, error = %err, "import execution error");
        channel.publish(ImportEvent::Completed {
            request_id,
            success: false,
            project_id: None,
            error: Some(format!("{err:#}")),
        });
    }
}

async fn run_import_inner(
    job: ImportJob,
    channel: &Channel<ImportEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    info!(
        request_id = %job.request_id,
        input = %job.input_path,
        output = %job.output_path,
        "starting parse process"
    );

    let mut cmd = tools_command(
        &job.tools_path,
        &["parser", "parse", "--output", &job.output_path, &job.input_path],
    );
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn {}", job.tools_path))?;

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, &job.request_id, channel.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, &job.request_id, channel.clone()));
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res.with_context(|| {
                format!("Failed to wait for {}", job.tools_path)
            })?;

            // Drain the output readers so every progress line precedes the
            // completion event.
            for reader in readers {
                let _ = reader.await;
            }

            let code = status.code().unwrap_or(-1);
            let success = status.success();

            info!(
                request_id = %job.request_id,
                exit_code = code,
                success,
                "parse process exited"
            );

            channel.publish(ImportEvent::Completed {
                request_id: job.request_id.clone(),
                success,
                project_id: success.then(|| project_id_from_path(&job.output_path)),
                error: (!success)
                    .then(|| format!("{} exited with code {}", job.tools_path, code)),
            });
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(
                        request_id = %job.request_id,
                        "cancellation requested; killing parse process"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(
                            request_id = %job.request_id,
                            error = %e,
                            "failed to kill parse process on cancellation"
                        );
                    }
                }
                Err(e) => {
                    debug!(
                        request_id = %job.request_id,
                        error = %e,
                        "cancel channel closed without explicit cancellation"
                    );
                }
            }
        }
    }

    Ok(())
}

fn forward_lines<R>(
    stream: R,
    request_id: &str,
    channel: Channel<ImportEvent>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let request_id = request_id.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            channel.publish(ImportEvent::Progress {
                request_id: request_id.clone(),
                line: Some(line),
            });
        }
    })
}

/// Project id derived from the output path: its file stem.
pub fn project_id_from_path(output_path: &str) -> String {
    Path::new(output_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(output_path)
        .to_string()
}
