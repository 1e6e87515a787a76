use std::ffi::OsString;
use std::io;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, ToolPaths};

/// Decoder arguments: seek, drop audio, scale to the configured size, raw rgb24 on stdout.
pub fn decode_args(config: &PipelineConfig) -> Vec<OsString> {
    let size = format!("{}x{}", config.geometry.width, config.geometry.height);
    let mut args: Vec<OsString> = vec!["-i".into(), config.input.clone().into_os_string()];
    args.extend(
        [
            "-ss",
            config.start_offset.as_str(),
            "-an",
            "-s",
            size.as_str(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ]
        .map(OsString::from),
    );
    args
}

/// An external process writing a raw frame stream to its stdout.
///
/// The process is torn down exactly once: by [`RawFrameSource::close`], or on
/// drop if `close` was never reached. Teardown closes stdout first so a
/// blocked writer sees a broken pipe, then waits for the process to exit.
pub struct RawFrameSource {
    child: Child,
    label: String,
    closed: bool,
}

impl RawFrameSource {
    /// Spawn ffmpeg decoding `config.input` into raw `rgb24` frames.
    pub fn spawn(tools: &ToolPaths, config: &PipelineConfig) -> Result<Self> {
        let mut command = Command::new(&tools.ffmpeg);
        command.args(decode_args(config));
        debug!(?command, "decoder command");
        Self::from_command(command, "ffmpeg decoder").with_context(|| {
            format!("failed to spawn {} — is ffmpeg installed?", tools.ffmpeg.display())
        })
    }

    /// Spawn any command whose stdout is a raw frame stream.
    ///
    /// stdin and stderr are detached; the diagnostic channel is never consumed.
    /// On unix the process leads its own process group, so a terminal Ctrl-C
    /// reaches only this program and the stream ends through [`Self::close`].
    pub fn from_command(mut command: Command, label: &str) -> Result<Self> {
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {label}"))?;

        info!(pid = child.id(), label, "raw frame source started");

        Ok(Self {
            child,
            label: label.to_string(),
            closed: false,
        })
    }

    /// The raw frame stream. Borrow it for the lifetime of one demuxer.
    pub fn stdout(&mut self) -> Result<&mut ChildStdout> {
        self.child
            .stdout
            .as_mut()
            .with_context(|| format!("{} stdout not available", self.label))
    }

    /// Close the stream and wait for the process to exit.
    pub fn close(mut self) -> Result<ExitStatus> {
        let status = self
            .teardown()
            .with_context(|| format!("failed to wait for {}", self.label))?;
        status.with_context(|| format!("{} was already closed", self.label))
    }

    fn teardown(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.closed {
            return Ok(None);
        }
        self.closed = true;

        drop(self.child.stdout.take());
        let status = self.child.wait()?;

        if status.success() {
            info!(label = %self.label, %status, "raw frame source exited");
        } else {
            warn!(label = %self.label, %status, "raw frame source exited with failure status");
        }
        Ok(Some(status))
    }
}

impl Drop for RawFrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!(label = %self.label, %e, "failed to reap raw frame source");
        }
    }
}
