use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info};

use crate::config::ToolPaths;
use crate::error::ConfigError;
use crate::sink::FRAME_FILE_PATTERN;

/// Parameters for reassembling a frame directory into a transparent WebM.
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    pub frames_dir: PathBuf,
    pub output: PathBuf,
    pub fps: f64,
    /// Target video bitrate in ffmpeg syntax, e.g. `2000k`.
    pub bitrate: String,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("public/frames"),
            output: PathBuf::from("public/output_transparent.webm"),
            fps: 30.0,
            bitrate: "2000k".to_string(),
        }
    }
}

/// Outcome of a successful encoder run.
#[derive(Debug)]
pub struct EncodeReport {
    pub output: PathBuf,
    /// Everything the encoder wrote to stderr (progress and stream summary).
    pub diagnostics: String,
}

/// Encoder arguments: numbered PNG input, VP9 with alpha, fixed bitrate, overwrite.
pub fn encode_args(config: &EncodeConfig) -> Vec<OsString> {
    let pattern = config.frames_dir.join(FRAME_FILE_PATTERN);
    let mut args: Vec<OsString> = vec![
        "-framerate".into(),
        format_fps(config.fps).into(),
        "-i".into(),
        pattern.into_os_string(),
    ];
    args.extend(
        [
            "-c:v",
            "libvpx-vp9",
            "-pix_fmt",
            "yuva420p",
            "-b:v",
            config.bitrate.as_str(),
            "-y",
        ]
        .map(OsString::from),
    );
    args.push(config.output.clone().into_os_string());
    args
}

fn format_fps(fps: f64) -> String {
    if fps.fract() == 0.0 {
        format!("{}", fps as u64)
    } else {
        format!("{fps}")
    }
}

/// Run the encoder once over `frames_dir/output-%03d.png`.
///
/// A non-zero exit is an error carrying the encoder's stderr.
pub fn encode_transparent_video(tools: &ToolPaths, config: &EncodeConfig) -> Result<EncodeReport> {
    if !config.frames_dir.is_dir() {
        return Err(ConfigError::MissingFramesDir(config.frames_dir.clone()).into());
    }
    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let args = encode_args(config);
    info!(
        ffmpeg = ?tools.ffmpeg,
        frames_dir = ?config.frames_dir,
        output = ?config.output,
        fps = config.fps,
        bitrate = %config.bitrate,
        "encoding transparent video"
    );
    debug!(?args, "encoder arguments");

    let output = Command::new(&tools.ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| {
            format!("failed to run {} — is ffmpeg installed?", tools.ffmpeg.display())
        })?;

    let diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        error!(status = %output.status, %diagnostics, "encoder failed");
        bail!("encoder exited with {}: {diagnostics}", output.status);
    }

    debug!(%diagnostics, "encoder diagnostics");
    info!(output = ?config.output, "transparent video created");

    Ok(EncodeReport {
        output: config.output.clone(),
        diagnostics,
    })
}
