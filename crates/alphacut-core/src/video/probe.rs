use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ToolPaths;

/// Written to the report when the prober produced no diagnostic text.
const EMPTY_REPORT: &str = "No stderr";

/// One existence check performed before touching external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    pub what: &'static str,
    pub path: PathBuf,
    pub present: bool,
}

/// Check that the ffmpeg executable and the input video exist, logging each result.
pub fn check_prerequisites(tools: &ToolPaths, input: &Path) -> Vec<Prerequisite> {
    let checks = vec![
        Prerequisite {
            what: "ffmpeg",
            path: tools.ffmpeg.clone(),
            present: tools.locate_ffmpeg().is_some(),
        },
        Prerequisite {
            what: "input video",
            path: input.to_path_buf(),
            present: input.is_file(),
        },
    ];

    for check in &checks {
        if check.present {
            info!(what = check.what, path = ?check.path, "found");
        } else {
            warn!(what = check.what, path = ?check.path, "not found");
        }
    }
    checks
}

/// Run `ffmpeg -i <input>` and save its stream summary to `report`.
///
/// ffmpeg exits non-zero when given no output file; only its stderr matters here.
pub fn write_probe_report(tools: &ToolPaths, input: &Path, report: &Path) -> Result<()> {
    info!(?input, ?report, "probing video metadata");

    let output = Command::new(&tools.ffmpeg)
        .arg("-i")
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .with_context(|| {
            format!("failed to run {} — is ffmpeg installed?", tools.ffmpeg.display())
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.is_empty() {
        EMPTY_REPORT
    } else {
        stderr.as_ref()
    };

    std::fs::write(report, text)
        .with_context(|| format!("failed to write {}", report.display()))?;

    info!(?report, bytes = text.len(), status = %output.status, "probe report written");
    Ok(())
}
