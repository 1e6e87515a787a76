use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigError;

const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Locations of external executables, resolved once at startup and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
        }
    }
}

impl ToolPaths {
    /// Use the given ffmpeg path, or fall back to `ffmpeg` on `PATH`.
    pub fn resolve(ffmpeg: Option<PathBuf>) -> Self {
        let tools = match ffmpeg {
            Some(ffmpeg) => Self { ffmpeg },
            None => Self::default(),
        };
        info!(ffmpeg = ?tools.ffmpeg, "tool paths resolved");
        tools
    }

    /// Fail with a configuration error if the ffmpeg executable cannot be found.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.locate_ffmpeg().is_some() {
            Ok(())
        } else {
            Err(ConfigError::MissingExecutable(self.ffmpeg.clone()))
        }
    }

    /// Resolve the ffmpeg path to an existing file, searching `PATH` for bare names.
    pub fn locate_ffmpeg(&self) -> Option<PathBuf> {
        locate(&self.ffmpeg)
    }
}

fn locate(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let search = env::var_os("PATH")?;
    for dir in env::split_paths(&search) {
        for candidate in candidates(&dir, program) {
            if candidate.is_file() {
                debug!(?candidate, "found executable on PATH");
                return Some(candidate);
            }
        }
    }
    None
}

fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let plain = dir.join(program);
    if cfg!(windows) && program.extension().is_none() {
        vec![plain.with_extension("exe"), plain]
    } else {
        vec![plain]
    }
}
