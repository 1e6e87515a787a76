//! Helpers shared by unit tests.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Solid background with a solid rectangle in the middle third.
pub(crate) fn subject_on_background(
    width: u32,
    height: u32,
    background: [u8; 3],
    subject: [u8; 3],
) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= width / 3 && x < 2 * width / 3 && y >= height / 3 && y < 2 * height / 3;
        if inside {
            Rgb(subject)
        } else {
            Rgb(background)
        }
    })
}

/// Write an executable `sh` script standing in for ffmpeg.
///
/// Another test thread may fork while the script is still open for writing,
/// and until that child execs it holds the write descriptor, so exec of the
/// script fails with ETXTBSY. The descriptor is closed before the first fork
/// that can see it, so once one exec succeeds every later one does too.
#[cfg(unix)]
pub(crate) fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    use std::process::Command;
    use std::time::Duration;

    const ETXTBSY: i32 = 26;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(
        &path,
        format!("#!/bin/sh\n[ \"$1\" = --ready ] && exit 0\n{body}\n"),
    )
    .unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();

    for _ in 0..200 {
        match Command::new(&path).arg("--ready").status() {
            Ok(status) => {
                assert!(status.success(), "stub ffmpeg readiness check failed: {status}");
                return path;
            }
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => panic!("failed to run stub ffmpeg: {e}"),
        }
    }
    panic!("stub ffmpeg stayed busy: {}", path.display());
}

#[cfg(unix)]
mod tests {
    use super::*;

    #[test]
    fn fake_ffmpeg_is_runnable_from_many_threads() {
        let dirs: Vec<_> = (0..8).map(|_| tempfile::tempdir().unwrap()).collect();
        std::thread::scope(|scope| {
            for dir in &dirs {
                scope.spawn(|| {
                    let fake = fake_ffmpeg(dir.path(), "exit 3");
                    let status = std::process::Command::new(fake).status().unwrap();
                    assert_eq!(status.code(), Some(3));
                });
            }
        });
    }
}
