pub mod border_key;
pub mod mask;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use image::{RgbImage, RgbaImage};
use tracing::info;

pub use border_key::BorderKeySegmenter;

/// Background removal for a single frame.
///
/// Implementations are stateless across calls: the same input always yields
/// the same output, and no frame influences another.
pub trait Segmenter {
    fn name(&self) -> &'static str;

    /// Produce a same-sized RGBA image whose alpha marks the foreground.
    fn segment(&self, image: &RgbImage) -> Result<RgbaImage>;
}

/// Which segmenter a run uses.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterKind {
    /// Built-in border color keying, no model required.
    BorderKey {
        tolerance: f32,
        softness: f32,
    },
    /// Salient-object ONNX model (U²-Net family), requires the `onnx` feature.
    Onnx { model: PathBuf },
}

impl Default for SegmenterKind {
    fn default() -> Self {
        let defaults = BorderKeySegmenter::default();
        SegmenterKind::BorderKey {
            tolerance: defaults.tolerance,
            softness: defaults.softness,
        }
    }
}

impl fmt::Display for SegmenterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmenterKind::BorderKey { .. } => write!(f, "border-key"),
            SegmenterKind::Onnx { model } => write!(f, "onnx({})", model.display()),
        }
    }
}

impl SegmenterKind {
    pub fn build(&self) -> Result<Box<dyn Segmenter>> {
        info!(segmenter = %self, "building segmenter");
        match self {
            SegmenterKind::BorderKey {
                tolerance,
                softness,
            } => Ok(Box::new(BorderKeySegmenter {
                tolerance: *tolerance,
                softness: *softness,
                ..BorderKeySegmenter::default()
            })),
            #[cfg(feature = "onnx")]
            SegmenterKind::Onnx { model } => Ok(Box::new(onnx::OnnxSegmenter::load(model)?)),
            #[cfg(not(feature = "onnx"))]
            SegmenterKind::Onnx { .. } => {
                anyhow::bail!("ONNX segmentation requires building with the `onnx` feature")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kind_builds_border_key() {
        let segmenter = SegmenterKind::default().build().unwrap();
        assert_eq!(segmenter.name(), "border-key");
    }

    #[test]
    fn onnx_without_model_file_fails() {
        let kind = SegmenterKind::Onnx {
            model: PathBuf::from("/no/such/u2net.onnx"),
        };
        assert!(kind.build().is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(SegmenterKind::default().to_string(), "border-key");
        let kind = SegmenterKind::Onnx {
            model: PathBuf::from("u2net.onnx"),
        };
        assert_eq!(kind.to_string(), "onnx(u2net.onnx)");
    }
}
