//! Salient-object segmentation with a U²-Net style ONNX model, run by tract.
//!
//! The model takes a `[1, 3, 320, 320]` ImageNet-normalized tensor and returns
//! saliency maps shaped `[1, C, 320, 320]`; the first channel is the mask.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use tracing::{debug, info};
use tract_onnx::prelude::*;

use super::mask::{apply_alpha_mask, mask_from_saliency};
use super::Segmenter;
use crate::error::SegmentError;

type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Square input resolution of the U²-Net family.
const INPUT_SIZE: u32 = 320;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct OnnxSegmenter {
    model: TractModel,
}

impl OnnxSegmenter {
    pub fn load(path: &Path) -> Result<Self> {
        ensure!(path.is_file(), "model file does not exist: {}", path.display());

        info!(?path, input_size = INPUT_SIZE, "loading ONNX segmentation model");
        let side = INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set model input shape")?
            .into_optimized()
            .context("failed to optimize model")?
            .into_runnable()
            .context("failed to create runnable model")?;
        info!(?path, "ONNX segmentation model ready");

        Ok(Self { model })
    }
}

/// Resize to the model input and normalize into an NCHW tensor.
///
/// Pixel values are scaled by the brightest channel value before the
/// ImageNet mean/std normalization.
fn preprocess(image: &RgbImage) -> Tensor {
    let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);
    let peak = resized.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;
    let side = INPUT_SIZE as usize;

    tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        let v = resized.get_pixel(x as u32, y as u32).0[c] as f32 / peak;
        (v - MEAN[c]) / STD[c]
    })
    .into()
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let input = preprocess(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        let output = outputs
            .first()
            .context("model produced no outputs")?
            .to_array_view::<f32>()
            .context("model output is not f32")?;

        let shape = output.shape().to_vec();
        let (h, w) = match shape.as_slice() {
            &[1, _, h, w] => (h, w),
            _ => return Err(SegmentError::OutputShape(shape.clone()).into()),
        };
        debug!(?shape, "model output");

        let scores: Vec<f32> = output.iter().take(h * w).copied().collect();
        let small = mask_from_saliency(&scores, w as u32, h as u32)
            .ok_or(SegmentError::OutputShape(shape))?;
        let mask = imageops::resize(&small, image.width(), image.height(), FilterType::Lanczos3);

        Ok(apply_alpha_mask(image, &mask)?)
    }
}
