use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::filter::median_filter;
use tracing::debug;

use super::mask::apply_alpha_mask;
use super::Segmenter;

/// Keys out the dominant border color.
///
/// The background color is the per-channel median of the outermost pixel ring.
/// Pixels within `tolerance` (RGB Euclidean distance) of it become transparent,
/// pixels beyond `tolerance + softness` stay opaque, and the band in between
/// gets a linear alpha ramp. The mask is then median-filtered to drop speckles.
#[derive(Debug, Clone)]
pub struct BorderKeySegmenter {
    pub tolerance: f32,
    pub softness: f32,
    /// Median filter radius in pixels; 0 disables denoising.
    pub denoise_radius: u32,
}

impl Default for BorderKeySegmenter {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            softness: 30.0,
            denoise_radius: 1,
        }
    }
}

impl BorderKeySegmenter {
    fn alpha_for_distance(&self, distance: f32) -> u8 {
        if distance <= self.tolerance {
            0
        } else if self.softness <= 0.0 || distance >= self.tolerance + self.softness {
            255
        } else {
            (((distance - self.tolerance) / self.softness) * 255.0).round() as u8
        }
    }

    fn build_mask(&self, image: &RgbImage, background: Rgb<u8>) -> GrayImage {
        let mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let d = color_distance(*image.get_pixel(x, y), background);
            Luma([self.alpha_for_distance(d)])
        });
        if self.denoise_radius > 0 {
            median_filter(&mask, self.denoise_radius, self.denoise_radius)
        } else {
            mask
        }
    }
}

impl Segmenter for BorderKeySegmenter {
    fn name(&self) -> &'static str {
        "border-key"
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let background = estimate_background(image);
        debug!(background = ?background.0, "estimated background color");
        let mask = self.build_mask(image, background);
        Ok(apply_alpha_mask(image, &mask)?)
    }
}

/// Per-channel median of the image border.
pub fn estimate_background(image: &RgbImage) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Rgb([0, 0, 0]);
    }

    let mut channels: [Vec<u8>; 3] = Default::default();
    let mut push = |x: u32, y: u32| {
        let p = image.get_pixel(x, y);
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(p.0[c]);
        }
    };

    for x in 0..w {
        push(x, 0);
        if h > 1 {
            push(x, h - 1);
        }
    }
    for y in 1..h.saturating_sub(1) {
        push(0, y);
        if w > 1 {
            push(w - 1, y);
        }
    }

    Rgb(channels.map(|mut values| {
        values.sort_unstable();
        values[values.len() / 2]
    }))
}

fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> f32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| {
            let d = x as f32 - y as f32;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
