use image::{GrayImage, Luma, Rgba, RgbImage, RgbaImage};

use crate::error::SegmentError;

/// Combine an RGB frame with a same-sized alpha mask (0 = background, 255 = foreground).
pub fn apply_alpha_mask(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage, SegmentError> {
    if image.dimensions() != mask.dimensions() {
        return Err(SegmentError::MaskSizeMismatch {
            image_w: image.width(),
            image_h: image.height(),
            mask_w: mask.width(),
            mask_h: mask.height(),
        });
    }

    let mut out = RgbaImage::new(image.width(), image.height());
    for ((dst, src), alpha) in out.pixels_mut().zip(image.pixels()).zip(mask.pixels()) {
        let [r, g, b] = src.0;
        *dst = Rgba([r, g, b, alpha.0[0]]);
    }
    Ok(out)
}

/// Build a mask from raw saliency scores in row-major order, min-max normalized to 0..=255.
///
/// A constant score map carries no foreground information and becomes fully transparent.
pub fn mask_from_saliency(scores: &[f32], width: u32, height: u32) -> Option<GrayImage> {
    if scores.len() != width as usize * height as usize {
        return None;
    }

    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let pixels = scores
        .iter()
        .map(|&v| {
            if range > f32::EPSILON {
                (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(width, height, pixels)
}

/// Fraction of pixels whose alpha is at least half opaque.
pub fn foreground_ratio(image: &RgbaImage) -> f64 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let opaque = image.pixels().filter(|p| p.0[3] >= 128).count() as u64;
    opaque as f64 / total as f64
}

/// Extract the alpha channel as a grayscale image.
pub fn alpha_channel(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[3]])
    })
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn alpha_comes_from_mask_and_color_is_kept() {
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 200]).unwrap();
        let out = apply_alpha_mask(&image, &mask).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(out.get_pixel(1, 0).0, [10, 20, 30, 200]);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let image = RgbImage::new(4, 2);
        let mask = GrayImage::new(2, 4);
        let err = apply_alpha_mask(&image, &mask).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::MaskSizeMismatch { image_w: 4, image_h: 2, mask_w: 2, mask_h: 4 }
        ));
    }

    #[test]
    fn saliency_is_min_max_normalized() {
        let mask = mask_from_saliency(&[-2.0, 0.0, 2.0, 1.0], 2, 2).unwrap();
        assert_eq!(mask.as_raw(), &vec![0, 128, 255, 191]);
    }

    #[test]
    fn flat_saliency_is_transparent() {
        let mask = mask_from_saliency(&[0.7; 6], 3, 2).unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn saliency_length_must_match() {
        assert!(mask_from_saliency(&[0.0; 5], 3, 2).is_none());
    }

    #[test]
    fn ratio_counts_mostly_opaque_pixels() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 128]));
        image.put_pixel(0, 1, Rgba([0, 0, 0, 127]));
        assert_eq!(foreground_ratio(&image), 0.5);
        assert_eq!(alpha_channel(&image).as_raw(), &vec![255, 128, 127, 0]);
    }
}
