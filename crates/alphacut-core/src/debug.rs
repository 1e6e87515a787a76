use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::segment::mask::{alpha_channel, foreground_ratio};

const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "C:\\Windows\\Fonts\\consola.ttf",
];

const TEXT_SCALE: f32 = 28.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 64, 64]);
const BOX_COLOR: Rgb<u8> = Rgb([64, 255, 64]);
const TEXT_LINE_HEIGHT: i32 = 30;

/// Alpha at or above this counts as foreground for the bounding box.
const FOREGROUND_ALPHA: u8 = 128;

pub fn mask_file_name(index: u32) -> String {
    format!("mask-{index:03}.png")
}

/// Renders the alpha mask of a segmented frame with the foreground bounding
/// box and a short text header.
pub struct MaskDebugRenderer {
    font: Option<FontVec>,
}

impl MaskDebugRenderer {
    pub fn new() -> Self {
        let font = FONT_PATHS.iter().find_map(|p| Self::load_font(Path::new(p)));
        if font.is_none() {
            warn!("no debug font found, mask overlays will have no text");
        }
        Self { font }
    }

    pub fn with_font(path: &Path) -> Self {
        Self {
            font: Self::load_font(path),
        }
    }

    pub fn render(&self, segmented: &RgbaImage, index: u32) -> RgbImage {
        let mut img = DynamicImage::ImageLuma8(alpha_channel(segmented)).into_rgb8();

        if let Some(rect) = foreground_bounds(segmented) {
            draw_hollow_rect_mut(&mut img, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let scale = PxScale::from(TEXT_SCALE);
            let ratio = foreground_ratio(segmented);
            draw_text_mut(&mut img, TEXT_COLOR, 10, 10, scale, font, &format!("F:{index}"));
            let fg = format!("fg:{:.1}%", ratio * 100.0);
            draw_text_mut(&mut img, TEXT_COLOR, 10, 10 + TEXT_LINE_HEIGHT, scale, font, &fg);
        }

        img
    }

    pub fn save_mask(&self, segmented: &RgbaImage, index: u32, dir: &Path) -> Result<PathBuf> {
        let img = self.render(segmented, index);
        let path = dir.join(mask_file_name(index));
        img.save(&path)
            .with_context(|| format!("failed to save debug mask to {}", path.display()))?;

        debug!(?path, "saved debug mask");
        Ok(path)
    }

    fn load_font(path: &Path) -> Option<FontVec> {
        let data = std::fs::read(path).ok()?;
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(?path, "loaded debug font");
                Some(font)
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to parse font file");
                None
            }
        }
    }
}

impl Default for MaskDebugRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest rectangle containing every foreground pixel, or None if there is none.
fn foreground_bounds(image: &RgbaImage) -> Option<Rect> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in image.enumerate_pixels() {
        if p.0[3] < FOREGROUND_ALPHA {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| {
        Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1)
    })
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn segmented() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(8, 6, Rgba([0, 0, 0, 0]));
        for y in 2..4 {
            for x in 3..6 {
                img.put_pixel(x, y, Rgba([200, 10, 10, 255]));
            }
        }
        img
    }

    #[test]
    fn bounds_cover_foreground() {
        let rect = foreground_bounds(&segmented()).unwrap();
        assert_eq!((rect.left(), rect.top()), (3, 2));
        assert_eq!((rect.width(), rect.height()), (3, 2));
    }

    #[test]
    fn no_foreground_no_bounds() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 10]));
        assert!(foreground_bounds(&img).is_none());
    }

    #[test]
    fn render_without_font_shows_mask_and_box() {
        let renderer = MaskDebugRenderer { font: None };
        let img = renderer.render(&segmented(), 0);
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        // Box outline sits on the foreground edge.
        assert_eq!(*img.get_pixel(3, 2), BOX_COLOR);
        assert_eq!(img.get_pixel(4, 2).0, BOX_COLOR.0);
    }

    #[test]
    fn unreadable_font_is_skipped() {
        let renderer = MaskDebugRenderer::with_font(Path::new("/no/such/font.ttf"));
        assert!(renderer.font.is_none());
    }

    #[test]
    fn save_mask_writes_numbered_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MaskDebugRenderer { font: None };
        let path = renderer.save_mask(&segmented(), 12, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("mask-012.png"));
        assert!(path.is_file());
    }
}
