use image::RgbImage;

/// A single decoded video frame with metadata.
pub struct Frame {
    /// The frame's image data, always of the configured geometry.
    pub image: RgbImage,
    /// Position of this frame within the run (0-based), independent of the seek offset.
    pub index: u32,
    /// Seconds from the start of the source video.
    pub timestamp_seconds: f64,
}

/// Maps frame indices to source timestamps.
#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    pub start_seconds: f64,
    pub fps: f64,
}

impl FrameTiming {
    pub fn timestamp(&self, index: u32) -> f64 {
        if self.fps > 0.0 {
            self.start_seconds + index as f64 / self.fps
        } else {
            self.start_seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_offsets_from_start() {
        let t = FrameTiming { start_seconds: 10.0, fps: 30.0 };
        assert_eq!(t.timestamp(0), 10.0);
        assert!((t.timestamp(15) - 10.5).abs() < 1e-9);
    }

    #[test]
    fn timestamp_without_fps_stays_at_start() {
        let t = FrameTiming { start_seconds: 2.0, fps: 0.0 };
        assert_eq!(t.timestamp(100), 2.0);
    }
}
