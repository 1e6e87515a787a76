use std::io::{self, Read};

use image::RgbImage;
use tracing::{debug, error, info};

use super::frame::{Frame, FrameTiming};
use crate::config::FrameGeometry;
use crate::error::DemuxError;

/// Result of pulling one frame from a raw stream.
pub enum FrameRead {
    /// A complete frame was read.
    Frame(Frame),
    /// The stream ended. `trailing_bytes` of an incomplete frame were discarded.
    Exhausted { trailing_bytes: usize },
    /// The underlying reader failed.
    Failed(DemuxError),
}

/// Slices a headerless `rgb24` byte stream into frames of a fixed geometry.
pub struct FrameDemuxer<R> {
    reader: R,
    geometry: FrameGeometry,
    timing: FrameTiming,
    frame_bytes: usize,
    frame_count: u32,
    done: bool,
}

impl<R: Read> FrameDemuxer<R> {
    pub fn new(reader: R, geometry: FrameGeometry, timing: FrameTiming) -> Self {
        let frame_bytes = geometry.frame_size();
        debug!(
            width = geometry.width,
            height = geometry.height,
            frame_bytes,
            "frame demuxer created"
        );
        Self {
            reader,
            geometry,
            timing,
            frame_bytes,
            frame_count: 0,
            done: false,
        }
    }

    /// Number of complete frames produced so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Read exactly one frame's worth of bytes, blocking until available or EOF.
    ///
    /// Once `Exhausted` or `Failed` has been returned, every later call returns
    /// `Exhausted { trailing_bytes: 0 }`.
    pub fn next_frame(&mut self) -> FrameRead {
        if self.done {
            return FrameRead::Exhausted { trailing_bytes: 0 };
        }

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match self.reader.read(&mut buf[read..]) {
                Ok(0) => {
                    self.done = true;
                    if read == 0 {
                        info!(total_frames = self.frame_count, "raw stream ended");
                    } else {
                        info!(
                            total_frames = self.frame_count,
                            trailing_bytes = read,
                            expected_bytes = self.frame_bytes,
                            "raw stream ended mid-frame, discarding partial frame"
                        );
                    }
                    return FrameRead::Exhausted {
                        trailing_bytes: read,
                    };
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    error!(frame = self.frame_count, %e, "failed to read from raw stream");
                    return FrameRead::Failed(DemuxError::Read {
                        index: self.frame_count,
                        source: e,
                    });
                }
            }
        }

        let image = match frame_image(self.geometry, self.frame_count, buf) {
            Ok(image) => image,
            Err(e) => {
                self.done = true;
                error!(frame = self.frame_count, %e, "raw buffer does not match frame geometry");
                return FrameRead::Failed(e);
            }
        };

        let index = self.frame_count;
        let timestamp_seconds = self.timing.timestamp(index);
        self.frame_count += 1;

        debug!(index, timestamp_seconds, "demuxed frame");

        FrameRead::Frame(Frame {
            image,
            index,
            timestamp_seconds,
        })
    }
}

/// Wrap one frame's bytes as an image of `geometry`.
fn frame_image(geometry: FrameGeometry, index: u32, buf: Vec<u8>) -> Result<RgbImage, DemuxError> {
    let len = buf.len();
    RgbImage::from_raw(geometry.width, geometry.height, buf).ok_or(DemuxError::Layout {
        index,
        len,
        width: geometry.width,
        height: geometry.height,
    })
}

impl<R: Read> Iterator for FrameDemuxer<R> {
    type Item = Result<Frame, DemuxError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            FrameRead::Frame(frame) => Some(Ok(frame)),
            FrameRead::Exhausted { .. } => None,
            FrameRead::Failed(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TIMING: FrameTiming = FrameTiming {
        start_seconds: 0.0,
        fps: 30.0,
    };

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(4, 2).unwrap()
    }

    fn demuxer(bytes: Vec<u8>) -> FrameDemuxer<Cursor<Vec<u8>>> {
        FrameDemuxer::new(Cursor::new(bytes), geometry(), TIMING)
    }

    /// Reader that hands out at most `chunk` bytes per call, like a pipe.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn exact_multiple_yields_every_frame() {
        let frames: Vec<Frame> = demuxer(vec![7u8; 24 * 3]).map(Result::unwrap).collect();
        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i as u32);
            assert_eq!(frame.image.dimensions(), (4, 2));
            assert_eq!(frame.image.as_raw().len(), 24);
        }
    }

    #[test]
    fn trailing_partial_frame_is_discarded() {
        let mut d = demuxer(vec![1u8; 24 + 10]);
        assert!(matches!(d.next_frame(), FrameRead::Frame(_)));
        assert!(matches!(
            d.next_frame(),
            FrameRead::Exhausted { trailing_bytes: 10 }
        ));
        assert_eq!(d.frame_count(), 1);
    }

    #[test]
    fn count_is_floor_of_length_over_frame_size() {
        for len in [0usize, 1, 23, 24, 25, 47, 48, 100] {
            let count = demuxer(vec![0u8; len]).count();
            assert_eq!(count, len / 24, "stream of {len} bytes");
        }
    }

    #[test]
    fn empty_stream_is_clean_exhaustion() {
        let mut d = demuxer(Vec::new());
        assert!(matches!(
            d.next_frame(),
            FrameRead::Exhausted { trailing_bytes: 0 }
        ));
    }

    #[test]
    fn pixels_are_laid_out_row_major_rgb() {
        let bytes: Vec<u8> = (0..24).collect();
        let frame = demuxer(bytes).next().unwrap().unwrap();
        assert_eq!(frame.image.get_pixel(0, 0).0, [0, 1, 2]);
        assert_eq!(frame.image.get_pixel(1, 0).0, [3, 4, 5]);
        assert_eq!(frame.image.get_pixel(0, 1).0, [12, 13, 14]);
        assert_eq!(frame.image.get_pixel(3, 1).0, [21, 22, 23]);
    }

    #[test]
    fn frames_are_assembled_across_short_reads() {
        let reader = Trickle {
            data: (0..48).collect(),
            pos: 0,
            chunk: 5,
        };
        let frames: Vec<Frame> = FrameDemuxer::new(reader, geometry(), TIMING)
            .map(Result::unwrap)
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].image.get_pixel(0, 0).0, [24, 25, 26]);
    }

    #[test]
    fn read_error_is_distinct_from_exhaustion() {
        let mut d = FrameDemuxer::new(Broken, geometry(), TIMING);
        match d.next_frame() {
            FrameRead::Failed(DemuxError::Read { index, source }) => {
                assert_eq!(index, 0);
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            _ => panic!("expected a read failure"),
        }
        assert!(matches!(
            d.next_frame(),
            FrameRead::Exhausted { trailing_bytes: 0 }
        ));
    }

    #[test]
    fn short_buffer_is_a_layout_error() {
        match frame_image(geometry(), 3, vec![0u8; 23]) {
            Err(DemuxError::Layout { index, len, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 23);
            }
            other => panic!("expected a layout error, got {other:?}"),
        }
        assert!(frame_image(geometry(), 0, vec![0u8; 24]).is_ok());
    }

    #[test]
    fn timestamps_follow_frame_rate() {
        let timing = FrameTiming {
            start_seconds: 10.0,
            fps: 2.0,
        };
        let frames: Vec<Frame> = FrameDemuxer::new(Cursor::new(vec![0u8; 48]), geometry(), timing)
            .map(Result::unwrap)
            .collect();
        assert_eq!(frames[0].timestamp_seconds, 10.0);
        assert_eq!(frames[1].timestamp_seconds, 10.5);
    }
}
