use std::io::Read;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, ToolPaths};
use crate::debug::MaskDebugRenderer;
use crate::segment::Segmenter;
use crate::sink::{recreate_dir, FrameSink};
use crate::video::demux::{FrameDemuxer, FrameRead};
use crate::video::frame::{Frame, FrameTiming};
use crate::video::source::RawFrameSource;

/// How a frame loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The raw stream was exhausted.
    Completed,
    /// `max_frames` frames were written.
    FrameLimit,
    /// The cancel flag was raised between frames.
    Cancelled,
    /// Segmenting or writing frame `index` failed; frames `[0, index)` are on disk.
    Failed { index: u32, message: String },
    /// The raw stream could not be read.
    ReadFailed { message: String },
    /// The stream ended but the decoder exited with a failure status, so the
    /// frames on disk may not cover the whole input.
    DecoderFailed { status: ExitStatus },
}

/// Summary of one extraction run.
#[derive(Debug)]
pub struct RunReport {
    pub frames_written: u32,
    pub outcome: RunOutcome,
    /// Exit status of the decoder, if it could be collected.
    pub decoder_status: Option<ExitStatus>,
}

impl RunReport {
    /// True when the output directory holds a complete contiguous range.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed | RunOutcome::FrameLimit)
    }
}

/// Mask debug images written alongside the frames.
pub struct DebugMasks {
    pub renderer: MaskDebugRenderer,
    pub dir: PathBuf,
}

/// Per-run knobs for [`drive_frames`].
pub struct DriveOptions<'a> {
    pub max_frames: Option<u32>,
    pub cancel: &'a AtomicBool,
    pub debug_masks: Option<&'a DebugMasks>,
}

/// Run one extraction: prepare the output directory, start the decoder,
/// segment and save every frame, then tear the decoder down.
///
/// Configuration, directory and spawn failures return `Err` before any frame
/// is processed. Failures on an individual frame end the run and are reported
/// in [`RunReport::outcome`].
pub fn run_pipeline(
    tools: &ToolPaths,
    config: &PipelineConfig,
    segmenter: &dyn Segmenter,
    cancel: &AtomicBool,
    progress: &mut dyn FnMut(u32),
) -> Result<RunReport> {
    config.validate()?;
    tools.check()?;

    info!(
        input = ?config.input,
        output_dir = ?config.output_dir,
        width = config.geometry.width,
        height = config.geometry.height,
        start_offset = %config.start_offset,
        max_frames = ?config.max_frames,
        segmenter = segmenter.name(),
        "pipeline starting"
    );

    // Masks are cleared first and recreated after the frame wipe, which may
    // remove a mask directory nested inside the output directory.
    if let Some(dir) = &config.debug_masks_dir {
        recreate_dir(dir)?;
    }
    let mut sink = FrameSink::prepare(&config.output_dir)?;

    let debug_masks = match &config.debug_masks_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            info!(?dir, "debug masks directory ready");
            Some(DebugMasks {
                renderer: MaskDebugRenderer::new(),
                dir: dir.clone(),
            })
        }
        None => None,
    };

    let mut source = RawFrameSource::spawn(tools, config)?;

    let timing = FrameTiming {
        start_seconds: config.start_seconds(),
        fps: config.fps,
    };
    let options = DriveOptions {
        max_frames: config.max_frames,
        cancel,
        debug_masks: debug_masks.as_ref(),
    };

    let (frames_written, outcome) = {
        let stdout = source.stdout()?;
        let mut demuxer = FrameDemuxer::new(stdout, config.geometry, timing);
        drive_frames(&mut demuxer, segmenter, &mut sink, &options, progress)
    };

    let decoder_status = match source.close() {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "failed to close decoder");
            None
        }
    };

    let outcome = match (outcome, decoder_status) {
        (RunOutcome::Completed, Some(status)) if !status.success() => {
            RunOutcome::DecoderFailed { status }
        }
        (outcome, _) => outcome,
    };

    let report = RunReport {
        frames_written,
        outcome,
        decoder_status,
    };
    if report.is_success() {
        info!(frames_written, outcome = ?report.outcome, "pipeline complete");
    } else {
        error!(frames_written, outcome = ?report.outcome, "pipeline stopped early");
    }
    Ok(report)
}

/// Pull, segment and persist frames until the stream ends, a limit or
/// cancellation is hit, or a frame fails.
///
/// Returns the number of frames written, which is also the next frame index.
pub fn drive_frames<R: Read>(
    demuxer: &mut FrameDemuxer<R>,
    segmenter: &dyn Segmenter,
    sink: &mut FrameSink,
    options: &DriveOptions<'_>,
    progress: &mut dyn FnMut(u32),
) -> (u32, RunOutcome) {
    let mut frame_index: u32 = 0;

    let outcome = loop {
        if options.cancel.load(Ordering::SeqCst) {
            warn!(frame_index, "cancellation requested, stopping between frames");
            break RunOutcome::Cancelled;
        }
        if options.max_frames.is_some_and(|max| frame_index >= max) {
            info!(frame_index, "frame limit reached");
            break RunOutcome::FrameLimit;
        }

        let frame = match demuxer.next_frame() {
            FrameRead::Frame(frame) => frame,
            FrameRead::Exhausted { trailing_bytes } => {
                // An interrupted decoder also ends its stream early.
                if options.cancel.load(Ordering::SeqCst) {
                    warn!(frame_index, "stream ended after cancellation was requested");
                    break RunOutcome::Cancelled;
                }
                debug!(trailing_bytes, "frame stream exhausted");
                break RunOutcome::Completed;
            }
            FrameRead::Failed(e) => {
                error!(frame_index, error = %e, "frame stream failed");
                break RunOutcome::ReadFailed {
                    message: e.to_string(),
                };
            }
        };

        if let Err(e) = process_frame(&frame, frame_index, segmenter, sink, options.debug_masks) {
            let message = format!("{e:#}");
            error!(frame_index, %message, "frame processing failed, stopping run");
            break RunOutcome::Failed {
                index: frame_index,
                message,
            };
        }

        frame_index += 1;
        debug!(
            frames_written = frame_index,
            timestamp_seconds = frame.timestamp_seconds,
            "processed frame"
        );
        progress(frame_index);
    };

    (frame_index, outcome)
}

fn process_frame(
    frame: &Frame,
    index: u32,
    segmenter: &dyn Segmenter,
    sink: &mut FrameSink,
    debug_masks: Option<&DebugMasks>,
) -> Result<()> {
    let segmented = segmenter
        .segment(&frame.image)
        .with_context(|| format!("segmentation failed on frame {index}"))?;

    if let Some(masks) = debug_masks {
        masks
            .renderer
            .save_mask(&segmented, index, &masks.dir)
            .context("failed to save debug mask")?;
    }

    sink.write(&segmented, index)?;
    Ok(())
}
