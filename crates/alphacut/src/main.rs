mod cli;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use alphacut_core::config::{FrameGeometry, PipelineConfig, ToolPaths};
use alphacut_core::pipeline::{self, RunReport};
use alphacut_core::segment::SegmenterKind;
use alphacut_core::video::encode::{self, EncodeConfig};
use alphacut_core::video::probe;

use cli::{ExtractArgs, SegmenterChoice};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let tools = ToolPaths::resolve(cli.ffmpeg);

    match cli.command {
        cli::Command::Extract(args) => {
            extract(&tools, &args)?;
            Ok(())
        }
        cli::Command::Encode(args) => {
            let config = EncodeConfig {
                frames_dir: args.frames_dir,
                output: args.output,
                fps: args.fps,
                bitrate: args.bitrate,
            };
            encode::encode_transparent_video(&tools, &config).context("encoding failed")?;
            Ok(())
        }
        cli::Command::Run {
            extract: args,
            video,
            bitrate,
        } => {
            let report = extract(&tools, &args)?;
            info!(frames = report.frames_written, ?video, "extraction done, encoding");

            let config = EncodeConfig {
                frames_dir: args.output_dir.clone(),
                output: video,
                fps: args.fps,
                bitrate,
            };
            encode::encode_transparent_video(&tools, &config).context("encoding failed")?;
            Ok(())
        }
        cli::Command::Probe { input, report } => {
            let checks = probe::check_prerequisites(&tools, &input);
            if checks.iter().any(|c| !c.present) {
                warn!("prerequisites missing, the report will describe the failure");
            }
            probe::write_probe_report(&tools, &input, &report).context("probe failed")?;
            Ok(())
        }
    }
}

/// Run the frame pipeline and fail unless a complete frame range was written.
fn extract(tools: &ToolPaths, args: &ExtractArgs) -> Result<RunReport> {
    let config = PipelineConfig {
        input: args.input.clone(),
        output_dir: args.output_dir.clone(),
        geometry: FrameGeometry::new(args.width, args.height)?,
        start_offset: args.start.clone(),
        fps: args.fps,
        max_frames: args.max_frames,
        debug_masks_dir: args.debug_masks.clone(),
    };

    let kind = match args.segmenter {
        SegmenterChoice::BorderKey => SegmenterKind::BorderKey {
            tolerance: args.tolerance,
            softness: args.softness,
        },
        SegmenterChoice::Onnx => SegmenterKind::Onnx {
            model: args.model.clone().context("--model is required for the onnx segmenter")?,
        },
    };
    let segmenter = kind.build()?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    info!(
        input = ?config.input,
        output_dir = ?config.output_dir,
        "starting extraction"
    );

    let bar = progress_bar();
    let report = pipeline::run_pipeline(
        tools,
        &config,
        segmenter.as_ref(),
        &cancel,
        &mut |n| bar.set_position(u64::from(n)),
    )
    .context("pipeline failed")?;
    bar.finish_and_clear();

    info!(frames = report.frames_written, "processed frames");

    if !report.is_success() {
        bail!(
            "run stopped after {} frames ({:?}); {} holds a partial range",
            report.frames_written,
            report.outcome,
            config.output_dir.display()
        );
    }
    Ok(report)
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} processed {pos} frames [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
