use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "alphacut", about = "Cut video frames out of their background")]
pub struct Cli {
    /// Path to the ffmpeg executable (default: `ffmpeg` on PATH).
    #[arg(long, global = true, env = "ALPHACUT_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode a video and save every frame with its background removed.
    Extract(ExtractArgs),

    /// Reassemble extracted frames into a transparent WebM.
    Encode(EncodeArgs),

    /// Extract frames, then encode them if extraction completed.
    Run {
        #[command(flatten)]
        extract: ExtractArgs,

        /// Path of the transparent video to write.
        #[arg(long, default_value = "public/output_transparent.webm")]
        video: PathBuf,

        /// Target video bitrate.
        #[arg(long, default_value = "2000k")]
        bitrate: String,
    },

    /// Write ffmpeg's stream summary for a video to a text report.
    Probe {
        /// Path to the input video file.
        #[arg(short, long)]
        input: PathBuf,

        /// Path of the report to write.
        #[arg(short, long, default_value = "info.txt")]
        report: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SegmenterChoice {
    /// Key out the dominant border color.
    BorderKey,
    /// Run a U²-Net style ONNX model (needs --model).
    Onnx,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Path to the input video file (MP4, etc.).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for `output-NNN.png` frames. Removed and recreated on every run.
    #[arg(short, long, default_value = "public/frames")]
    pub output_dir: PathBuf,

    /// Frame width the decoder scales to.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Frame height the decoder scales to.
    #[arg(long, default_value_t = 704)]
    pub height: u32,

    /// Seek position in ffmpeg time syntax (seconds or HH:MM:SS).
    #[arg(short, long, default_value = "10")]
    pub start: String,

    /// Frame rate of the reassembled video.
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Stop after this many frames.
    #[arg(long)]
    pub max_frames: Option<u32>,

    /// Directory to save mask debug images.
    #[arg(long)]
    pub debug_masks: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SegmenterChoice::BorderKey)]
    pub segmenter: SegmenterChoice,

    /// ONNX model file for `--segmenter onnx`.
    #[arg(long, required_if_eq("segmenter", "onnx"))]
    pub model: Option<PathBuf>,

    /// Border-key: color distance below which pixels are background.
    #[arg(long, default_value_t = 40.0)]
    pub tolerance: f32,

    /// Border-key: width of the soft alpha ramp above the tolerance.
    #[arg(long, default_value_t = 30.0)]
    pub softness: f32,
}

#[derive(Args)]
pub struct EncodeArgs {
    /// Directory holding `output-NNN.png` frames.
    #[arg(short = 'd', long, default_value = "public/frames")]
    pub frames_dir: PathBuf,

    /// Path of the transparent video to write.
    #[arg(short, long, default_value = "public/output_transparent.webm")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Target video bitrate.
    #[arg(long, default_value = "2000k")]
    pub bitrate: String,
}
