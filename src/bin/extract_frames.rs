//! extract_frames - write every frame of a video as a JPEG still

use anyhow::Result;
use clap::Parser;
use detection_timeline::ingest::{extract_frames, probe_frame_rate};
use detection_timeline::ui::{Ui, UiMode};
use detection_timeline::PipelineConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video file.
    #[arg(long)]
    video: Option<String>,
    /// Directory the frames are written to.
    #[arg(long)]
    frames_dir: Option<String>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::for_process(args.ui);

    let mut cfg = PipelineConfig::load()?;
    if let Some(video) = args.video {
        cfg.video_path = video;
    }
    if let Some(dir) = args.frames_dir {
        cfg.frames_dir = dir.into();
    }

    let fps = {
        let _stage = ui.stage("Probe frame rate");
        probe_frame_rate(&cfg.video_path)?
    };
    let written = {
        let _stage = ui.stage("Extract frames");
        extract_frames(&cfg.video_path, &cfg.frames_dir)?
    };
    println!(
        "{} frames at {:.3} fps written to {}",
        written,
        fps,
        cfg.frames_dir.display()
    );
    Ok(())
}
