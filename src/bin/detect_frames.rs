//! detect_frames - run the detector over a video and export a detection CSV

use anyhow::Result;
use clap::Parser;
use detection_timeline::annotate::AnnotatedFrameWriter;
use detection_timeline::pipeline;
use detection_timeline::ui::{Ui, UiMode};
use detection_timeline::PipelineConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file (or `stub://name` for synthetic frames).
    #[arg(long)]
    video: Option<String>,
    /// Frames directory, read instead of the video when it exists.
    #[arg(long)]
    frames_dir: Option<String>,
    /// Directory for the CSV export.
    #[arg(long)]
    output_dir: Option<String>,
    /// Frame rate override.
    #[arg(long)]
    fps: Option<f64>,
    /// Detector backend name.
    #[arg(long)]
    backend: Option<String>,
    /// Detector model file.
    #[arg(long)]
    model: Option<String>,
    /// Save every frame with its detection boxes drawn to the output directory.
    #[arg(long)]
    annotate: bool,
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
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir.into();
    }
    if let Some(fps) = args.fps {
        cfg.fps_override = Some(fps);
    }
    if let Some(backend) = args.backend {
        cfg.detector.backend = backend;
    }
    if let Some(model) = args.model {
        cfg.detector.model_path = model.into();
    }
    cfg.validate()?;

    let mut source = {
        let _stage = ui.stage("Open frame source");
        pipeline::open_source(&cfg)?
    };
    let mut detector = {
        let _stage = ui.stage("Load detector");
        pipeline::build_detector(&cfg.detector)?
    };
    let mut annotator = if args.annotate {
        Some(AnnotatedFrameWriter::new(&cfg.output_dir)?)
    } else {
        None
    };
    let run = {
        let _stage = ui.stage("Detect objects");
        let counter = ui.frame_counter();
        let run = pipeline::detect_all(&mut source, &mut detector, &mut |frame, objects| {
            counter.inc(1);
            if !objects.is_empty() {
                counter.set_message(format!("{} objects in last frame", objects.len()));
            }
            if let Some(writer) = annotator.as_mut() {
                writer.write(frame, objects);
            }
        })?;
        counter.finish_and_clear();
        run
    };
    if let Some(writer) = &annotator {
        log::info!(
            "{} annotated frames saved to {} ({} failed)",
            writer.written(),
            cfg.output_dir.display(),
            writer.failed()
        );
    }
    let csv_path = cfg.csv_path();
    {
        let _stage = ui.stage("Write CSV");
        pipeline::export_csv(&csv_path, &run.records)?;
    }
    println!(
        "{} detections from {} frames written to {}",
        run.records.len(),
        run.frames_processed,
        csv_path.display()
    );
    Ok(())
}
