//! timeline - video to chart in one run

use anyhow::Result;
use clap::Parser;
use detection_timeline::chart::PlottersRenderer;
use detection_timeline::pipeline;
use detection_timeline::ui::{Ui, UiMode};
use detection_timeline::{PipelineConfig, RenderOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file (or `stub://name` for synthetic frames).
    #[arg(long)]
    video: Option<String>,
    /// Class to chart (case-insensitive).
    #[arg(long)]
    class: Option<String>,
    /// Frame rate override.
    #[arg(long)]
    fps: Option<f64>,
    /// Path to the detection database.
    #[arg(long)]
    db_path: Option<String>,
    /// Directory for the CSV export and the chart.
    #[arg(long)]
    output_dir: Option<String>,
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
    if let Some(class) = args.class {
        cfg.class_filter = class;
    }
    if let Some(fps) = args.fps {
        cfg.fps_override = Some(fps);
    }
    if let Some(db_path) = args.db_path {
        cfg.db_path = db_path;
    }
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir.into();
    }
    cfg.validate()?;

    let mut source = pipeline::open_source(&cfg)?;
    let mut detector = pipeline::build_detector(&cfg.detector)?;
    let renderer = PlottersRenderer {
        width: cfg.chart.width,
        height: cfg.chart.height,
    };
    let report = {
        let _stage = ui.stage("Run pipeline");
        pipeline::run(&cfg, &mut source, &mut detector, &renderer)?
    };

    println!(
        "frames: {} processed, {} failed, {} skipped",
        report.detection.frames_processed,
        report.detection.frames_failed,
        report.detection.frames_skipped
    );
    println!(
        "detections: {} exported to {}, {} stored, {} rejected rows",
        report.detection.records.len(),
        report.csv_path.display(),
        report.stored,
        report.rejected_rows
    );
    match report.outcome {
        RenderOutcome::Rendered => println!("chart: {}", report.chart_path.display()),
        RenderOutcome::EmptySeries => {
            println!("chart: no '{}' detections found for plotting", cfg.class_filter)
        }
    }
    Ok(())
}
