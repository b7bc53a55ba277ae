//! plot_detections - chart smoothed per-second counts of one class

use anyhow::{Context, Result};
use clap::Parser;
use detection_timeline::chart::PlottersRenderer;
use detection_timeline::pipeline;
use detection_timeline::ui::{Ui, UiMode};
use detection_timeline::{PipelineConfig, RenderOutcome, SqliteDetectionStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the detection database.
    #[arg(long)]
    db_path: Option<String>,
    /// Class to chart (case-insensitive).
    #[arg(long)]
    class: Option<String>,
    /// Directory the chart is written to.
    #[arg(long)]
    output_dir: Option<String>,
    /// Gaussian smoothing sigma, in seconds.
    #[arg(long)]
    sigma: Option<f64>,
    /// Add zero-count buckets for seconds without detections.
    #[arg(long)]
    fill_gaps: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::for_process(args.ui);

    let mut cfg = PipelineConfig::load()?;
    if let Some(db_path) = args.db_path {
        cfg.db_path = db_path;
    }
    if let Some(class) = args.class {
        cfg.class_filter = class;
    }
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir.into();
    }
    if let Some(sigma) = args.sigma {
        cfg.smoothing.sigma = sigma;
    }
    if args.fill_gaps {
        cfg.smoothing.fill_gaps = true;
    }
    cfg.validate()?;

    let timeline = {
        let _stage = ui.stage("Aggregate detections");
        let store = SqliteDetectionStore::open(&cfg.db_path)
            .with_context(|| format!("failed to open store {}", cfg.db_path))?;
        pipeline::analyze(&store, &cfg.class_filter, &cfg.smoothing)?
    };
    if timeline.excluded > 0 {
        log::warn!(
            "{} '{}' records had unparseable timestamps",
            timeline.excluded,
            cfg.class_filter
        );
    }

    let renderer = PlottersRenderer {
        width: cfg.chart.width,
        height: cfg.chart.height,
    };
    let chart_path = cfg.chart_path();
    let outcome = {
        let _stage = ui.stage("Render chart");
        pipeline::render_chart(&renderer, &timeline, &chart_path)?
    };
    match outcome {
        RenderOutcome::Rendered => println!(
            "{} '{}' detections over {} seconds charted to {}",
            timeline.total_raw(),
            cfg.class_filter,
            timeline.buckets.len(),
            chart_path.display()
        ),
        RenderOutcome::EmptySeries => {
            println!("no '{}' detections found for plotting", cfg.class_filter)
        }
    }
    Ok(())
}
