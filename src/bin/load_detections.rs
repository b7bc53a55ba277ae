//! load_detections - load a detection CSV into the detection store

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use detection_timeline::pipeline;
use detection_timeline::ui::{Ui, UiMode};
use detection_timeline::{DetectionStore, PipelineConfig, SqliteDetectionStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// CSV export to load. Defaults to the configured output location.
    #[arg(long)]
    csv: Option<String>,
    /// Path to the detection database.
    #[arg(long)]
    db_path: Option<String>,
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
    let csv_path = args.csv.map(PathBuf::from).unwrap_or_else(|| cfg.csv_path());

    let import = {
        let _stage = ui.stage("Read CSV");
        pipeline::import_csv(&csv_path)?
    };
    let mut store = {
        let _stage = ui.stage("Open detection store");
        SqliteDetectionStore::open(&cfg.db_path)
            .with_context(|| format!("failed to open store {}", cfg.db_path))?
    };
    let stored = {
        let _stage = ui.stage("Store detections");
        pipeline::persist(&mut store, &import.records)?
    };
    let total = store.count()?;
    store.close()?;

    println!(
        "{} detections loaded into {} ({} rejected, {} total)",
        stored, cfg.db_path, import.rejected, total
    );
    Ok(())
}
