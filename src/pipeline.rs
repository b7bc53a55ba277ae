//! Explicit stage orchestration.
//!
//! Each stage takes the previous stage's output as a parameter and fully
//! consumes it before returning: frames → detections → CSV export → store →
//! timeline → chart. Nothing runs concurrently.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::chart::{ChartRenderer, RenderOutcome};
use crate::config::{DetectorSettings, PipelineConfig};
use crate::detect::{BackendRegistry, DetectedObject, DetectorBackend, StubBackend};
use crate::error::TimelineError;
use crate::frame::Frame;
use crate::ingest::{FileSource, FrameSource, SourceConfig};
use crate::record::{DetectionRecord, RecordBuilder};
use crate::storage::{DetectionStore, SqliteDetectionStore};
use crate::tabular::{self, TabularImport};
use crate::timeseries::{self, SmoothingConfig, Timeline};

/// Output of the detection stage.
#[derive(Debug, Default)]
pub struct DetectionRun {
    pub records: Vec<DetectionRecord>,
    pub fps: f64,
    pub frames_processed: u64,
    /// Frames the detector failed on. Their detections are missing.
    pub frames_failed: u64,
    /// Frames or packets the source could not read and skipped.
    pub frames_skipped: u64,
}

/// Summary of a full pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    pub detection: DetectionRun,
    pub csv_path: PathBuf,
    pub rejected_rows: usize,
    pub stored: usize,
    pub timeline: Timeline,
    pub outcome: RenderOutcome,
    pub chart_path: PathBuf,
}

/// Frame source for the configured inputs: a `stub://` video name as-is, an
/// existing frames directory (frame rate probed from the video unless
/// overridden), otherwise the video file itself.
pub fn open_source(config: &PipelineConfig) -> Result<FileSource> {
    let source_config = if config.video_path.starts_with("stub://") {
        SourceConfig {
            path: config.video_path.clone(),
            fps_override: config.fps_override,
            ..SourceConfig::default()
        }
    } else if config.frames_dir.is_dir() {
        SourceConfig {
            path: config.frames_dir.display().to_string(),
            probe_path: Some(config.video_path.clone()),
            fps_override: config.fps_override,
            ..SourceConfig::default()
        }
    } else {
        SourceConfig {
            path: config.video_path.clone(),
            fps_override: config.fps_override,
            ..SourceConfig::default()
        }
    };
    FileSource::new(source_config)
}

/// Registry holding the configured backend as its default.
pub fn build_detector(settings: &DetectorSettings) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    match settings.backend.as_str() {
        "stub" => registry.register(StubBackend::new()),
        #[cfg(feature = "backend-tract")]
        "tract" => registry.register(
            crate::detect::TractBackend::new(&settings.model_path, settings.input_size)?
                .with_thresholds(settings.confidence_threshold, settings.iou_threshold),
        ),
        other => {
            return Err(TimelineError::Detector(format!(
                "unknown or disabled backend '{}' (available: stub{})",
                other,
                if cfg!(feature = "backend-tract") { ", tract" } else { "" }
            ))
            .into())
        }
    }
    Ok(registry)
}

/// Run the detector over every frame of `source` and build records.
///
/// A frame rate that is zero, negative or not finite aborts before any frame
/// is read. A detector failure on one frame is logged and that frame skipped.
/// `on_frame` sees each processed frame together with its detections.
pub fn detect_all(
    source: &mut dyn FrameSource,
    detector: &mut dyn DetectorBackend,
    on_frame: &mut dyn FnMut(&Frame, &[DetectedObject]),
) -> Result<DetectionRun> {
    let fps = source.frame_rate();
    let builder = RecordBuilder::new(fps)?;
    log::info!("detecting with backend '{}' at {} fps", detector.name(), fps);
    detector.warm_up().context("detector warm-up failed")?;

    let mut run = DetectionRun {
        fps,
        ..DetectionRun::default()
    };
    while let Some(frame) = source.next_frame().context("failed to read next frame")? {
        let objects = match detector.detect(&frame) {
            Ok(objects) => objects,
            Err(e) => {
                log::warn!("detection failed on frame {}: {:#}", frame.index(), e);
                run.frames_failed += 1;
                continue;
            }
        };
        run.frames_processed += 1;
        log::debug!("frame {}: {} objects", frame.index(), objects.len());
        on_frame(&frame, &objects);
        run.records.extend(
            objects
                .into_iter()
                .map(|object| builder.build_from_detection(frame.index(), object)),
        );
    }
    run.frames_skipped = source.stats().frames_skipped;

    log::info!(
        "processed {} frames ({} failed, {} skipped), {} detections",
        run.frames_processed,
        run.frames_failed,
        run.frames_skipped,
        run.records.len()
    );
    Ok(run)
}

/// Write records to a CSV export, creating the parent directory if needed.
pub fn export_csv(path: &Path, records: &[DetectionRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let rows = tabular::write_records(BufWriter::new(file), records)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {} rows to {}", rows, path.display());
    Ok(rows)
}

pub fn import_csv(path: &Path) -> Result<TabularImport> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let import = tabular::read_records(BufReader::new(file))
        .with_context(|| format!("failed to read {}", path.display()))?;
    if import.rejected > 0 {
        log::warn!(
            "{} malformed rows in {} were not loaded",
            import.rejected,
            path.display()
        );
    }
    Ok(import)
}

/// Append all records to the store in one batch.
pub fn persist(store: &mut dyn DetectionStore, records: &[DetectionRecord]) -> Result<usize> {
    let ids = store
        .append_batch(records)
        .context("failed to persist detections")?;
    log::info!("stored {} detections", ids.len());
    Ok(ids.len())
}

/// Read the store and aggregate one class into a smoothed timeline.
pub fn analyze(
    store: &dyn DetectionStore,
    class_filter: &str,
    smoothing: &SmoothingConfig,
) -> Result<Timeline> {
    let records = store.read_all().context("failed to read detections")?;
    let mut classes: Vec<&str> = records.iter().map(|r| r.class_name()).collect();
    classes.sort_unstable();
    classes.dedup();
    log::info!("{} detections, classes: {:?}", records.len(), classes);

    let matching: Vec<DetectionRecord> = records
        .into_iter()
        .filter(|r| r.is_class(class_filter))
        .collect();
    for (timestamp, count) in timeseries::timestamp_distribution(&matching)
        .iter()
        .take(20)
    {
        log::debug!("{} x{}", timestamp, count);
    }
    Ok(timeseries::aggregate(&matching, class_filter, smoothing))
}

pub fn render_chart(
    renderer: &dyn ChartRenderer,
    timeline: &Timeline,
    destination: &Path,
) -> Result<RenderOutcome> {
    renderer
        .render(timeline, destination)
        .with_context(|| format!("failed to render {}", destination.display()))
}

/// Every stage in order. The CSV export is written and read back so the
/// store is loaded from the same interchange file the standalone tools use.
pub fn run(
    config: &PipelineConfig,
    source: &mut dyn FrameSource,
    detector: &mut dyn DetectorBackend,
    renderer: &dyn ChartRenderer,
) -> Result<PipelineReport> {
    config.validate()?;

    let detection = detect_all(source, detector, &mut |_, _| {})?;

    let csv_path = config.csv_path();
    export_csv(&csv_path, &detection.records)?;
    let import = import_csv(&csv_path)?;

    let stored = {
        let mut store = SqliteDetectionStore::open(&config.db_path)
            .with_context(|| format!("failed to open store {}", config.db_path))?;
        let stored = persist(&mut store, &import.records)?;
        store.close().context("failed to close store")?;
        stored
    };

    let timeline = {
        let store = SqliteDetectionStore::open(&config.db_path)
            .with_context(|| format!("failed to open store {}", config.db_path))?;
        analyze(&store, &config.class_filter, &config.smoothing)?
    };

    let chart_path = config.chart_path();
    let outcome = render_chart(renderer, &timeline, &chart_path)?;

    Ok(PipelineReport {
        detection,
        csv_path,
        rejected_rows: import.rejected,
        stored,
        timeline,
        outcome,
        chart_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::ingest::SyntheticSource;
    use crate::storage::InMemoryDetectionStore;
    use std::collections::HashMap;

    struct FailingOn(u64);

    impl DetectorBackend for FailingOn {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>> {
            if frame.index() == self.0 {
                bail!("model exploded");
            }
            Ok(vec![DetectedObject::new(
                "bird",
                BoundingBox::new(0.0, 0.0, 2.0, 2.0),
                0.7,
            )])
        }
    }

    #[test]
    fn zero_frame_rate_aborts_detection() {
        let mut source = SyntheticSource::new("stub://zero", 0.0, 5);
        let mut detector = StubBackend::new();
        let err = detect_all(&mut source, &mut detector, &mut |_, _| {}).unwrap_err();
        assert!(err.to_string().contains("invalid frame rate"));
    }

    #[test]
    fn detector_failures_skip_only_that_frame() {
        let mut source = SyntheticSource::new("stub://fail", 2.0, 4);
        let mut detector = FailingOn(1);
        let mut seen = Vec::new();
        let run = detect_all(&mut source, &mut detector, &mut |frame, objects| {
            seen.push((frame.index(), objects.len()))
        })
        .unwrap();
        assert_eq!(run.frames_processed, 3);
        assert_eq!(run.frames_failed, 1);
        assert_eq!(seen, vec![(0, 1), (2, 1), (3, 1)]);
        let timestamps: Vec<&str> = run.records.iter().map(|r| r.timestamp()).collect();
        assert_eq!(timestamps, vec!["0:00:00", "0:00:01", "0:00:01.500000"]);
    }

    #[test]
    fn scripted_detections_flow_into_a_timeline() {
        let bird = DetectedObject::new("Bird", BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9);
        let cat = DetectedObject::new("cat", BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9);
        let mut script = HashMap::new();
        script.insert(10, vec![bird.clone(), bird.clone()]);
        script.insert(11, vec![bird.clone(), cat]);
        script.insert(13, vec![bird]);

        let mut source = SyntheticSource::new("stub://script", 1.0, 15);
        let mut detector = StubBackend::scripted(script);
        let run = detect_all(&mut source, &mut detector, &mut |_, _| {}).unwrap();

        let mut store = InMemoryDetectionStore::new();
        assert_eq!(persist(&mut store, &run.records).unwrap(), 5);
        let timeline = analyze(&store, "bird", &SmoothingConfig::default()).unwrap();
        let raw: Vec<(i64, u32)> = timeline
            .buckets
            .iter()
            .map(|b| (b.second, b.raw_count))
            .collect();
        assert_eq!(raw, vec![(10, 2), (11, 1), (13, 1)]);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let settings = DetectorSettings {
            backend: "magic".to_string(),
            ..PipelineConfig::default().detector
        };
        let err = build_detector(&settings).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TimelineError>(),
            Some(TimelineError::Detector(_))
        ));
    }
}
