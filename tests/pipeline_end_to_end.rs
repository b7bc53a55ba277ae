use std::collections::HashMap;
use std::io::Write;

use detection_timeline::chart::PlottersRenderer;
use detection_timeline::pipeline;
use detection_timeline::{
    aggregate, BoundingBox, DetectedObject, DetectionStore, PipelineConfig, RenderOutcome,
    SmoothingConfig, SqliteDetectionStore, StubBackend, SyntheticSource,
};

fn bird() -> DetectedObject {
    DetectedObject::new("bird", BoundingBox::new(4.0, 4.0, 20.0, 18.0), 0.88)
}

fn test_config(dir: &std::path::Path, class: &str) -> PipelineConfig {
    PipelineConfig {
        video_path: "stub://garden".to_string(),
        frames_dir: dir.join("frames"),
        output_dir: dir.join("output"),
        db_path: dir.join("detections.db").to_str().unwrap().to_string(),
        class_filter: class.to_string(),
        fps_override: Some(2.0),
        ..PipelineConfig::default()
    }
}

#[test]
fn csv_export_load_and_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "bird");

    let mut script = HashMap::new();
    script.insert(20, vec![bird(), bird()]);
    script.insert(21, vec![bird()]);
    script.insert(26, vec![bird()]);

    let mut source = SyntheticSource::new("stub://garden", 2.0, 30);
    let mut detector = StubBackend::scripted(script);
    let run = pipeline::detect_all(&mut source, &mut detector, &mut |_, _| {}).unwrap();
    assert_eq!(run.frames_processed, 30);
    assert_eq!(run.records.len(), 4);

    let csv_path = cfg.csv_path();
    assert_eq!(pipeline::export_csv(&csv_path, &run.records).unwrap(), 4);
    let import = pipeline::import_csv(&csv_path).unwrap();
    assert_eq!(import.rejected, 0);
    assert_eq!(import.records.len(), 4);

    let mut store = SqliteDetectionStore::open(&cfg.db_path).unwrap();
    assert_eq!(pipeline::persist(&mut store, &import.records).unwrap(), 4);
    let timeline = pipeline::analyze(&store, "Bird", &SmoothingConfig::default()).unwrap();

    let raw: Vec<(i64, u32)> = timeline
        .buckets
        .iter()
        .map(|b| (b.second, b.raw_count))
        .collect();
    assert_eq!(raw, vec![(10, 3), (13, 1)]);
    assert_eq!(timeline.matched, 4);
    assert_eq!(timeline.excluded, 0);
    assert!(timeline.buckets.iter().all(|b| b.smoothed_count >= 0.0));
}

#[test]
fn malformed_csv_rows_are_rejected_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("detections.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(
        file,
        "Class,Timestamp,Frame,BoundingBox_Coord0,BoundingBox_Coord1,BoundingBox_Coord2,BoundingBox_Coord3,Confidence"
    )
    .unwrap();
    writeln!(file, "bird,0:00:01.500000,45,1,2,3,4,0.9").unwrap();
    writeln!(file, "bird,0:00:02,not-a-frame,1,2,3,4,0.9").unwrap();
    writeln!(file, "bird,0:00:03,90,1,2,3").unwrap();
    drop(file);

    let import = pipeline::import_csv(&csv_path).unwrap();
    assert_eq!(import.records.len(), 1);
    assert_eq!(import.rejected, 2);
    assert_eq!(import.records[0].timestamp(), "0:00:01.500000");
}

#[test]
fn malformed_timestamps_in_store_are_excluded_from_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("detections.csv");
    std::fs::write(
        &csv_path,
        "Class,Timestamp,Frame,BoundingBox_Coord0,BoundingBox_Coord1,BoundingBox_Coord2,BoundingBox_Coord3,Confidence\n\
         bird,0:00:04,4,0,0,1,1,0.5\n\
         bird,garbage,5,0,0,1,1,0.5\n",
    )
    .unwrap();
    let import = pipeline::import_csv(&csv_path).unwrap();
    let timeline = aggregate(&import.records, "bird", &SmoothingConfig::default());
    assert_eq!(timeline.matched, 2);
    assert_eq!(timeline.excluded, 1);
    assert_eq!(timeline.buckets.len(), 1);
    assert_eq!(timeline.buckets[0].second, 4);
}

#[test]
fn full_run_without_matching_class_reports_empty_series() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "giraffe");

    let mut script = HashMap::new();
    script.insert(1, vec![bird()]);
    let mut source = SyntheticSource::new("stub://garden", 2.0, 4);
    let mut detector = StubBackend::scripted(script);
    let report = pipeline::run(
        &cfg,
        &mut source,
        &mut detector,
        &PlottersRenderer::default(),
    )
    .unwrap();

    assert_eq!(report.outcome, RenderOutcome::EmptySeries);
    assert_eq!(report.stored, 1);
    assert!(report.csv_path.exists());
    assert!(!report.chart_path.exists());
    assert!(report.timeline.is_empty());

    let store = SqliteDetectionStore::open(&cfg.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn empty_record_set_yields_empty_timeline() {
    let timeline = aggregate(&[], "bird", &SmoothingConfig::default());
    assert!(timeline.is_empty());
    assert_eq!(timeline.total_raw(), 0);
}
