use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use detection_timeline::{PipelineConfig, TimelineError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DETECTIONS_CONFIG",
        "DETECTIONS_VIDEO",
        "DETECTIONS_FRAMES_DIR",
        "DETECTIONS_OUTPUT_DIR",
        "DETECTIONS_DB_PATH",
        "DETECTIONS_CLASS",
        "DETECTIONS_FPS",
        "DETECTIONS_SIGMA",
        "DETECTIONS_BACKEND",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "video_path": "videos/garden.mp4",
        "output_dir": "runs/garden",
        "db_path": "garden.db",
        "class_filter": "bird",
        "smoothing": { "sigma": 3.5, "fill_gaps": true },
        "chart": { "width": 1200 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("DETECTIONS_CONFIG", file.path());
    std::env::set_var("DETECTIONS_CLASS", "cat");
    std::env::set_var("DETECTIONS_FPS", "29.97");

    let cfg = PipelineConfig::load().expect("load config");

    assert_eq!(cfg.video_path, "videos/garden.mp4");
    assert_eq!(cfg.db_path, "garden.db");
    assert_eq!(cfg.class_filter, "cat");
    assert_eq!(cfg.fps_override, Some(29.97));
    assert_eq!(cfg.smoothing.sigma, 3.5);
    assert_eq!(cfg.smoothing.truncate, 4.0);
    assert!(cfg.smoothing.fill_gaps);
    assert_eq!(cfg.chart.width, 1200);
    assert_eq!(cfg.chart.height, 600);
    assert_eq!(
        cfg.csv_path(),
        PathBuf::from("runs/garden/detection_results.csv")
    );
    assert_eq!(
        cfg.chart_path(),
        PathBuf::from("runs/garden/cat_detections_over_time.png")
    );

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        db_path = "toml.db"
        fps_override = 25.0

        [detector]
        backend = "stub"
        confidence_threshold = 0.4
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("DETECTIONS_CONFIG", file.path());

    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "toml.db");
    assert_eq!(cfg.fps_override, Some(25.0));
    assert_eq!(cfg.detector.confidence_threshold, 0.4);

    clear_env();
}

#[test]
fn rejects_zero_fps_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECTIONS_FPS", "0");
    let err = PipelineConfig::load().unwrap_err();
    assert!(matches!(err, TimelineError::InvalidFrameRate(_)));

    clear_env();
}

#[test]
fn rejects_non_numeric_sigma() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECTIONS_SIGMA", "wide");
    let err = PipelineConfig::load().unwrap_err();
    assert!(matches!(err, TimelineError::Configuration(_)));

    clear_env();
}

#[test]
fn rejects_missing_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECTIONS_CONFIG", "/nonexistent/detections.json");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
