use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TimelineError};
use crate::timeseries::{SmoothingConfig, DEFAULT_SIGMA, DEFAULT_TRUNCATE};

const DEFAULT_VIDEO_PATH: &str = "videos/input_video.mp4";
const DEFAULT_FRAMES_DIR: &str = "frames";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_CSV_FILE: &str = "detection_results.csv";
const DEFAULT_DB_PATH: &str = "detections.db";
const DEFAULT_CLASS: &str = "bird";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f64 = 0.45;
const DEFAULT_CHART_WIDTH: u32 = 1000;
const DEFAULT_CHART_HEIGHT: u32 = 600;

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    video_path: Option<String>,
    frames_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    csv_file_name: Option<String>,
    db_path: Option<String>,
    class_filter: Option<String>,
    fps_override: Option<f64>,
    detector: Option<DetectorConfigFile>,
    smoothing: Option<SmoothingConfigFile>,
    chart: Option<ChartConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SmoothingConfigFile {
    sigma: Option<f64>,
    truncate: Option<f64>,
    fill_gaps: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct ChartConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

/// Locations and tuning for one pipeline run. Passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub video_path: String,
    pub frames_dir: PathBuf,
    pub output_dir: PathBuf,
    pub csv_file_name: String,
    pub db_path: String,
    pub class_filter: String,
    pub fps_override: Option<f64>,
    pub detector: DetectorSettings,
    pub smoothing: SmoothingConfig,
    pub chart: ChartSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_file(PipelineConfigFile::default())
    }
}

impl PipelineConfig {
    /// Defaults, then the file named by `DETECTIONS_CONFIG`, then
    /// `DETECTIONS_*` environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DETECTIONS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let smoothing = file.smoothing.unwrap_or_default();
        let chart = file.chart.unwrap_or_default();
        Self {
            video_path: file
                .video_path
                .unwrap_or_else(|| DEFAULT_VIDEO_PATH.to_string()),
            frames_dir: file
                .frames_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FRAMES_DIR)),
            output_dir: file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            csv_file_name: file
                .csv_file_name
                .unwrap_or_else(|| DEFAULT_CSV_FILE.to_string()),
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            class_filter: file
                .class_filter
                .unwrap_or_else(|| DEFAULT_CLASS.to_string()),
            fps_override: file.fps_override,
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE),
                iou_threshold: detector.iou_threshold.unwrap_or(DEFAULT_IOU),
            },
            smoothing: SmoothingConfig {
                sigma: smoothing.sigma.unwrap_or(DEFAULT_SIGMA),
                truncate: smoothing.truncate.unwrap_or(DEFAULT_TRUNCATE),
                fill_gaps: smoothing.fill_gaps.unwrap_or(false),
            },
            chart: ChartSettings {
                width: chart.width.unwrap_or(DEFAULT_CHART_WIDTH),
                height: chart.height.unwrap_or(DEFAULT_CHART_HEIGHT),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(video) = non_blank_env("DETECTIONS_VIDEO") {
            self.video_path = video;
        }
        if let Some(dir) = non_blank_env("DETECTIONS_FRAMES_DIR") {
            self.frames_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_blank_env("DETECTIONS_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_blank_env("DETECTIONS_DB_PATH") {
            self.db_path = path;
        }
        if let Some(class) = non_blank_env("DETECTIONS_CLASS") {
            self.class_filter = class;
        }
        if let Some(backend) = non_blank_env("DETECTIONS_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(fps) = non_blank_env("DETECTIONS_FPS") {
            let fps: f64 = fps.trim().parse().map_err(|_| {
                TimelineError::Configuration("DETECTIONS_FPS must be a number".to_string())
            })?;
            self.fps_override = Some(fps);
        }
        if let Some(sigma) = non_blank_env("DETECTIONS_SIGMA") {
            self.smoothing.sigma = sigma.trim().parse().map_err(|_| {
                TimelineError::Configuration("DETECTIONS_SIGMA must be a number".to_string())
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(TimelineError::Configuration(msg.to_string()));

        if let Some(fps) = self.fps_override {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(TimelineError::InvalidFrameRate(fps));
            }
        }
        if self.class_filter.trim().is_empty() {
            return invalid("class filter must not be empty");
        }
        if !(self.smoothing.sigma.is_finite() && self.smoothing.sigma > 0.0) {
            return invalid("smoothing sigma must be greater than zero");
        }
        if !(self.smoothing.truncate.is_finite() && self.smoothing.truncate > 0.0) {
            return invalid("smoothing truncate must be greater than zero");
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return invalid("chart dimensions must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return invalid("detector confidence threshold must be within 0..=1");
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return invalid("detector IoU threshold must be within 0..=1");
        }
        if self.detector.input_size == 0 {
            return invalid("detector input size must be non-zero");
        }
        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.csv_file_name)
    }

    pub fn chart_path(&self) -> PathBuf {
        let class = self.class_filter.trim().to_lowercase().replace(' ', "_");
        self.output_dir
            .join(format!("{}_detections_over_time.png", class))
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TimelineError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        TimelineError::Configuration(format!("invalid config file {}: {}", path.display(), e))
    })
}
