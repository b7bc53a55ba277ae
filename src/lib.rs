//! Detection Timeline
//!
//! Batch pipeline that turns a video into a per-second detection timeline:
//!
//! 1. Frames are read in order from a video, an extracted frame directory or a
//!    synthetic `stub://` source.
//! 2. A pluggable detector backend tags objects in each frame.
//! 3. Each detection becomes a [`DetectionRecord`] stamped with the frame's
//!    elapsed-time position (`H:MM:SS[.ffffff]`).
//! 4. Records are exported to CSV and loaded into an append-only SQLite store.
//! 5. One class is counted per whole second, Gaussian-smoothed and charted.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources and frame-rate probing
//! - `detect`: detector trait, backends, registry, NMS
//! - `record`: detection records and the timestamp formatter
//! - `tabular`: CSV export and import
//! - `storage`: the detection store
//! - `timeseries`: timestamp parsing, bucketing, smoothing
//! - `annotate`: detection boxes drawn onto saved frames
//! - `chart`: timeline rendering
//! - `pipeline`: stage orchestration
//! - `config`, `ui`: command-line plumbing

pub mod annotate;
pub mod chart;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod record;
pub mod storage;
pub mod tabular;
pub mod timeseries;
pub mod ui;

pub use chart::{ChartRenderer, PlottersRenderer, RenderOutcome, SeriesBounds};
pub use config::PipelineConfig;
pub use detect::{BackendRegistry, BoundingBox, DetectedObject, DetectorBackend, StubBackend};
pub use error::{Result, TimelineError};
pub use frame::Frame;
pub use ingest::{FileSource, FrameSource, SourceConfig, SyntheticSource};
pub use record::{DetectionRecord, RecordBuilder};
pub use storage::{
    shared_memory_uri, DetectionStore, InMemoryDetectionStore, SqliteDetectionStore,
};
pub use timeseries::{aggregate, parse_timestamp, SmoothingConfig, TimeBucket, Timeline};
