//! Detection record log → per-second timeline.
//!
//! Timestamps are parsed to seconds, counted in one-second buckets for a
//! single class and smoothed with a Gaussian kernel for plotting.

mod aggregate;
mod smooth;
mod timestamp;

pub use aggregate::{
    aggregate, timestamp_distribution, SmoothingConfig, TimeBucket, Timeline, DEFAULT_SIGMA,
    DEFAULT_TRUNCATE,
};
pub use smooth::gaussian_smooth;
pub use timestamp::parse_timestamp;
