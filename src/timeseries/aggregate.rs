use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::smooth::gaussian_smooth;
use super::timestamp::parse_timestamp;
use crate::record::DetectionRecord;

pub const DEFAULT_SIGMA: f64 = 2.0;
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Smoothing parameters for [`aggregate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Gaussian spread, in buckets.
    pub sigma: f64,
    /// Kernel half-width, in multiples of `sigma`.
    pub truncate: f64,
    /// Insert zero-count buckets for missing seconds before smoothing.
    pub fill_gaps: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            truncate: DEFAULT_TRUNCATE,
            fill_gaps: false,
        }
    }
}

/// Detections counted in one whole second of video.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimeBucket {
    pub second: i64,
    pub raw_count: u32,
    pub smoothed_count: f64,
}

/// Per-second detection counts for one class, ordered by second.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub class_name: String,
    pub buckets: Vec<TimeBucket>,
    /// Records whose class matched the filter.
    pub matched: usize,
    /// Matched records dropped because their timestamp did not parse.
    pub excluded: usize,
}

impl Timeline {
    /// True when there is nothing to plot.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_raw(&self) -> u64 {
        self.buckets.iter().map(|b| u64::from(b.raw_count)).sum()
    }

    pub fn total_smoothed(&self) -> f64 {
        self.buckets.iter().map(|b| b.smoothed_count).sum()
    }
}

/// Count `class_filter` detections per whole second and smooth the counts.
///
/// The class match is case-insensitive. Records with unparseable timestamps
/// are excluded and counted in `Timeline::excluded`. Buckets are sparse
/// (seconds without detections are absent) unless `fill_gaps` is set. An
/// empty result skips smoothing entirely.
pub fn aggregate(
    records: &[DetectionRecord],
    class_filter: &str,
    smoothing: &SmoothingConfig,
) -> Timeline {
    let mut timeline = Timeline {
        class_name: class_filter.to_string(),
        ..Timeline::default()
    };

    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_class(class_filter)) {
        timeline.matched += 1;
        match parse_timestamp(record.timestamp()) {
            Ok(seconds) => *counts.entry(seconds.trunc() as i64).or_insert(0) += 1,
            Err(e) => {
                log::warn!("excluding record from frame {}: {}", record.frame_index(), e);
                timeline.excluded += 1;
            }
        }
    }

    if counts.is_empty() {
        log::info!(
            "no '{}' detections to aggregate ({} matched, {} excluded)",
            class_filter,
            timeline.matched,
            timeline.excluded
        );
        return timeline;
    }

    let raw: Vec<(i64, u32)> = if smoothing.fill_gaps {
        zero_fill(&counts)
    } else {
        counts.into_iter().collect()
    };
    let values: Vec<f64> = raw.iter().map(|(_, count)| f64::from(*count)).collect();
    let smoothed = gaussian_smooth(&values, smoothing.sigma, smoothing.truncate);

    timeline.buckets = raw
        .into_iter()
        .zip(smoothed)
        .map(|((second, raw_count), smoothed_count)| TimeBucket {
            second,
            raw_count,
            smoothed_count,
        })
        .collect();

    log::info!(
        "aggregated {} '{}' detections into {} buckets ({} excluded)",
        timeline.matched - timeline.excluded,
        class_filter,
        timeline.buckets.len(),
        timeline.excluded
    );
    timeline
}

fn zero_fill(counts: &BTreeMap<i64, u32>) -> Vec<(i64, u32)> {
    let (Some((&first, _)), Some((&last, _))) = (counts.first_key_value(), counts.last_key_value())
    else {
        return Vec::new();
    };
    (first..=last)
        .map(|second| (second, counts.get(&second).copied().unwrap_or(0)))
        .collect()
}

/// Number of records per distinct timestamp string, sorted by timestamp.
pub fn timestamp_distribution(records: &[DetectionRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.timestamp()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(timestamp, count)| (timestamp.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::record::RecordBuilder;

    fn record_at(class_name: &str, frame: u64) -> DetectionRecord {
        RecordBuilder::new(1.0)
            .unwrap()
            .build(frame, class_name, BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.9)
    }

    fn with_timestamp(class_name: &str, timestamp: &str) -> DetectionRecord {
        DetectionRecord::from_parts(
            None,
            class_name.to_string(),
            timestamp.to_string(),
            0,
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            0.9,
        )
    }

    fn raw_pairs(timeline: &Timeline) -> Vec<(i64, u32)> {
        timeline
            .buckets
            .iter()
            .map(|b| (b.second, b.raw_count))
            .collect()
    }

    #[test]
    fn empty_input_yields_empty_timeline() {
        let timeline = aggregate(&[], "bird", &SmoothingConfig::default());
        assert!(timeline.is_empty());
        assert_eq!(timeline.matched, 0);
    }

    #[test]
    fn buckets_are_sparse_and_sorted() {
        let records = vec![
            record_at("bird", 13),
            record_at("bird", 10),
            record_at("cat", 12),
            record_at("bird", 11),
            record_at("bird", 10),
        ];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert_eq!(raw_pairs(&timeline), vec![(10, 2), (11, 1), (13, 1)]);
        assert_eq!(timeline.matched, 4);
        assert_eq!(timeline.excluded, 0);
    }

    #[test]
    fn fractional_seconds_truncate_into_their_bucket() {
        let records = vec![
            with_timestamp("bird", "0:00:10.999999"),
            with_timestamp("bird", "0:00:10"),
            with_timestamp("bird", "0.00.11"),
        ];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert_eq!(raw_pairs(&timeline), vec![(10, 2), (11, 1)]);
    }

    #[test]
    fn class_filter_ignores_case() {
        let records = vec![record_at("Bird", 1), record_at("bird", 1), record_at("BIRD", 2)];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert_eq!(timeline.total_raw(), 3);
    }

    #[test]
    fn malformed_timestamps_are_excluded_and_counted() {
        let records = vec![
            with_timestamp("bird", "0:00:05"),
            with_timestamp("bird", "0:05"),
            with_timestamp("bird", "garbage"),
            with_timestamp("cat", "garbage"),
        ];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert_eq!(raw_pairs(&timeline), vec![(5, 1)]);
        assert_eq!(timeline.matched, 3);
        assert_eq!(timeline.excluded, 2);
    }

    #[test]
    fn only_malformed_records_yield_empty_timeline() {
        let records = vec![with_timestamp("bird", "nope")];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert!(timeline.is_empty());
        assert_eq!(timeline.excluded, 1);
    }

    #[test]
    fn fill_gaps_inserts_zero_buckets() {
        let records = vec![record_at("bird", 10), record_at("bird", 13)];
        let smoothing = SmoothingConfig {
            fill_gaps: true,
            ..SmoothingConfig::default()
        };
        let timeline = aggregate(&records, "bird", &smoothing);
        assert_eq!(raw_pairs(&timeline), vec![(10, 1), (11, 0), (12, 0), (13, 1)]);
    }

    #[test]
    fn single_bucket_is_not_altered_by_smoothing() {
        let records = vec![record_at("bird", 4), record_at("bird", 4)];
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        assert_eq!(timeline.buckets.len(), 1);
        assert_eq!(timeline.buckets[0].smoothed_count, 2.0);
    }

    #[test]
    fn smoothing_roughly_preserves_mass() {
        let records: Vec<DetectionRecord> = (0..40u64)
            .flat_map(|second| {
                let n = if second % 7 == 0 { 3 } else { 1 };
                (0..n).map(move |_| record_at("bird", second))
            })
            .collect();
        let timeline = aggregate(&records, "bird", &SmoothingConfig::default());
        let raw = timeline.total_raw() as f64;
        let smoothed = timeline.total_smoothed();
        assert!((raw - smoothed).abs() / raw < 0.05, "raw {} smoothed {}", raw, smoothed);
    }

    #[test]
    fn distribution_counts_identical_timestamps() {
        let records = vec![record_at("bird", 2), record_at("cat", 2), record_at("bird", 1)];
        let dist = timestamp_distribution(&records);
        assert_eq!(
            dist,
            vec![("0:00:01".to_string(), 1), ("0:00:02".to_string(), 2)]
        );
    }
}
