//! Cross-run statistics: mean and sample standard deviation per operation.

use crate::trace::{Category, MemorySummary, TimingSummary};

use std::collections::BTreeMap;

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Sample standard deviation (divisor n - 1); 0 for fewer than two samples.
pub fn sample_std(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let ss: f64 = samples.iter().map(|x| (x - m) * (x - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTiming {
    pub time_mean: f64,
    pub time_std: f64,
    pub instances_mean: f64,
    pub instances_std: f64,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedMemory {
    pub bytes_mean: f64,
    pub bytes_std: f64,
    pub count_mean: f64,
    pub count_std: f64,
}

#[derive(Debug)]
struct TimingSamples {
    time: Vec<f64>,
    instances: Vec<f64>,
    category: Category,
}

/// Aggregate the timing summaries of every run of one version.
///
/// Operations missing from a run contribute no sample for it. If runs
/// disagree on an operation's category, the last run wins.
pub fn aggregate_timing(runs: &[TimingSummary]) -> BTreeMap<String, AggregatedTiming> {
    let mut by_name: BTreeMap<&str, TimingSamples> = BTreeMap::new();
    for run in runs {
        for (name, rec) in run {
            let s = by_name.entry(name.as_str()).or_insert_with(|| TimingSamples {
                time: Vec::new(),
                instances: Vec::new(),
                category: rec.category,
            });
            s.time.push(rec.time);
            s.instances.push(rec.instances as f64);
            s.category = rec.category;
        }
    }

    by_name
        .into_iter()
        .map(|(name, s)| {
            let agg = AggregatedTiming {
                time_mean: mean(&s.time),
                time_std: sample_std(&s.time),
                instances_mean: mean(&s.instances),
                instances_std: sample_std(&s.instances),
                category: s.category,
            };
            (name.to_string(), agg)
        })
        .collect()
}

/// Aggregate the memory summaries of every run of one version.
pub fn aggregate_memory(runs: &[MemorySummary]) -> BTreeMap<String, AggregatedMemory> {
    let mut by_name: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for run in runs {
        for (name, rec) in run {
            let (bytes, count) = by_name.entry(name.as_str()).or_default();
            bytes.push(rec.bytes);
            count.push(rec.count as f64);
        }
    }

    by_name
        .into_iter()
        .map(|(name, (bytes, count))| {
            let agg = AggregatedMemory {
                bytes_mean: mean(&bytes),
                bytes_std: sample_std(&bytes),
                count_mean: mean(&count),
                count_std: sample_std(&count),
            };
            (name.to_string(), agg)
        })
        .collect()
}
