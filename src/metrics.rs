//! Recognition latency and outcome tracking.
//!
//! Each pipeline stage (`t_recognize`, `t_normalize`) keeps a bounded window
//! of recent latencies; every normalization bumps a counter named after the
//! tier that produced the plate. Nothing here feeds back into recognition.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Measures one pipeline stage. Dropping it without `finish` records nothing.
pub struct TimingSpan {
    stage: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    pub fn new(stage: &'static str, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            stage,
            start: Instant::now(),
            registry,
        }
    }

    /// Record the stage latency in microseconds and return it.
    pub fn finish(self) -> f64 {
        let latency_us = self.start.elapsed().as_secs_f64() * 1e6;
        self.registry.record(self.stage, latency_us);
        latency_us
    }
}

/// The most recent `limit` latencies of one stage, oldest first.
struct LatencyWindow {
    recent: VecDeque<f64>,
    limit: usize,
}

impl LatencyWindow {
    fn new(limit: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(limit),
            limit,
        }
    }

    fn push(&mut self, latency_us: f64) {
        if self.recent.len() == self.limit {
            self.recent.pop_front();
        }
        self.recent.push_back(latency_us);
    }

    /// Nearest-rank percentile over the window, `p` in 0–100.
    fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.recent.iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(f64::total_cmp);
        let last = sorted.len() - 1;
        let rank = (p.clamp(0.0, 100.0) / 100.0 * last as f64).round() as usize;
        sorted[rank.min(last)]
    }
}

/// Stage latencies and tier counters for a recognizer, shareable across threads.
pub struct MetricsRegistry {
    latencies: Mutex<HashMap<&'static str, LatencyWindow>>,
    counters: Mutex<HashMap<&'static str, u64>>,
    window: usize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Keep at most `window` latencies per stage.
    pub fn with_capacity(window: usize) -> Self {
        Self {
            latencies: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            window: window.max(1),
        }
    }

    pub fn record(&self, stage: &'static str, latency_us: f64) {
        self.latencies
            .lock()
            .entry(stage)
            .or_insert_with(|| LatencyWindow::new(self.window))
            .push(latency_us);
        tracing::trace!(stage, latency_us, "stage_latency");
    }

    pub fn increment(&self, name: &'static str) {
        *self.counters.lock().entry(name).or_insert(0) += 1;
    }

    pub fn count(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// Snapshot of every counter, e.g. how often each tier fired.
    pub fn counts(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .iter()
            .map(|(&name, &n)| (name.to_string(), n))
            .collect()
    }

    pub fn span(self: &Arc<Self>, stage: &'static str) -> TimingSpan {
        TimingSpan::new(stage, Arc::clone(self))
    }

    /// Latency percentile for `stage` in microseconds; 0 for an unseen stage.
    pub fn percentile(&self, stage: &str, p: f64) -> f64 {
        self.latencies
            .lock()
            .get(stage)
            .map_or(0.0, |window| window.percentile(p))
    }

    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        self.latencies
            .lock()
            .iter()
            .map(|(&stage, window)| {
                let summary = MetricSummary {
                    p50_us: window.percentile(50.0),
                    p95_us: window.percentile(95.0),
                    p99_us: window.percentile(99.0),
                    count: window.recent.len(),
                };
                (stage.to_string(), summary)
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: usize,
}

pub mod metric_names {
    /// Whole `recognize` call.
    pub const RECOGNIZE: &str = "t_recognize";
    /// The normalization cascade alone.
    pub const NORMALIZE: &str = "t_normalize";
    /// `recognize` calls with no usable reading.
    pub const EMPTY_INPUT: &str = "recognize_empty";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_recent_latencies() {
        let registry = MetricsRegistry::with_capacity(4);
        for v in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0] {
            registry.record("t", v);
        }
        // only the last four samples survive
        assert_eq!(registry.percentile("t", 0.0), 30.0);
        assert_eq!(registry.percentile("t", 100.0), 60.0);
        assert_eq!(registry.summary()["t"].count, 4);
        assert_eq!(registry.percentile("missing", 50.0), 0.0);
    }

    #[test]
    fn median_of_odd_window() {
        let registry = MetricsRegistry::new();
        for v in [5.0, 1.0, 3.0] {
            registry.record("t", v);
        }
        assert_eq!(registry.percentile("t", 50.0), 3.0);
    }

    #[test]
    fn counters() {
        let registry = MetricsRegistry::new();
        registry.increment("canonical");
        registry.increment("canonical");
        registry.increment("passthrough");
        assert_eq!(registry.count("canonical"), 2);
        assert_eq!(registry.counts()["passthrough"], 1);
        assert_eq!(registry.count("state_split"), 0);
    }

    #[test]
    fn span_records_on_finish() {
        let registry = Arc::new(MetricsRegistry::new());
        let span = registry.span(metric_names::NORMALIZE);
        span.finish();
        assert_eq!(registry.summary()[metric_names::NORMALIZE].count, 1);
    }
}
