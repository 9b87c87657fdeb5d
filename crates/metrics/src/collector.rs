use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::endpoint::EndpointRules;
use crate::sample::RequestSample;

/// Nearest-rank percentile over unsorted latencies: sort ascending, take
/// the value at `ceil(p/100 * n) - 1` clamped into `[0, n-1]`. Returns 0
/// for an empty slice. `p` is expected in `(0, 100]`. No interpolation.
pub fn percentile(latencies: &[u64], p: f64) -> u64 {
    if latencies.is_empty() {
        return 0;
    }
    let mut sorted: Vec<u64> = latencies.to_vec();
    sorted.sort_unstable();
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, sorted.len() as i64 - 1) as usize;
    sorted[index]
}

/// Mutable-then-sealed per-phase accumulation. Samples only grow while the
/// phase window is open; once the end stamp is set the scheduler stops
/// writing and readers see a fixed collection.
#[derive(Debug)]
struct PhaseAggregate {
    phase: String,
    user_count: usize,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    samples: Vec<RequestSample>,
}

impl PhaseAggregate {
    fn snapshot(&self, rules: Arc<EndpointRules>) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.phase.clone(),
            user_count: self.user_count,
            start: self.start,
            end: self.end,
            samples: self.samples.clone(),
            rules,
        }
    }
}

/// Point-in-time copy of one phase's observations plus derived statistics.
/// Derived values are computed on read, never cached.
#[derive(Debug, Clone)]
pub struct PhaseSnapshot {
    pub phase: String,
    pub user_count: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub samples: Vec<RequestSample>,
    rules: Arc<EndpointRules>,
}

/// Aggregated per-endpoint counters within one phase.
#[derive(Debug, Clone, Default)]
pub struct EndpointStats {
    pub total: usize,
    pub successful: usize,
    pub total_latency_ms: u64,
}

impl EndpointStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total_latency_ms as f64 / self.total as f64
    }
}

impl PhaseSnapshot {
    pub fn total_requests(&self) -> usize {
        self.samples.len()
    }

    pub fn successful_requests(&self) -> usize {
        self.samples.iter().filter(|s| s.is_success).count()
    }

    pub fn failed_requests(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_success).count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.successful_requests() as f64 / self.samples.len() as f64 * 100.0
    }

    /// Wall-clock width of the phase window; `None` until sealed.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end? - self.start?)
    }

    pub fn requests_per_second(&self) -> f64 {
        let Some(duration) = self.duration() else {
            return 0.0;
        };
        let secs = duration.num_milliseconds() as f64 / 1000.0;
        if secs <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / secs
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        total as f64 / self.samples.len() as f64
    }

    pub fn min_latency_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.latency_ms).min().unwrap_or(0)
    }

    pub fn max_latency_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.latency_ms).max().unwrap_or(0)
    }

    pub fn percentile_latency_ms(&self, p: f64) -> u64 {
        let latencies: Vec<u64> = self.samples.iter().map(|s| s.latency_ms).collect();
        percentile(&latencies, p)
    }

    /// Per-endpoint counters keyed by `"{METHOD} {normalized path}"`,
    /// ordered by key for stable rendering.
    pub fn endpoint_breakdown(&self) -> BTreeMap<String, EndpointStats> {
        let mut breakdown: BTreeMap<String, EndpointStats> = BTreeMap::new();
        for sample in &self.samples {
            let key = self.rules.key(&sample.method, &sample.endpoint);
            let entry = breakdown.entry(key).or_default();
            entry.total += 1;
            if sample.is_success {
                entry.successful += 1;
            }
            entry.total_latency_ms += sample.latency_ms;
        }
        breakdown
    }
}

/// Point-in-time copy of the whole run: every sample plus the per-phase
/// snapshots ordered by phase start time.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub started: DateTime<Utc>,
    pub taken: DateTime<Utc>,
    pub samples: Vec<RequestSample>,
    pub phases: Vec<PhaseSnapshot>,
}

impl RunSnapshot {
    pub fn total_requests(&self) -> usize {
        self.samples.len()
    }

    pub fn successful_requests(&self) -> usize {
        self.samples.iter().filter(|s| s.is_success).count()
    }

    pub fn failed_requests(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_success).count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.successful_requests() as f64 / self.samples.len() as f64 * 100.0
    }

    pub fn duration(&self) -> chrono::Duration {
        self.taken - self.started
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: u64 = self.samples.iter().map(|s| s.latency_ms).sum();
        total as f64 / self.samples.len() as f64
    }

    pub fn min_latency_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.latency_ms).min().unwrap_or(0)
    }

    pub fn max_latency_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.latency_ms).max().unwrap_or(0)
    }

    pub fn percentile_latency_ms(&self, p: f64) -> u64 {
        let latencies: Vec<u64> = self.samples.iter().map(|s| s.latency_ms).collect();
        percentile(&latencies, p)
    }

    /// Failed samples grouped by error message, descending by occurrence.
    /// Samples without a message group under `"Unknown"`.
    pub fn error_frequencies(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sample in self.samples.iter().filter(|s| !s.is_success) {
            let message = sample.error_message.as_deref().unwrap_or("Unknown");
            *counts.entry(message).or_insert(0) += 1;
        }
        let mut frequencies: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(message, count)| (message.to_string(), count))
            .collect();
        // Secondary sort on the message keeps equal counts stable.
        frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        frequencies
    }
}

/// Thread-safe sink for request observations. Writers append under short
/// exclusive sections; readers clone a consistent snapshot before
/// computing any derived statistic, so reporting never races recording.
pub struct MetricsCollector {
    started: DateTime<Utc>,
    rules: Arc<EndpointRules>,
    samples: RwLock<Vec<RequestSample>>,
    phases: RwLock<HashMap<String, PhaseAggregate>>,
}

impl MetricsCollector {
    pub fn new(rules: EndpointRules) -> Self {
        Self {
            started: Utc::now(),
            rules: Arc::new(rules),
            samples: RwLock::new(Vec::new()),
            phases: RwLock::new(HashMap::new()),
        }
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    /// Record one completed call into the global set and the addressed
    /// phase, creating the phase aggregate on first reference.
    #[allow(clippy::too_many_arguments)]
    pub fn record_request(
        &self,
        phase: &str,
        endpoint: &str,
        method: &str,
        status_code: u16,
        latency_ms: u64,
        is_success: bool,
        error_message: Option<String>,
    ) {
        let sample = RequestSample::new(
            phase,
            endpoint,
            method,
            status_code,
            latency_ms,
            is_success,
            error_message,
        );

        self.samples.write().push(sample.clone());

        let mut phases = self.phases.write();
        let aggregate = phases
            .entry(phase.to_string())
            .or_insert_with(|| PhaseAggregate {
                phase: phase.to_string(),
                user_count: 0,
                start: None,
                end: None,
                samples: Vec::new(),
            });
        aggregate.samples.push(sample);
    }

    /// Open (or re-open) a phase window. Re-issuing for a known phase
    /// reassigns the user count and start time; samples already recorded
    /// under that name are kept.
    pub fn start_phase(&self, phase: &str, user_count: usize) {
        let mut phases = self.phases.write();
        let aggregate = phases
            .entry(phase.to_string())
            .or_insert_with(|| PhaseAggregate {
                phase: phase.to_string(),
                user_count: 0,
                start: None,
                end: None,
                samples: Vec::new(),
            });
        aggregate.user_count = user_count;
        aggregate.start = Some(Utc::now());
        aggregate.end = None;
    }

    /// Seal a phase window and hand back its snapshot for reporting.
    /// Returns `None` when the phase was never started or referenced.
    pub fn end_phase(&self, phase: &str) -> Option<PhaseSnapshot> {
        let mut phases = self.phases.write();
        let aggregate = phases.get_mut(phase)?;
        aggregate.end = Some(Utc::now());
        Some(aggregate.snapshot(Arc::clone(&self.rules)))
    }

    pub fn phase_snapshot(&self, phase: &str) -> Option<PhaseSnapshot> {
        let phases = self.phases.read();
        Some(phases.get(phase)?.snapshot(Arc::clone(&self.rules)))
    }

    /// Copy the whole run state. Phases are ordered by start time, with
    /// never-started phases (samples recorded against an unknown name)
    /// sorted first.
    pub fn run_snapshot(&self) -> RunSnapshot {
        let samples = self.samples.read().clone();
        let mut phases: Vec<PhaseSnapshot> = {
            let guard = self.phases.read();
            guard
                .values()
                .map(|aggregate| aggregate.snapshot(Arc::clone(&self.rules)))
                .collect()
        };
        phases.sort_by_key(|p| p.start);
        RunSnapshot {
            started: self.started,
            taken: Utc::now(),
            samples,
            phases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn collector() -> MetricsCollector {
        MetricsCollector::new(EndpointRules::default_rules())
    }

    #[test]
    fn test_percentile_empty_returns_zero() {
        assert_eq!(percentile(&[], 50.0), 0);
        assert_eq!(percentile(&[], 99.0), 0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        // n = 6: ceil(0.5 * 6) - 1 = 2
        let values = [200, 100, 200, 100, 200, 100];
        assert_eq!(percentile(&values, 50.0), 100);
        // ceil(0.95 * 6) - 1 = 5
        assert_eq!(percentile(&values, 95.0), 200);
        assert_eq!(percentile(&values, 100.0), 200);

        // n = 10: p90 -> ceil(9) - 1 = 8 (ninth value), not interpolated
        let values: Vec<u64> = (1..=10).map(|v| v * 10).collect();
        assert_eq!(percentile(&values, 90.0), 90);
        assert_eq!(percentile(&values, 91.0), 100);
        assert_eq!(percentile(&values, 1.0), 10);
    }

    #[test]
    fn test_percentile_single_sample() {
        assert_eq!(percentile(&[42], 1.0), 42);
        assert_eq!(percentile(&[42], 50.0), 42);
        assert_eq!(percentile(&[42], 100.0), 42);
    }

    #[test]
    fn test_record_creates_phase_on_first_reference() {
        let collector = collector();
        collector.record_request("warmup", "/api/v1/forms", "GET", 200, 12, true, None);
        let snapshot = collector.phase_snapshot("warmup").unwrap();
        assert_eq!(snapshot.total_requests(), 1);
        assert!(snapshot.start.is_none());
        assert_eq!(snapshot.requests_per_second(), 0.0);
    }

    #[test]
    fn test_start_phase_reset_keeps_samples() {
        let collector = collector();
        collector.start_phase("p1", 10);
        collector.record_request("p1", "/api/v1/forms", "GET", 200, 30, true, None);
        collector.start_phase("p1", 25);

        let snapshot = collector.phase_snapshot("p1").unwrap();
        assert_eq!(snapshot.user_count, 25);
        assert_eq!(snapshot.total_requests(), 1);
        assert!(snapshot.end.is_none());
    }

    #[test]
    fn test_end_phase_unknown_is_noop() {
        let collector = collector();
        assert!(collector.end_phase("never-started").is_none());
    }

    #[test]
    fn test_end_phase_seals_window() {
        let collector = collector();
        collector.start_phase("p1", 2);
        collector.record_request("p1", "/api/v1/forms", "GET", 200, 30, true, None);
        let snapshot = collector.end_phase("p1").unwrap();
        assert!(snapshot.start.is_some());
        assert!(snapshot.end.is_some());
        assert!(snapshot.duration().is_some());
    }

    #[test]
    fn test_phase_stats() {
        let collector = collector();
        collector.start_phase("p1", 2);
        collector.record_request("p1", "/api/v1/forms", "POST", 201, 100, true, None);
        collector.record_request("p1", "/api/v1/forms", "POST", 201, 300, true, None);
        collector.record_request(
            "p1",
            "/api/v1/forms",
            "POST",
            500,
            200,
            false,
            Some("HTTP 500: boom".into()),
        );
        let snapshot = collector.end_phase("p1").unwrap();

        assert_eq!(snapshot.total_requests(), 3);
        assert_eq!(snapshot.successful_requests(), 2);
        assert_eq!(snapshot.failed_requests(), 1);
        assert!((snapshot.success_rate() - 66.666).abs() < 0.01);
        assert!((snapshot.avg_latency_ms() - 200.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.min_latency_ms(), 100);
        assert_eq!(snapshot.max_latency_ms(), 300);
        assert_eq!(snapshot.percentile_latency_ms(50.0), 200);
    }

    #[test]
    fn test_endpoint_breakdown_normalizes_ids() {
        let collector = collector();
        collector.start_phase("p1", 1);
        collector.record_request(
            "p1",
            "/api/v1/forms/64f1a2b3c4d5e6f7a8b9c0d1",
            "GET",
            200,
            10,
            true,
            None,
        );
        collector.record_request(
            "p1",
            "/api/v1/forms/0123456789abcdef01234567",
            "GET",
            200,
            20,
            true,
            None,
        );
        collector.record_request("p1", "/api/v1/forms", "GET", 200, 30, true, None);

        let snapshot = collector.end_phase("p1").unwrap();
        let breakdown = snapshot.endpoint_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown["GET /api/v1/forms/{id}"].total, 2);
        assert_eq!(breakdown["GET /api/v1/forms"].total, 1);
        assert!((breakdown["GET /api/v1/forms/{id}"].avg_latency_ms() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_recording_loses_nothing() {
        const PRODUCERS: usize = 16;
        const PER_PRODUCER: usize = 500;

        let collector = Arc::new(collector());
        collector.start_phase("stress", PRODUCERS);

        let mut handles = Vec::new();
        for producer in 0..PRODUCERS {
            let collector = Arc::clone(&collector);
            handles.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    collector.record_request(
                        "stress",
                        "/api/v1/forms",
                        "GET",
                        200,
                        (producer * PER_PRODUCER + i) as u64 % 250,
                        true,
                        None,
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = collector.end_phase("stress").unwrap();
        assert_eq!(snapshot.total_requests(), PRODUCERS * PER_PRODUCER);
        assert_eq!(
            collector.run_snapshot().total_requests(),
            PRODUCERS * PER_PRODUCER
        );
    }

    #[test]
    fn test_run_snapshot_orders_phases_by_start() {
        let collector = collector();
        collector.start_phase("first", 1);
        std::thread::sleep(std::time::Duration::from_millis(2));
        collector.start_phase("second", 1);
        collector.end_phase("first");
        collector.end_phase("second");

        let snapshot = collector.run_snapshot();
        let names: Vec<&str> = snapshot.phases.iter().map(|p| p.phase.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_error_frequencies_sorted_descending() {
        let collector = collector();
        for _ in 0..3 {
            collector.record_request(
                "p1",
                "/api/v1/forms",
                "GET",
                0,
                10,
                false,
                Some("Request timeout".into()),
            );
        }
        collector.record_request(
            "p1",
            "/api/v1/forms",
            "GET",
            500,
            10,
            false,
            Some("HTTP 500: boom".into()),
        );
        collector.record_request("p1", "/api/v1/forms", "GET", 400, 10, false, None);

        let frequencies = collector.run_snapshot().error_frequencies();
        assert_eq!(frequencies[0], ("Request timeout".to_string(), 3));
        assert_eq!(frequencies.len(), 3);
        assert!(frequencies.iter().any(|(m, c)| m == "Unknown" && *c == 1));
    }
}
