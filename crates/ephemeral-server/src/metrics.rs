//! Counters, latency timers and Prometheus text formatting.
//!
//! The registry and the HTTP layer record into lock-free atomics; the
//! exposition format is produced here on scrape.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use ephemeral_core::TaskStatus;

use crate::state::AppState;

/// Bucket bounds (seconds) for in-memory registry operations.
pub const OPERATION_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Bucket bounds (seconds) for whole HTTP requests.
pub const REQUEST_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Legal status transitions, in exposition order.
const TRANSITIONS: [(TaskStatus, TaskStatus); 4] = [
    (TaskStatus::Pending, TaskStatus::Running),
    (TaskStatus::Pending, TaskStatus::Failed),
    (TaskStatus::Running, TaskStatus::Completed),
    (TaskStatus::Running, TaskStatus::Failed),
];

/// Cumulative histogram over fixed bucket bounds.
#[derive(Debug)]
pub struct Histogram {
    bounds: &'static [f64],
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    sum_nanos: AtomicU64,
}

impl Histogram {
    /// Create an empty histogram with the given upper bounds (seconds).
    pub fn new(bounds: &'static [f64]) -> Self {
        Self {
            bounds,
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
        }
    }

    /// Record one observation.
    pub fn observe(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            if secs <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all observations.
    pub fn sum(&self) -> Duration {
        Duration::from_nanos(self.sum_nanos.load(Ordering::Relaxed))
    }

    fn write_prometheus(&self, output: &mut String, name: &str, labels: &str) {
        let sep = if labels.is_empty() { "" } else { "," };
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            writeln!(
                output,
                "{name}_bucket{{{labels}{sep}le=\"{bound}\"}} {}",
                bucket.load(Ordering::Relaxed)
            )
            .ok();
        }
        let count = self.count();
        writeln!(output, "{name}_bucket{{{labels}{sep}le=\"+Inf\"}} {count}").ok();
        if labels.is_empty() {
            writeln!(output, "{name}_sum {}", self.sum().as_secs_f64()).ok();
            writeln!(output, "{name}_count {count}").ok();
        } else {
            writeln!(output, "{name}_sum{{{labels}}} {}", self.sum().as_secs_f64()).ok();
            writeln!(output, "{name}_count{{{labels}}} {count}").ok();
        }
    }
}

/// Registry operations that carry a latency timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    List,
    UpdateStatus,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Get,
        Operation::List,
        Operation::UpdateStatus,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::List => "list",
            Self::UpdateStatus => "update_status",
            Self::Delete => "delete",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters and timers owned by the task registry.
#[derive(Debug)]
pub struct RegistryMetrics {
    tasks_created: AtomicU64,
    tasks_deleted: AtomicU64,
    transitions: [AtomicU64; TRANSITIONS.len()],
    latency: [Histogram; Operation::ALL.len()],
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self {
            tasks_created: AtomicU64::new(0),
            tasks_deleted: AtomicU64::new(0),
            transitions: Default::default(),
            latency: Operation::ALL.map(|_| Histogram::new(OPERATION_BUCKETS)),
        }
    }

    pub(crate) fn record_created(&self) {
        self.tasks_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deleted(&self) {
        self.tasks_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transition(&self, from: TaskStatus, to: TaskStatus) {
        if let Some(idx) = TRANSITIONS.iter().position(|edge| *edge == (from, to)) {
            self.transitions[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Start a timer that records into `op`'s histogram when dropped.
    pub(crate) fn time(&self, op: Operation) -> OperationTimer<'_> {
        OperationTimer {
            histogram: &self.latency[op.index()],
            start: Instant::now(),
        }
    }

    pub fn tasks_created(&self) -> u64 {
        self.tasks_created.load(Ordering::Relaxed)
    }

    pub fn tasks_deleted(&self) -> u64 {
        self.tasks_deleted.load(Ordering::Relaxed)
    }

    /// Number of committed `from -> to` transitions.
    pub fn transitions(&self, from: TaskStatus, to: TaskStatus) -> u64 {
        TRANSITIONS
            .iter()
            .position(|edge| *edge == (from, to))
            .map_or(0, |idx| self.transitions[idx].load(Ordering::Relaxed))
    }

    pub fn latency(&self, op: Operation) -> &Histogram {
        &self.latency[op.index()]
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records elapsed time into a histogram on drop.
pub struct OperationTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for OperationTimer<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RequestKey {
    method: String,
    endpoint: String,
    status_code: u16,
}

/// Per-request HTTP counters.
#[derive(Debug)]
pub struct HttpMetrics {
    requests: DashMap<RequestKey, u64>,
    duration: Histogram,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            duration: Histogram::new(REQUEST_BUCKETS),
        }
    }

    /// Count one finished request.
    pub fn record(&self, method: &str, endpoint: &str, status_code: u16, elapsed: Duration) {
        let key = RequestKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status_code,
        };
        *self.requests.entry(key).or_insert(0) += 1;
        self.duration.observe(elapsed);
    }

    /// Number of requests seen for a method/endpoint/status triple.
    pub fn requests(&self, method: &str, endpoint: &str, status_code: u16) -> u64 {
        let key = RequestKey {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            status_code,
        };
        self.requests.get(&key).map_or(0, |count| *count)
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect all metrics from AppState and format as Prometheus text.
pub fn collect_metrics(state: &AppState) -> String {
    let mut output = String::new();

    collect_registry_metrics(state, &mut output);
    collect_task_metrics(state, &mut output);
    collect_health_metrics(state, &mut output);
    collect_http_metrics(state, &mut output);

    output
}

fn collect_registry_metrics(state: &AppState, output: &mut String) {
    let metrics = state.registry.metrics();

    writeln!(output, "# HELP ephemeral_tasks_created_total Tasks created").ok();
    writeln!(output, "# TYPE ephemeral_tasks_created_total counter").ok();
    writeln!(output, "ephemeral_tasks_created_total {}", metrics.tasks_created()).ok();

    writeln!(output, "# HELP ephemeral_tasks_deleted_total Tasks deleted").ok();
    writeln!(output, "# TYPE ephemeral_tasks_deleted_total counter").ok();
    writeln!(output, "ephemeral_tasks_deleted_total {}", metrics.tasks_deleted()).ok();

    writeln!(
        output,
        "# HELP ephemeral_task_transitions_total Committed task status transitions"
    )
    .ok();
    writeln!(output, "# TYPE ephemeral_task_transitions_total counter").ok();
    for (from, to) in TRANSITIONS {
        writeln!(
            output,
            "ephemeral_task_transitions_total{{from=\"{from}\",to=\"{to}\"}} {}",
            metrics.transitions(from, to)
        )
        .ok();
    }

    writeln!(
        output,
        "# HELP ephemeral_registry_operation_duration_seconds Registry operation latency"
    )
    .ok();
    writeln!(
        output,
        "# TYPE ephemeral_registry_operation_duration_seconds histogram"
    )
    .ok();
    for op in Operation::ALL {
        metrics.latency(op).write_prometheus(
            output,
            "ephemeral_registry_operation_duration_seconds",
            &format!("operation=\"{}\"", op.as_str()),
        );
    }
}

/// Collect stored task gauges by status.
fn collect_task_metrics(state: &AppState, output: &mut String) {
    let counts = state.registry.status_counts();

    writeln!(output, "# HELP ephemeral_tasks Stored tasks by status").ok();
    writeln!(output, "# TYPE ephemeral_tasks gauge").ok();
    for (status, count) in counts {
        let label = status.as_str().to_lowercase();
        writeln!(output, "ephemeral_tasks{{status=\"{label}\"}} {count}").ok();
    }
}

fn collect_health_metrics(state: &AppState, output: &mut String) {
    writeln!(output, "# TYPE ephemeral_live gauge").ok();
    writeln!(output, "ephemeral_live {}", u8::from(state.health.is_live())).ok();
    writeln!(output, "# TYPE ephemeral_ready gauge").ok();
    writeln!(output, "ephemeral_ready {}", u8::from(state.health.is_ready())).ok();
}

fn collect_http_metrics(state: &AppState, output: &mut String) {
    let http = &state.http_metrics;

    writeln!(output, "# HELP http_requests_total Total HTTP requests").ok();
    writeln!(output, "# TYPE http_requests_total counter").ok();
    let mut rows: Vec<(RequestKey, u64)> = http
        .requests
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();
    rows.sort_by(|a, b| {
        (&a.0.endpoint, &a.0.method, a.0.status_code).cmp(&(&b.0.endpoint, &b.0.method, b.0.status_code))
    });
    for (key, count) in rows {
        writeln!(
            output,
            "http_requests_total{{method=\"{}\",endpoint=\"{}\",status_code=\"{}\"}} {count}",
            key.method, key.endpoint, key.status_code
        )
        .ok();
    }

    writeln!(output, "# HELP http_request_duration_seconds HTTP request duration").ok();
    writeln!(output, "# TYPE http_request_duration_seconds histogram").ok();
    http.duration
        .write_prometheus(output, "http_request_duration_seconds", "");
}
