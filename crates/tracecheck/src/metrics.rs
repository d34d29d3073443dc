//! Metrics collection and reporting using metrics-rs.
//!
//! Records run outcomes and trace sizes, with an in-memory recorder that can
//! print a summary at the end of a CLI invocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge,
};
use parking_lot::RwLock;
use tracecheck_mask::Comparison;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "tracecheck_lines_compared_total",
        Unit::Count,
        "Expected trace lines visited by the comparator"
    );
    describe_counter!(
        "tracecheck_runs_total",
        Unit::Count,
        "Oracle runs by outcome"
    );
    describe_gauge!(
        "tracecheck_expected_lines",
        Unit::Count,
        "Lines in the reference log"
    );
    describe_gauge!(
        "tracecheck_actual_lines",
        Unit::Count,
        "Trace lines extracted from emulator output"
    );
    describe_histogram!(
        "tracecheck_emulator_seconds",
        Unit::Seconds,
        "Emulator wall-clock time"
    );
}

/// Record the outcome of one comparison.
#[allow(clippy::cast_precision_loss)]
pub fn record_comparison(result: &Comparison) {
    let visited = result
        .divergence
        .as_ref()
        .map_or(result.expected_len, |div| div.index + 1);
    counter!("tracecheck_lines_compared_total").increment(visited as u64);

    let outcome = if result.is_match() {
        "match"
    } else {
        "divergence"
    };
    counter!("tracecheck_runs_total", "outcome" => outcome).increment(1);

    gauge!("tracecheck_expected_lines").set(result.expected_len as f64);
    gauge!("tracecheck_actual_lines").set(result.actual_len as f64);
}

/// Record a run that failed before a comparison could be made.
pub fn record_error() {
    counter!("tracecheck_runs_total", "outcome" => "error").increment(1);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

/// Everything recorded during one invocation, keyed by `name{labels}`.
#[derive(Default)]
struct Values {
    counters: BTreeMap<String, u64>,
    gauges: BTreeMap<String, f64>,
    histograms: BTreeMap<String, Vec<f64>>,
}

type Store = Arc<RwLock<Values>>;

/// A registered metric. Counters, gauges and histograms share this type and
/// differ only in which map they write.
struct CliMetric {
    key: String,
    store: Store,
}

impl CliMetric {
    fn update_gauge(&self, f: impl FnOnce(f64) -> f64) {
        let mut values = self.store.write();
        let gauge = values.gauges.entry(self.key.clone()).or_default();
        *gauge = f(*gauge);
    }
}

impl CounterFn for CliMetric {
    fn increment(&self, value: u64) {
        *self.store.write().counters.entry(self.key.clone()).or_default() += value;
    }

    fn absolute(&self, value: u64) {
        self.store.write().counters.insert(self.key.clone(), value);
    }
}

impl GaugeFn for CliMetric {
    fn increment(&self, value: f64) {
        self.update_gauge(|v| v + value);
    }

    fn decrement(&self, value: f64) {
        self.update_gauge(|v| v - value);
    }

    fn set(&self, value: f64) {
        self.update_gauge(|_| value);
    }
}

impl HistogramFn for CliMetric {
    fn record(&self, value: f64) {
        let mut values = self.store.write();
        values.histograms.entry(self.key.clone()).or_default().push(value);
    }
}

/// Recorder that keeps metrics in memory for a terminal summary.
#[derive(Default)]
pub struct CliRecorder {
    store: Store,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder.
    ///
    /// Returns `None` if a global recorder was already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    /// Handle sharing this recorder's storage.
    #[must_use]
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            store: Arc::clone(&self.store),
        }
    }

    fn metric(&self, key: &Key) -> Arc<CliMetric> {
        Arc::new(CliMetric {
            key: key_to_string(key),
            store: Arc::clone(&self.store),
        })
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.metric(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.metric(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.metric(key))
    }
}

/// Read access to metrics held by a [`CliRecorder`].
pub struct CliRecorderHandle {
    store: Store,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.store.read().counters.get(key).copied()
    }

    #[must_use]
    pub fn gauge(&self, key: &str) -> Option<f64> {
        self.store.read().gauges.get(key).copied()
    }

    #[must_use]
    pub fn histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.store.read().histograms.get(key).cloned()
    }

    /// Render collected metrics, sorted by key within each kind.
    #[must_use]
    pub fn summary(&self) -> String {
        let values = self.store.read();
        let mut lines = vec!["## Metrics Summary".to_string()];

        push_section(&mut lines, "Counters", &values.counters, ToString::to_string);
        push_section(&mut lines, "Gauges", &values.gauges, |v| format!("{v:.0}"));
        push_section(&mut lines, "Histograms", &values.histograms, |samples| {
            let total: f64 = samples.iter().sum();
            format!("n={} total={total:.3}s", samples.len())
        });
        drop(values);

        if lines.len() == 1 {
            return "No metrics collected.\n".to_string();
        }
        lines.join("\n") + "\n"
    }

    /// Print [`Self::summary`] to stderr.
    pub fn print_summary(&self) {
        eprintln!();
        eprint!("{}", self.summary());
    }
}

fn push_section<V>(
    lines: &mut Vec<String>,
    title: &str,
    entries: &BTreeMap<String, V>,
    render: impl Fn(&V) -> String,
) {
    if entries.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("### {title}"));
    lines.extend(
        entries
            .iter()
            .map(|(key, value)| format!("  {key}: {}", render(value))),
    );
}

#[cfg(test)]
mod tests {
    use tracecheck_mask::{WildcardPolicy, compare};

    use super::*;

    #[test]
    fn test_records_comparison_locally() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();

        let result = compare(&["A", "B", "C"], &["A", "x"], WildcardPolicy::default());
        metrics::with_local_recorder(&recorder, || record_comparison(&result));

        assert_eq!(handle.counter("tracecheck_lines_compared_total"), Some(2));
        assert_eq!(
            handle.counter("tracecheck_runs_total{outcome=divergence}"),
            Some(1)
        );
        assert_eq!(handle.gauge("tracecheck_expected_lines"), Some(3.0));
        assert_eq!(handle.gauge("tracecheck_actual_lines"), Some(2.0));
    }

    #[test]
    fn test_records_error_locally() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, record_error);
        assert_eq!(
            handle.counter("tracecheck_runs_total{outcome=error}"),
            Some(1)
        );
        assert_eq!(handle.histogram("tracecheck_emulator_seconds"), None);
    }

    #[test]
    fn test_gauge_and_counter_updates() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            gauge!("pending").increment(3.0);
            gauge!("pending").decrement(1.0);
            counter!("seen").increment(5);
            counter!("seen").absolute(2);
        });
        assert_eq!(handle.gauge("pending"), Some(2.0));
        assert_eq!(handle.counter("seen"), Some(2));
    }

    #[test]
    fn test_summary() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();
        assert_eq!(handle.summary(), "No metrics collected.\n");

        let result = compare(&["A", "B"], &["A", "B"], WildcardPolicy::default());
        metrics::with_local_recorder(&recorder, || {
            record_comparison(&result);
            metrics::histogram!("tracecheck_emulator_seconds").record(1.25);
        });

        let expected = "\
## Metrics Summary

### Counters
  tracecheck_lines_compared_total: 2
  tracecheck_runs_total{outcome=match}: 1

### Gauges
  tracecheck_actual_lines: 2
  tracecheck_expected_lines: 2

### Histograms
  tracecheck_emulator_seconds: n=1 total=1.250s
";
        assert_eq!(handle.summary(), expected);
    }
}
