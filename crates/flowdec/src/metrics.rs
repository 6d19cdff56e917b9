//! Decompilation metrics via metrics-rs.
//!
//! Recording goes through the `metrics` facade and costs nothing unless a
//! recorder is installed. The CLI installs [`CliRecorder`] with `--metrics`.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_histogram, histogram,
};
use parking_lot::RwLock;

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "flowdec_runs_total",
        Unit::Count,
        "Decompilation runs that reached finalize"
    );
    describe_counter!(
        "flowdec_blocks_total",
        Unit::Count,
        "Basic blocks in finalized flow graphs"
    );
    describe_counter!(
        "flowdec_phis_total",
        Unit::Count,
        "Merge placeholders in finalized flow graphs"
    );
    describe_histogram!(
        "flowdec_step_duration_seconds",
        Unit::Seconds,
        "Wall-clock time per decompiler step"
    );
}

/// Record how long one step took.
pub fn record_step(step: &'static str, secs: f64) {
    histogram!("flowdec_step_duration_seconds", "step" => step).record(secs);
}

/// Record a finished run.
pub fn record_run(blocks: usize, phis: usize) {
    counter!("flowdec_runs_total").increment(1);
    counter!("flowdec_blocks_total").increment(blocks as u64);
    counter!("flowdec_phis_total").increment(phis as u64);
}

#[derive(Default)]
struct Storage {
    counters: RwLock<HashMap<String, u64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<Storage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        *self.storage.counters.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.counters.write().insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<Storage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        self.storage
            .histograms
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

struct NoopGauge;

impl metrics::GaugeFn for NoopGauge {
    fn increment(&self, _value: f64) {}
    fn decrement(&self, _value: f64) {}
    fn set(&self, _value: f64) {}
}

/// In-memory recorder that prints a summary for terminal use.
#[derive(Default)]
pub struct CliRecorder {
    storage: Arc<Storage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto this recorder's values.
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            storage: Arc::clone(&self.storage),
        }
    }

    /// Install as the global recorder. `None` if one is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
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
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.storage),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(NoopGauge))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.storage),
        }))
    }
}

/// Read access to the values a [`CliRecorder`] collected.
pub struct CliRecorderHandle {
    storage: Arc<Storage>,
}

impl CliRecorderHandle {
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.storage.counters.read().get(key).copied()
    }

    pub fn histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.storage.histograms.read().get(key).cloned()
    }

    /// Print collected values, sorted by key.
    pub fn print_summary(&self) {
        let counters = self.storage.counters.read();
        let histograms = self.storage.histograms.read();
        if counters.is_empty() && histograms.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        let mut keys: Vec<_> = counters.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {key}: {}", counters[key]);
        }
        let mut keys: Vec<_> = histograms.keys().collect();
        keys.sort();
        for key in keys {
            let values = &histograms[key];
            let total: f64 = values.iter().sum();
            println!("  {key}: count={} total={total:.6}s", values.len());
        }
    }
}
