//! Minimal run-time metrics sink.
//!
//! The host process registers a raw callback that receives name/value pairs;
//! until it does, every metric is dropped.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Recorder, SharedString, Unit};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_double};
use std::sync::{Arc, Mutex};

/// Signature for external collectors. `name` is NUL-terminated and only valid
/// for the duration of the call.
pub type StatsCallback = unsafe extern "C" fn(name: *const c_char, value: c_double);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Register a callback from C/other languages. Only the first registration wins.
#[no_mangle]
pub extern "C" fn iptrie_register_stats_callback(cb: StatsCallback) {
    init();
    let _ = CALLBACK.set(cb);
}

fn emit(key: &CString, value: f64) {
    if let Some(cb) = CALLBACK.get() {
        unsafe { cb(key.as_ptr(), value) };
    }
}

/// Forwarding recorder. Uses the callback **if** it was registered.
///
/// Each metric's C name is built on first registration and handed out again
/// for every later `counter!`/`gauge!` call with the same key.
#[derive(Default)]
struct FfiRecorder {
    metrics: Mutex<HashMap<Key, Arc<FfiMetric>>>,
}

impl FfiRecorder {
    fn metric(&self, key: &Key) -> Arc<FfiMetric> {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(metrics.entry(key.clone()).or_insert_with(|| FfiMetric::new(key)))
    }
}

/// One registered metric; the name is converted to a C string once.
struct FfiMetric {
    name: CString,
}

impl FfiMetric {
    fn new(key: &Key) -> Arc<Self> {
        // metric names are crate-internal literals without interior NULs
        let name = CString::new(key.name()).unwrap_or_default();
        Arc::new(Self { name })
    }
}

impl Recorder for FfiRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &metrics::Metadata<'_>) -> Counter {
        Counter::from_arc(self.metric(key))
    }
    fn register_gauge(&self, key: &Key, _metadata: &metrics::Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.metric(key))
    }
    fn register_histogram(&self, key: &Key, _metadata: &metrics::Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.metric(key))
    }
}

impl metrics::CounterFn for FfiMetric {
    fn increment(&self, value: u64) {
        emit(&self.name, value as f64);
    }
    fn absolute(&self, value: u64) {
        emit(&self.name, value as f64);
    }
}

impl metrics::GaugeFn for FfiMetric {
    fn set(&self, value: f64) {
        emit(&self.name, value);
    }
    fn increment(&self, value: f64) {
        emit(&self.name, value);
    }
    fn decrement(&self, value: f64) {
        emit(&self.name, -value);
    }
}

impl metrics::HistogramFn for FfiMetric {
    fn record(&self, value: f64) {
        emit(&self.name, value);
    }
}

/// Install the forwarding recorder exactly **once**.
///
/// Fails silently when the host already installed its own global recorder.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = metrics::set_global_recorder(FfiRecorder::default());
    });
}
