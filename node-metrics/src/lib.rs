//! A small facade over `prometheus` mirroring the `OpMetrics` idiom: each
//! component registers one `OpMetrics::new_and_registered("component")`
//! and pulls named counters/gauges/histograms off it lazily, instead of
//! declaring a `lazy_static!` per metric.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct OpMetrics {
    module: &'static str,
    counters: Lazy<Mutex<HashMap<String, IntCounterVec>>>,
    gauges: Lazy<Mutex<HashMap<String, IntGaugeVec>>>,
    histograms: Lazy<Mutex<HashMap<String, HistogramVec>>>,
}

impl OpMetrics {
    pub const fn new_and_registered(module: &'static str) -> Self {
        Self {
            module,
            counters: Lazy::new(|| Mutex::new(HashMap::new())),
            gauges: Lazy::new(|| Mutex::new(HashMap::new())),
            histograms: Lazy::new(|| Mutex::new(HashMap::new())),
        }
    }

    pub fn counter(&self, name: &str) -> prometheus::IntCounter {
        let mut map = self.counters.lock().expect("metrics poisoned");
        map.entry(name.to_string())
            .or_insert_with(|| {
                register_int_counter_vec!(
                    format!("{}_{}", self.module, name),
                    format!("{} {}", self.module, name),
                    &[]
                )
                .expect("failed to register counter")
            })
            .with_label_values(&[])
    }

    pub fn gauge(&self, name: &str) -> prometheus::IntGauge {
        let mut map = self.gauges.lock().expect("metrics poisoned");
        map.entry(name.to_string())
            .or_insert_with(|| {
                register_int_gauge_vec!(
                    format!("{}_{}", self.module, name),
                    format!("{} {}", self.module, name),
                    &[]
                )
                .expect("failed to register gauge")
            })
            .with_label_values(&[])
    }

    pub fn histogram(&self, name: &str) -> prometheus::Histogram {
        let mut map = self.histograms.lock().expect("metrics poisoned");
        map.entry(name.to_string())
            .or_insert_with(|| {
                register_histogram_vec!(
                    format!("{}_{}", self.module, name),
                    format!("{} {}", self.module, name),
                    &[]
                )
                .expect("failed to register histogram")
            })
            .with_label_values(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static OP_COUNTERS: OpMetrics = OpMetrics::new_and_registered("node_metrics_test");

    #[test]
    fn counter_is_idempotent_per_name() {
        OP_COUNTERS.counter("hits").inc();
        OP_COUNTERS.counter("hits").inc();
        assert_eq!(OP_COUNTERS.counter("hits").get(), 2);
    }
}
