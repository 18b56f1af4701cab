//! Metrics aggregation: the sink interface for impression counts, the lifecycle gauges, and the
//! inbound usage-bucket shape submitted by federated downstream proxies.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The impression-count capability consumed by the proxy core.
///
/// Increments are fire-and-forget; a metrics-export collaborator owns periodic flushing and
/// serialization. Implementations must tolerate concurrent calls.
pub trait MetricsSink {
    /// Record one yes/no evaluation for the named toggle.
    fn count(&self, name: &str, enabled: bool);

    /// Record one variant assignment for the named toggle.
    fn count_variant(&self, name: &str, variant_name: &str);

    /// Begin periodic flushing. Called once, when the evaluation engine becomes ready.
    fn start(&self);
}

impl<T: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<T> {
    fn count(&self, name: &str, enabled: bool) {
        (**self).count(name, enabled)
    }

    fn count_variant(&self, name: &str, variant_name: &str) {
        (**self).count_variant(name, variant_name)
    }

    fn start(&self) {
        (**self).start()
    }
}

/// A gauge holding a single epoch-millisecond timestamp. Never resets; holds only the most
/// recent value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn set(&self, epoch_ms: i64) {
        self.0.store(epoch_ms, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Process-wide metrics state, explicitly owned and injected into the components that update it.
/// Read by an external metrics-exposition endpoint.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// When the engine last checked upstream for definitions, whether or not anything changed.
    pub last_metrics_fetch: Gauge,
    /// When the engine last received an actual definition update.
    pub last_metrics_update: Gauge,
    /// Indication that the service is up.
    pub proxy_up: Counter,
}

impl MetricsRegistry {
    pub fn new() -> MetricsRegistry {
        let registry = MetricsRegistry::default();
        registry.proxy_up.inc(1);
        registry
    }
}

/// A metrics submission from a federated downstream proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMetrics {
    pub bucket: Bucket,
}

/// A batched summary of yes/no/variant evaluation counts.
///
/// Maps are ordered: [`Client::register_metrics`](crate::Client::register_metrics) expands
/// entries in the order they were received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub toggles: IndexMap<String, ToggleCounts>,
}

/// Counts accumulated for a single toggle within a bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToggleCounts {
    #[serde(default)]
    pub yes: u64,
    #[serde(default)]
    pub no: u64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variants: IndexMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauges_hold_only_the_most_recent_value() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.last_metrics_fetch.get(), 0);

        registry.last_metrics_fetch.set(1_000);
        registry.last_metrics_fetch.set(2_000);
        assert_eq!(registry.last_metrics_fetch.get(), 2_000);
        assert_eq!(registry.last_metrics_update.get(), 0);
    }

    #[test]
    fn registry_reports_up_on_construction() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.proxy_up.get(), 1);
    }

    #[test]
    fn bucket_preserves_received_key_order() {
        let metrics: ClientMetrics = serde_json::from_str(
            r#"{
                "bucket": {
                    "toggles": {
                        "zeta": { "yes": 1 },
                        "alpha": { "no": 2, "variants": { "variantB": 1, "variantA": 2 } }
                    }
                }
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = metrics.bucket.toggles.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);

        let alpha = &metrics.bucket.toggles["alpha"];
        assert_eq!(alpha.yes, 0);
        assert_eq!(alpha.no, 2);
        let variants: Vec<&str> = alpha.variants.keys().map(String::as_str).collect();
        assert_eq!(variants, ["variantB", "variantA"]);
    }
}
