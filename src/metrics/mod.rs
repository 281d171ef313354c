//! Prometheus 指标采集，文本格式经 /metrics 暴露

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

pub struct Metrics {
    registry: Registry,

    pub http_requests: Family<HttpLabels, Counter>,
    pub http_duration_seconds: Family<HttpLabels, Histogram>,
    pub http_in_flight: Gauge,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub rate_limit_rejections: Counter,
    pub audit_records: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests_total",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let http_in_flight = Gauge::default();
        registry.register(
            "http_requests_in_progress",
            "HTTP requests currently being processed",
            http_in_flight.clone(),
        );

        let cache_hits = Counter::default();
        registry.register("cache_hits_total", "Cache hit count", cache_hits.clone());

        let cache_misses = Counter::default();
        registry.register(
            "cache_misses_total",
            "Cache miss count",
            cache_misses.clone(),
        );

        let rate_limit_rejections = Counter::default();
        registry.register(
            "rate_limit_rejections_total",
            "Rate limit rejections",
            rate_limit_rejections.clone(),
        );

        let audit_records = Counter::default();
        registry.register(
            "audit_records_total",
            "Audit records written",
            audit_records.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            http_in_flight,
            cache_hits,
            cache_misses,
            rate_limit_rejections,
            audit_records,
        }
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: normalize_path(path),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejections.inc();
    }

    pub fn record_audit(&self) {
        self.audit_records.inc();
    }

    /// 按 Prometheus 文本格式编码全部指标
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // 向 String 编码不会失败
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 将路径中的 ID 段归一化，避免标签基数爆炸
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_id = uuid::Uuid::parse_str(segment).is_ok()
                || (!segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()));
            if is_id { "{id}" } else { segment }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_and_numeric_segments_are_normalized() {
        assert_eq!(
            normalize_path("/api/menu-items/550e8400-e29b-41d4-a716-446655440000"),
            "/api/menu-items/{id}"
        );
        assert_eq!(normalize_path("/api/audit-logs/42"), "/api/audit-logs/{id}");
        assert_eq!(normalize_path("/api/menu-items"), "/api/menu-items");
    }

    #[test]
    fn recorded_metrics_appear_in_the_exposition() {
        let metrics = Metrics::new();
        metrics.record_request("GET", "/api/menu-items", 200, 0.012);
        metrics.record_cache_hit();
        metrics.record_rate_limit_rejection();

        let output = metrics.encode();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("http_request_duration_seconds"));
        assert!(output.contains("cache_hits_total"));
        assert!(output.contains("rate_limit_rejections_total"));
    }
}
