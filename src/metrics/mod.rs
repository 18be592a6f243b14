//! Metrics aggregator (C7): per-path, per-status counters observed
//! terminally by the dispatcher on every completed request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

struct Inner {
    total_requests: u64,
    per_path: HashMap<String, u64>,
    per_path_per_status: HashMap<String, HashMap<String, u64>>,
}

pub struct Metrics {
    inner: Mutex<Inner>,
    started: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                total_requests: 0,
                per_path: HashMap::new(),
                per_path_per_status: HashMap::new(),
            }),
            started: Instant::now(),
        }
    }

    /// Record one completed request. The only ordering guarantee (spec
    /// §5) is that this runs exactly once before the response is
    /// returned to the client.
    pub fn record(&self, path: &str, status: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_requests += 1;
        *inner.per_path.entry(path.to_string()).or_insert(0) += 1;
        *inner
            .per_path_per_status
            .entry(path.to_string())
            .or_default()
            .entry(status.to_string())
            .or_insert(0) += 1;
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let inner = self.inner.lock().unwrap();
        serde_json::json!({
            "request_count": inner.total_requests,
            "api_endpoints": inner.per_path,
            "status_code_stats": inner.per_path_per_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_total_and_per_path_per_status() {
        let metrics = Metrics::new();
        metrics.record("/users", 200);
        metrics.record("/users", 200);
        metrics.record("/users", 404);
        let snap = metrics.snapshot();
        assert_eq!(snap["request_count"], 3);
        assert_eq!(snap["api_endpoints"]["/users"], 3);
        assert_eq!(snap["status_code_stats"]["/users"]["200"], 2);
        assert_eq!(snap["status_code_stats"]["/users"]["404"], 1);
    }
}
