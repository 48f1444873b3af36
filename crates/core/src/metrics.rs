use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Lightweight in-memory metrics using atomic counters.
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub redirects: AtomicU64,
    pub forwarded: AtomicU64,
    pub backend_failures: AtomicU64,
    /// Rejections keyed by error kind.
    rejections: RwLock<BTreeMap<&'static str, AtomicU64>>,
    /// Latency histogram buckets (ms): <100, <500, <1000, <5000, <30000, >=30000.
    pub latency_buckets: [AtomicU64; 6],
    total_latency_ms: AtomicU64,
    created_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            rejections: RwLock::new(BTreeMap::new()),
            latency_buckets: Default::default(),
            total_latency_ms: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, kind: &'static str) {
        if let Ok(map) = self.rejections.read()
            && let Some(counter) = map.get(kind)
        {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if let Ok(mut map) = self.rejections.write() {
            map.entry(kind)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_latency_ms(&self, ms: u128) {
        let bucket = match ms {
            0..=99 => 0,
            100..=499 => 1,
            500..=999 => 2,
            1000..=4999 => 3,
            5000..=29999 => 4,
            _ => 5,
        };
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(u64::try_from(ms).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let rejections = self
            .rejections
            .read()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
                    .collect()
            })
            .unwrap_or_default();
        let labels = ["<100ms", "<500ms", "<1s", "<5s", "<30s", ">=30s"];
        let latency_buckets = labels
            .iter()
            .zip(self.latency_buckets.iter())
            .map(|(label, c)| (label.to_string(), c.load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot {
            uptime_secs: self.created_at.elapsed().as_secs(),
            total_requests,
            redirects: self.redirects.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            rejections,
            avg_latency_ms: if total_requests > 0 {
                total_latency as f64 / total_requests as f64
            } else {
                0.0
            },
            latency_buckets,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub redirects: u64,
    pub forwarded: u64,
    pub backend_failures: u64,
    pub rejections: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    pub latency_buckets: BTreeMap<String, u64>,
}
