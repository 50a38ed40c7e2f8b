use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Request outcome counters, reported by `/status`.
#[derive(Debug, Default)]
pub struct FlowMetrics {
    ingested: AtomicU64,
    ingest_failures: AtomicU64,
    recorded: AtomicU64,
    answered: AtomicU64,
    no_history_answers: AtomicU64,
    degraded_answers: AtomicU64,
    sentiment_requests: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ingested: u64,
    pub ingest_failures: u64,
    pub recorded: u64,
    pub answered: u64,
    pub no_history_answers: u64,
    pub degraded_answers: u64,
    pub sentiment_requests: u64,
}

impl FlowMetrics {
    pub fn record_ingested(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingest_failure(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_answered(&self) {
        self.answered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_history(&self) {
        self.no_history_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded(&self) {
        self.degraded_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sentiment(&self) {
        self.sentiment_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ingested: self.ingested.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            answered: self.answered.load(Ordering::Relaxed),
            no_history_answers: self.no_history_answers.load(Ordering::Relaxed),
            degraded_answers: self.degraded_answers.load(Ordering::Relaxed),
            sentiment_requests: self.sentiment_requests.load(Ordering::Relaxed),
        }
    }
}
