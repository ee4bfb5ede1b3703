use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::WithdrawalStatus;

const PROCESSING_BUCKETS_MS: [u64; 7] = [50, 100, 250, 500, 1000, 2000, 5000];
const CONFIRMATION_BUCKETS_MS: [u64; 7] = [5, 10, 25, 50, 100, 250, 1000];

/// Fixed-bucket latency histogram in milliseconds
struct Histogram {
    bounds: &'static [u64],
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    sum_ms: AtomicU64,
}

impl Histogram {
    fn new(bounds: &'static [u64]) -> Self {
        Self {
            bounds,
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
        }
    }

    fn observe(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            if ms <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} histogram\n"));
        for (bound, bucket) in self.bounds.iter().zip(&self.buckets) {
            out.push_str(&format!(
                "{name}_bucket{{le=\"{bound}\"}} {}\n",
                bucket.load(Ordering::Relaxed)
            ));
        }
        let count = self.count.load(Ordering::Relaxed);
        out.push_str(&format!("{name}_bucket{{le=\"+Inf\"}} {count}\n"));
        out.push_str(&format!("{name}_sum {}\n", self.sum_ms.load(Ordering::Relaxed)));
        out.push_str(&format!("{name}_count {count}\n\n"));
    }
}

/// Withdrawal counters and latencies, exported on `/metrics`
pub struct Metrics {
    /// Requests recorded as PENDING
    pub requests_pending: AtomicU64,
    /// Requests rejected for insufficient funds
    pub requests_rejected: AtomicU64,
    pub confirmations_confirmed: AtomicU64,
    /// Redelivered confirmations answered with a compensating rejection
    pub confirmations_duplicate: AtomicU64,
    /// Confirmations addressed to an already rejected transaction
    pub confirmations_already_rejected: AtomicU64,
    processing: Histogram,
    confirmation: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_pending: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            confirmations_confirmed: AtomicU64::new(0),
            confirmations_duplicate: AtomicU64::new(0),
            confirmations_already_rejected: AtomicU64::new(0),
            processing: Histogram::new(&PROCESSING_BUCKETS_MS),
            confirmation: Histogram::new(&CONFIRMATION_BUCKETS_MS),
        }
    }

    pub fn record_request(&self, status: WithdrawalStatus, elapsed: Duration) {
        let counter = match status {
            WithdrawalStatus::Rejected => &self.requests_rejected,
            _ => &self.requests_pending,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.processing.observe(elapsed);
    }

    pub fn inc_confirmed(&self, elapsed: Duration) {
        self.confirmations_confirmed.fetch_add(1, Ordering::Relaxed);
        self.confirmation.observe(elapsed);
    }

    pub fn inc_duplicate(&self) {
        self.confirmations_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_already_rejected(&self) {
        self.confirmations_already_rejected
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus text format
    pub fn prometheus(&self) -> String {
        let mut out = format!(
            r#"# HELP pension_withdrawals_requested_total Withdrawal requests received
# TYPE pension_withdrawals_requested_total counter
pension_withdrawals_requested_total{{status="PENDING"}} {}
pension_withdrawals_requested_total{{status="REJECTED",reason="insufficient_funds"}} {}

# HELP pension_withdrawal_confirmation_total Processed withdrawal confirmations
# TYPE pension_withdrawal_confirmation_total counter
pension_withdrawal_confirmation_total{{status="CONFIRMED"}} {}
pension_withdrawal_confirmation_total{{status="REJECTED",reason="already_confirmed"}} {}
pension_withdrawal_confirmation_total{{status="REJECTED",reason="already_rejected"}} {}

"#,
            self.requests_pending.load(Ordering::Relaxed),
            self.requests_rejected.load(Ordering::Relaxed),
            self.confirmations_confirmed.load(Ordering::Relaxed),
            self.confirmations_duplicate.load(Ordering::Relaxed),
            self.confirmations_already_rejected.load(Ordering::Relaxed),
        );
        self.processing.render(
            "pension_withdrawal_processing_duration_ms",
            "Duration of withdrawal request processing in milliseconds",
            &mut out,
        );
        self.confirmation.render(
            "pension_withdrawal_confirmation_duration_ms",
            "Duration of withdrawal confirmation in milliseconds",
            &mut out,
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters_split_by_status() {
        let metrics = Metrics::new();
        metrics.record_request(WithdrawalStatus::Pending, Duration::from_millis(30));
        metrics.record_request(WithdrawalStatus::Rejected, Duration::from_millis(300));
        metrics.record_request(WithdrawalStatus::Pending, Duration::from_millis(70));

        assert_eq!(metrics.requests_pending.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_histogram_buckets_are_cumulative() {
        let metrics = Metrics::new();
        metrics.record_request(WithdrawalStatus::Pending, Duration::from_millis(30));
        metrics.record_request(WithdrawalStatus::Pending, Duration::from_millis(300));
        metrics.record_request(WithdrawalStatus::Pending, Duration::from_secs(60));

        let text = metrics.prometheus();
        assert!(text.contains("pension_withdrawal_processing_duration_ms_bucket{le=\"50\"} 1\n"));
        assert!(text.contains("pension_withdrawal_processing_duration_ms_bucket{le=\"500\"} 2\n"));
        assert!(text.contains("pension_withdrawal_processing_duration_ms_bucket{le=\"+Inf\"} 3\n"));
        assert!(text.contains("pension_withdrawal_processing_duration_ms_count 3\n"));
        assert!(text.contains("pension_withdrawals_requested_total{status=\"PENDING\"} 3\n"));
    }
}
