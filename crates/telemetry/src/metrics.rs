//! Prometheus metrics for the ingestion pipeline.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, Registry, TextEncoder};

/// Metrics collector for the Starkscope service.
///
/// Each instance carries its own registry, so tests can construct as many
/// collectors as they like without name collisions.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    poll_cycles: IntCounter,
    blocks_ingested: IntCounter,
    transactions_inserted: IntCounter,
    transactions_duplicate: IntCounter,
    transactions_failed: IntCounter,
    rpc_errors: IntCounter,
    rpc_latency: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let poll_cycles = IntCounter::new(
            "starkscope_poll_cycles_total",
            "Total number of completed poll cycles",
        )?;
        registry.register(Box::new(poll_cycles.clone()))?;

        let blocks_ingested = IntCounter::new(
            "starkscope_blocks_ingested_total",
            "Total number of blocks ingested",
        )?;
        registry.register(Box::new(blocks_ingested.clone()))?;

        let transactions_inserted = IntCounter::new(
            "starkscope_transactions_inserted_total",
            "Total number of transactions newly stored",
        )?;
        registry.register(Box::new(transactions_inserted.clone()))?;

        let transactions_duplicate = IntCounter::new(
            "starkscope_transactions_duplicate_total",
            "Total number of re-polled transactions skipped as duplicates",
        )?;
        registry.register(Box::new(transactions_duplicate.clone()))?;

        let transactions_failed = IntCounter::new(
            "starkscope_transactions_failed_total",
            "Total number of transactions that failed enrichment or storage",
        )?;
        registry.register(Box::new(transactions_failed.clone()))?;

        let rpc_errors = IntCounter::new(
            "starkscope_rpc_errors_total",
            "Total number of failed RPC calls",
        )?;
        registry.register(Box::new(rpc_errors.clone()))?;

        let rpc_latency = HistogramVec::new(
            HistogramOpts::new(
                "starkscope_rpc_latency_seconds",
                "RPC call latency in seconds",
            ),
            &["method"],
        )?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            poll_cycles,
            blocks_ingested,
            transactions_inserted,
            transactions_duplicate,
            transactions_failed,
            rpc_errors,
            rpc_latency,
        })
    }

    pub fn inc_poll_cycles(&self) {
        self.poll_cycles.inc();
    }

    pub fn inc_blocks_ingested(&self) {
        self.blocks_ingested.inc();
    }

    pub fn inc_transactions_inserted(&self, count: u64) {
        self.transactions_inserted.inc_by(count);
    }

    pub fn inc_transactions_duplicate(&self, count: u64) {
        self.transactions_duplicate.inc_by(count);
    }

    pub fn inc_transactions_failed(&self, count: u64) {
        self.transactions_failed.inc_by(count);
    }

    pub fn inc_rpc_errors(&self) {
        self.rpc_errors.inc();
    }

    pub fn observe_rpc_latency(&self, method: &str, duration_secs: f64) {
        self.rpc_latency
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// Render the registry in Prometheus text format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collectors_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.inc_poll_cycles();
        a.inc_transactions_inserted(3);

        let rendered = a.gather().unwrap();
        assert!(rendered.contains("starkscope_poll_cycles_total 1"));
        assert!(rendered.contains("starkscope_transactions_inserted_total 3"));

        let other = b.gather().unwrap();
        assert!(other.contains("starkscope_poll_cycles_total 0"));
    }
}
