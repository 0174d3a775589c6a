//! Prometheus metrics for a vouch node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] so that several nodes in one
//! process (a simulation, a test) never collide on metric names.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// The admission threshold is exported in thousandths.
pub const THRESHOLD_SCALE: f64 = 1_000.0;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub frames_received: IntCounter,
    /// Frames dropped by the link as duplicates or out of order.
    pub frames_dropped: IntCounter,
    pub retransmissions: IntCounter,
    pub introductions_requested: IntCounter,
    pub introductions_completed: IntCounter,
    pub introductions_denied: IntCounter,
    /// Offers this node accepted as a target.
    pub offers_accepted: IntCounter,
    pub offers_refused: IntCounter,
    pub protocol_faults: IntCounter,
    pub feedback_applied: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub open_links: IntGauge,
    pub admission_threshold: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Handshakes needed by successful chains.
    pub chain_hop_depth: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .expect("failed to register counter")
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
        .expect("failed to register gauge")
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let frames_received = counter(&registry, "vouch_frames_received_total", "Frames decoded from channels");
        let frames_dropped = counter(
            &registry,
            "vouch_frames_dropped_total",
            "Sequenced frames dropped as duplicate or out of order",
        );
        let retransmissions = counter(
            &registry,
            "vouch_retransmissions_total",
            "Unacknowledged messages re-sent by links",
        );
        let introductions_requested = counter(
            &registry,
            "vouch_introductions_requested_total",
            "Introductions this node asked for",
        );
        let introductions_completed = counter(
            &registry,
            "vouch_introductions_completed_total",
            "Introductions that ended with a usable link or route",
        );
        let introductions_denied = counter(
            &registry,
            "vouch_introductions_denied_total",
            "Introductions that were denied or exhausted",
        );
        let offers_accepted = counter(&registry, "vouch_offers_accepted_total", "Offers accepted as target");
        let offers_refused = counter(&registry, "vouch_offers_refused_total", "Offers refused as target");
        let protocol_faults = counter(&registry, "vouch_protocol_faults_total", "Invariant violations by peers");
        let feedback_applied = counter(
            &registry,
            "vouch_feedback_applied_total",
            "Feedback verdicts applied to local reputation",
        );

        let open_links = gauge(&registry, "vouch_open_links", "Links not yet closed");
        let admission_threshold = gauge(
            &registry,
            "vouch_admission_threshold_milli",
            "Current admission threshold in thousandths",
        );

        let chain_hop_depth = register_histogram_with_registry!(
            HistogramOpts::new(
                "vouch_chain_hop_depth",
                "Handshakes needed to reach a chain destination"
            )
            .buckets(prometheus::linear_buckets(0.0, 1.0, 10).unwrap()),
            registry
        )
        .expect("failed to register chain_hop_depth histogram");

        Self {
            registry,
            frames_received,
            frames_dropped,
            retransmissions,
            introductions_requested,
            introductions_completed,
            introductions_denied,
            offers_accepted,
            offers_refused,
            protocol_faults,
            feedback_applied,
            open_links,
            admission_threshold,
            chain_hop_depth,
        }
    }

    pub fn set_threshold(&self, threshold: f64) {
        self.admission_threshold
            .set((threshold * THRESHOLD_SCALE).round() as i64);
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_under_own_registry() {
        let a = NodeMetrics::new();
        let b = NodeMetrics::new();
        a.frames_received.inc();
        assert_eq!(a.frames_received.get(), 1);
        assert_eq!(b.frames_received.get(), 0);
        assert!(!a.registry.gather().is_empty());
    }

    #[test]
    fn threshold_is_scaled() {
        let metrics = NodeMetrics::new();
        metrics.set_threshold(-0.1);
        assert_eq!(metrics.admission_threshold.get(), -100);
    }
}
