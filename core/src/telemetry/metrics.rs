use serde::Serialize;
use std::sync::Mutex;

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub frames_synced: u64,
    pub sync_errors: u64,
    pub checksum_failures: u64,
    pub duplicates: u64,
    pub sequence_gaps: u64,
    pub packets_dropped: u64,
    pub queue_overflows: u64,
    pub samples_routed: u64,
    pub features_emitted: u64,
    pub labels_emitted: u64,
    pub disconnects: u64,
}

/// Observability counters shared between the reader and consumer threads.
///
/// Every per-packet anomaly lands here instead of unwinding the pipeline;
/// the session owner reads `snapshot()` for diagnostics.
pub struct SessionMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_frame_synced(&self) {
        self.update(|m| m.frames_synced += 1);
    }

    pub fn add_sync_errors(&self, count: u64) {
        if count > 0 {
            self.update(|m| m.sync_errors += count);
        }
    }

    pub fn record_checksum_failure(&self) {
        self.update(|m| m.checksum_failures += 1);
    }

    pub fn record_duplicate(&self) {
        self.update(|m| m.duplicates += 1);
    }

    pub fn record_sequence_gap(&self, dropped: u64) {
        self.update(|m| {
            m.sequence_gaps += 1;
            m.packets_dropped += dropped;
        });
    }

    pub fn record_queue_overflow(&self) {
        self.update(|m| m.queue_overflows += 1);
    }

    pub fn record_sample_routed(&self) {
        self.update(|m| m.samples_routed += 1);
    }

    pub fn record_features_emitted(&self) {
        self.update(|m| m.features_emitted += 1);
    }

    pub fn record_label_emitted(&self) {
        self.update(|m| m.labels_emitted += 1);
    }

    pub fn record_disconnect(&self) {
        self.update(|m| m.disconnects += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = SessionMetrics::new();
        metrics.record_frame_synced();
        metrics.record_frame_synced();
        metrics.record_sequence_gap(2);
        metrics.record_queue_overflow();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_synced, 2);
        assert_eq!(snapshot.sequence_gaps, 1);
        assert_eq!(snapshot.packets_dropped, 2);
        assert_eq!(snapshot.queue_overflows, 1);
        assert_eq!(snapshot.checksum_failures, 0);
    }

    #[test]
    fn snapshot_serializes_for_the_bridge() {
        let metrics = SessionMetrics::new();
        metrics.record_duplicate();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["duplicates"], 1);
    }
}
