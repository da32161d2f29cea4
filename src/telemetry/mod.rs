//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes scan, calibration and feedback events into a
//! bounded history plus an async broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::SurfaceClassification;
use crate::calibration::{CalibrationKind, CalibrationWarning};
use crate::measurement::{ScanResult, StableReading};

pub mod events;

pub use events::{DiagnosticError, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        let history_capacity = history_capacity.max(1);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        // A poisoned history only loses the ring buffer, not the broadcast.
        if let Ok(mut history) = self.history.lock() {
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream`; lagging subscribers see `Err(Lagged)` items.
    pub fn stream(&self) -> BroadcastStream<MetricEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let recent = self
            .history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default();
        TelemetrySnapshot {
            recent,
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Top-level hub wrapping the collector with typed recording helpers.
pub struct TelemetryHub {
    collector: TelemetryCollector,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn stream(&self) -> BroadcastStream<MetricEvent> {
        self.collector.stream()
    }

    pub fn record_scan(
        &self,
        result: &ScanResult,
        classification: &SurfaceClassification,
        duration_ms: u64,
    ) {
        self.collector.publish(MetricEvent::ScanCompleted {
            repetitions: result.repetitions,
            valid_readings: result.valid_readings(),
            average: result.overall_mean,
            sigma: result.overall_sigma,
            shape: classification.shape,
            material: classification.material,
            duration_ms,
        });
    }

    pub fn record_scan_failure(&self, repetitions: usize, collected: usize) {
        self.collector.publish(MetricEvent::ScanFailed {
            repetitions,
            collected,
        });
    }

    pub fn record_single_check(&self, reading: &StableReading) {
        self.collector.publish(MetricEvent::SingleCheck {
            distance: reading.mean,
            sigma: reading.local_sigma,
            valid_samples: reading.valid_samples,
        });
    }

    pub fn record_calibration(&self, kind: CalibrationKind, version: u32) {
        self.collector
            .publish(MetricEvent::CalibrationComputed { kind, version });
    }

    pub fn record_calibration_warning(&self, warning: CalibrationWarning) {
        self.collector
            .publish(MetricEvent::CalibrationWarning { warning });
    }

    pub fn record_feedback_dropped(&self, reason: impl Into<String>) {
        self.collector.publish(MetricEvent::FeedbackDropped {
            reason: reason.into(),
        });
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64)
    }
}
