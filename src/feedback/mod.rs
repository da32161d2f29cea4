//! Best-effort display and buzzer side effects.
//!
//! Measurement results are echoed to a small display and a buzzer after the
//! measurement completes. Those outputs must never delay or fail a scan, so
//! the dispatcher pushes events into a bounded queue with `try_send` and a
//! dedicated worker thread drains it. A full queue drops the event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::telemetry;

/// Three text lines shown on the display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySummary {
    pub distance: String,
    pub shape: String,
    pub material: String,
}

impl DisplaySummary {
    pub fn new(
        distance: impl Into<String>,
        shape: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            distance: distance.into(),
            shape: shape.into(),
            material: material.into(),
        }
    }
}

/// Side effect requested by the measurement boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Display(DisplaySummary),
    Beep { duration: Duration },
}

/// Output device consuming feedback events on the worker thread.
pub trait FeedbackSink: Send + 'static {
    fn emit(&mut self, event: &FeedbackEvent) -> anyhow::Result<()>;
}

/// Sink used when no display or buzzer is attached; writes to the log.
#[derive(Debug, Default)]
pub struct LogFeedbackSink;

impl FeedbackSink for LogFeedbackSink {
    fn emit(&mut self, event: &FeedbackEvent) -> anyhow::Result<()> {
        match event {
            FeedbackEvent::Display(summary) => log::info!(
                "[Display] Dist: {} | Shape: {} | Mat: {}",
                summary.distance,
                summary.shape,
                summary.material
            ),
            FeedbackEvent::Beep { duration } => {
                log::info!("[Buzzer] beep {} ms", duration.as_millis())
            }
        }
        Ok(())
    }
}

/// Sink collecting events in memory, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<FeedbackEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl FeedbackSink for RecordingSink {
    fn emit(&mut self, event: &FeedbackEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("recording sink poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

/// Bounded, non-blocking dispatcher for feedback events
pub struct FeedbackDispatcher {
    tx: Option<mpsc::Sender<FeedbackEvent>>,
    worker: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl FeedbackDispatcher {
    /// Spawn the worker thread draining a queue of `capacity` events
    pub fn spawn<S: FeedbackSink>(mut sink: S, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<FeedbackEvent>(capacity.max(1));

        let worker = thread::Builder::new()
            .name("feedback".into())
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    if let Err(err) = sink.emit(&event) {
                        log::warn!("[Feedback] Sink failed for {:?}: {:#}", event, err);
                    }
                }
                log::debug!("[Feedback] Worker exiting");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("[Feedback] Failed to spawn worker: {}", err);
                None
            }
        };

        Self {
            tx: worker.as_ref().map(|_| tx),
            worker,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an event without blocking
    ///
    /// # Returns
    /// `true` if queued, `false` if dropped because the queue was full or the
    /// worker is gone.
    pub fn dispatch(&self, event: FeedbackEvent) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            self.record_drop("worker unavailable");
            return false;
        };

        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.record_drop("queue full");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.record_drop("queue closed");
                false
            }
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for queued events to drain
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[Feedback] Worker panicked");
            }
        }
    }

    fn record_drop(&self, reason: &'static str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        log::debug!("[Feedback] Dropping event: {}", reason);
        telemetry::hub().record_feedback_dropped(reason);
    }
}

impl Drop for FeedbackDispatcher {
    fn drop(&mut self) {
        // Worker is detached; it exits once the queue drains.
        self.tx.take();
    }
}
