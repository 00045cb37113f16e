//! Fire-and-forget bid-response/win-event sink.
//!
//! Producer side appends to a lock-guarded buffer; once it reaches its
//! configured size the producer swaps it out and hands the batch to a
//! bounded worker pool. A full flush queue drops the batch rather than
//! blocking the auction path — telemetry must never add latency to a live
//! request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::rtb::bid_response::MediaType;

/// `{bid_response}` fires once per dispatched bidder, carrying whatever the
/// dispatcher observed; `{win}` fires once per impression that actually
/// cleared, carrying the publisher-visible (marked-down) price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BidResponse,
    Win,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BidEvent {
    pub auction_id: String,
    pub bidder_code: String,
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub had_bid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_cpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_cpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub had_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Default)]
pub struct EventRecorderStats {
    pub total_events: u64,
    pub flushed_events: u64,
    pub dropped_events: u64,
    pub dropped_batches: u64,
    pub buffered_events: u64,
    pub queued_batches: u64,
}

struct Counters {
    total_events: AtomicU64,
    flushed_events: AtomicU64,
    dropped_events: AtomicU64,
    dropped_batches: AtomicU64,
    queued_batches: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            total_events: AtomicU64::new(0),
            flushed_events: AtomicU64::new(0),
            dropped_events: AtomicU64::new(0),
            dropped_batches: AtomicU64::new(0),
            queued_batches: AtomicU64::new(0),
        }
    }
}

pub struct EventRecorderConfig {
    pub url: String,
    pub buffer_size: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    pub batch_deadline: Duration,
}

impl Default for EventRecorderConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            buffer_size: 100,
            workers: 2,
            queue_capacity: 10,
            batch_deadline: Duration::from_secs(2),
        }
    }
}

pub struct EventRecorder {
    config: EventRecorderConfig,
    http: reqwest::Client,
    buffer: Mutex<Vec<BidEvent>>,
    counters: Arc<Counters>,
    sender: Mutex<Option<mpsc::Sender<Vec<BidEvent>>>>,
    worker_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl EventRecorder {
    pub fn new(config: EventRecorderConfig, http: reqwest::Client) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let mut worker_handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let receiver = receiver.clone();
            let http = http.clone();
            let url = config.url.clone();
            let deadline = config.batch_deadline;
            let counters = counters.clone();

            worker_handles.push(tokio::spawn(async move {
                loop {
                    let batch = receiver.lock().await.recv().await;
                    let Some(batch) = batch else {
                        debug!(worker_id, "event recorder worker shutting down");
                        break;
                    };
                    Self::flush_batch(&http, &url, deadline, &batch, &counters).await;
                }
            }));
        }

        Arc::new(Self {
            config,
            http,
            buffer: Mutex::new(Vec::new()),
            counters,
            sender: Mutex::new(Some(sender)),
            worker_handles: Mutex::new(worker_handles),
        })
    }

    async fn flush_batch(http: &reqwest::Client, url: &str, deadline: Duration, batch: &[BidEvent], counters: &Counters) {
        if url.is_empty() {
            counters.flushed_events.fetch_add(batch.len() as u64, Ordering::Relaxed);
            return;
        }

        let send = http.post(url).json(batch).send();
        match tokio::time::timeout(deadline, send).await {
            Ok(Ok(_response)) => {
                counters.flushed_events.fetch_add(batch.len() as u64, Ordering::Relaxed);
            }
            Ok(Err(_err)) | Err(_) => {
                // errors are absorbed silently; telemetry delivery is best-effort.
            }
        }
    }

    /// Append an event to the producer buffer, swapping and enqueueing a
    /// batch once the buffer reaches its configured size.
    pub fn record(&self, event: BidEvent) {
        self.counters.total_events.fetch_add(1, Ordering::Relaxed);

        let batch = {
            let mut buffer = self.buffer.lock();
            buffer.push(event);
            if buffer.len() >= self.config.buffer_size {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(batch) = batch {
            self.enqueue(batch);
        }
    }

    fn enqueue(&self, batch: Vec<BidEvent>) {
        let len = batch.len() as u64;

        if self.config.queue_capacity == 0 {
            self.counters.dropped_batches.fetch_add(1, Ordering::Relaxed);
            self.counters.dropped_events.fetch_add(len, Ordering::Relaxed);
            return;
        }

        let result = match self.sender.lock().as_ref() {
            Some(sender) => sender.try_send(batch),
            None => {
                self.counters.dropped_batches.fetch_add(1, Ordering::Relaxed);
                self.counters.dropped_events.fetch_add(len, Ordering::Relaxed);
                return;
            }
        };

        match result {
            Ok(()) => {
                self.counters.queued_batches.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.counters.dropped_batches.fetch_add(1, Ordering::Relaxed);
                self.counters.dropped_events.fetch_add(len, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> EventRecorderStats {
        EventRecorderStats {
            total_events: self.counters.total_events.load(Ordering::Relaxed),
            flushed_events: self.counters.flushed_events.load(Ordering::Relaxed),
            dropped_events: self.counters.dropped_events.load(Ordering::Relaxed),
            dropped_batches: self.counters.dropped_batches.load(Ordering::Relaxed),
            buffered_events: self.buffer.lock().len() as u64,
            queued_batches: self.counters.queued_batches.load(Ordering::Relaxed),
        }
    }

    /// Flushes whatever remains in the producer buffer synchronously, then
    /// signals workers to stop and waits for them to drain.
    pub async fn close(&self) {
        let remaining = {
            let mut buffer = self.buffer.lock();
            std::mem::take(&mut *buffer)
        };
        if !remaining.is_empty() {
            Self::flush_batch(&self.http, &self.config.url, self.config.batch_deadline, &remaining, &self.counters).await;
        }

        self.sender.lock().take();

        let handles = std::mem::take(&mut *self.worker_handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}
