//! Metrics definitions for the indexer.
//!
//! This module defines all metrics used throughout the indexer.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "decode_errors_total",
        "Total number of payloads the ingestion adapter could not decode"
    );
    describe_counter!(
        "batches_indexed_total",
        "Total number of batches successfully committed"
    );
    describe_counter!(
        "blocks_indexed_total",
        "Total number of blocks successfully committed"
    );
    describe_counter!(
        "transfers_extracted_total",
        "Total number of transfers extracted, by kind"
    );
    describe_counter!(
        "fee_events_missing_total",
        "Total number of calls whose extrinsic had no withdrawal event"
    );
    describe_histogram!(
        "batch_processing_duration_seconds",
        "Time taken to process a batch in seconds"
    );
}

/// Record a decode error.
///
/// # Arguments
/// * `error_type` - The type of payload ("event" or "extrinsic")
/// * `pallet` - The pallet name (if known)
pub fn record_decode_error(error_type: &str, pallet: &str) {
    counter!("decode_errors_total", "type" => error_type.to_string(), "pallet" => pallet.to_string())
        .increment(1);
}

/// Record a committed batch and the number of blocks it contained.
pub fn record_batch_indexed(blocks: u64) {
    counter!("batches_indexed_total").increment(1);
    counter!("blocks_indexed_total").increment(blocks);
}

/// Record an extracted transfer.
pub fn record_transfer_extracted(kind: &'static str) {
    counter!("transfers_extracted_total", "kind" => kind).increment(1);
}

/// Record a call whose fee defaulted to zero.
pub fn record_fee_event_missing() {
    counter!("fee_events_missing_total").increment(1);
}

/// Record batch processing duration.
pub fn record_batch_processing_duration(duration_secs: f64) {
    histogram!("batch_processing_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_batch_processing_duration(duration);
    }
}
