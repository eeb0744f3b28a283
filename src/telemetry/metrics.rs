//! Metric instrument factories for calltrack-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"calltrack-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("calltrack-rs")
}

/// Counter: callback record mutations.
/// Labels: `operation` ("create" | "update" | "delete").
pub fn callback_mutations() -> Counter<u64> {
    meter()
        .u64_counter("calltrack.callbacks.mutations")
        .with_description("Number of callback record mutations")
        .build()
}

/// Counter: claim and unclaim attempts by outcome.
/// Labels: `operation` ("claim" | "unclaim"),
/// `outcome` ("granted" | "idempotent" | "conflict" | "released" | "forbidden").
pub fn claim_attempts() -> Counter<u64> {
    meter()
        .u64_counter("calltrack.claims.attempts")
        .with_description("Number of claim/unclaim attempts by outcome")
        .build()
}

/// Counter: activity entries recorded.
/// Labels: `type` (the activity type).
pub fn activities_recorded() -> Counter<u64> {
    meter()
        .u64_counter("calltrack.activities.recorded")
        .with_description("Number of activity log entries recorded")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("calltrack.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
