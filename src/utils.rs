use std::time::{Duration, Instant};

/// Format a `Duration` as a human-readable string with automatic unit scaling.
///
/// Produces output like `1.94ms` or `2.34s` using Rust's Debug format.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Log a warning when a stage took longer than `threshold`, returning the elapsed time.
pub fn warn_if_slow(start: Instant, threshold: Duration, stage: &str) -> Duration {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(
            stage,
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "stage ran slower than expected"
        );
    }
    elapsed
}
