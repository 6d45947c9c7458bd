//! Human-readable duration text for insight messages.

/// Format milliseconds as a compact duration: `850ms`, `45s`, `3m 15s`, `1h 2m`.
///
/// Negative input is treated as zero.
pub fn format_duration(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let total_secs = ms / 1_000;
    let (hours, minutes, seconds) = (total_secs / 3_600, (total_secs % 3_600) / 60, total_secs % 60);
    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
