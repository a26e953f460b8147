/// Formats a byte count for humans, e.g. `640 bytes` or `1.50 KB`.
pub fn bytes2hr(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if size < KB * KB {
        format!("{:.2} KB", size / KB)
    } else if size < KB * KB * KB {
        format!("{:.2} MB", size / (KB * KB))
    } else {
        format!("{:.2} GB", size / (KB * KB * KB))
    }
}

/// Formats a ratio in `0.0..=1.0` as a percentage.
pub fn ratio2hr(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}
