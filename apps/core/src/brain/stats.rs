//! Small descriptive-statistics helpers shared by the profiler and handlers.

/// z-score for a two-sided 95% confidence interval.
pub const Z_95: f64 = 1.96;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// 95% margin of error: `1.96 * sigma / sqrt(n)`.
pub fn margin_of_error(std_dev: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    Z_95 * (std_dev / (n as f64).sqrt())
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Stage-to-stage conversion label with one decimal, `"0"` for an empty stage.
pub fn conversion_label(part: usize, whole: usize) -> String {
    if whole == 0 {
        "0".to_string()
    } else {
        format!("{:.1}", percent(part, whole))
    }
}
