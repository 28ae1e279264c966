use crate::model::Progress;
use hdrhistogram::Histogram;
use std::time::Duration;

/// Number of response-time samples kept on the live chart.
pub const CHART_WINDOW: usize = 10;

/// Arithmetic mean of the response times, rounded to two decimals (0 when empty).
pub fn average_response_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// The last `n` samples, oldest first.
pub fn last_n(samples: &[f64], n: usize) -> &[f64] {
    &samples[samples.len().saturating_sub(n)..]
}

/// Elapsed/remaining/percentage of a run, clamped so the bar never over- or under-fills.
pub fn compute_progress(elapsed: Duration, declared: Duration) -> Progress {
    let elapsed_secs = elapsed.as_secs();
    let declared_secs = declared.as_secs();
    let percentage = if declared_secs == 0 {
        100.0
    } else {
        (elapsed_secs as f64 / declared_secs as f64 * 100.0).clamp(0.0, 100.0)
    };
    Progress {
        elapsed_secs,
        remaining_secs: declared_secs.saturating_sub(elapsed_secs),
        percentage,
    }
}

/// Mean, median and quartiles of the charted window as `(mean, median, p25, p75)`.
/// Needs at least two samples.
pub fn window_metrics(samples: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Tail percentiles over a full snapshot. Samples are recorded at microsecond precision.
pub fn response_percentiles(samples: &[f64]) -> Option<Percentiles> {
    if samples.is_empty() {
        return None;
    }
    // 1µs .. 1h, 3 significant digits
    let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3).ok()?;
    for ms in samples.iter().filter(|v| v.is_finite()) {
        let us = (ms * 1000.0).round().max(1.0) as u64;
        hist.saturating_record(us);
    }
    if hist.len() == 0 {
        return None;
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let at = |q: f64| hist.value_at_quantile(q) as f64 / 1000.0;
    Some(Percentiles {
        min,
        max,
        p50: at(0.50),
        p95: at(0.95),
        p99: at(0.99),
    })
}

pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    }
}
