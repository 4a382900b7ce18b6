use std::time::Duration;

pub fn sum(samples: &[Duration]) -> Duration {
    samples.iter().sum()
}

/// Upper median; `None` for an empty slice
pub fn median(samples: &[Duration]) -> Option<Duration> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    sorted.get(sorted.len() / 2).copied()
}

pub fn ratio(numerator: Duration, denominator: Duration) -> f64 {
    numerator.as_secs_f64() / denominator.as_secs_f64()
}

/// Cube root of the absolute difference in seconds
pub fn cbrt_distance(a: Duration, b: Duration) -> f64 {
    (a.as_secs_f64() - b.as_secs_f64()).abs().cbrt()
}
