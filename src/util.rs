//! Small numeric helpers shared by scoring and the stats summary.

/// Arithmetic mean, `None` for an empty sample.
pub fn mean(sample: &[f64]) -> Option<f64> {
    if sample.is_empty() {
        return None;
    }
    Some(sample.iter().sum::<f64>() / sample.len() as f64)
}

/// Population standard deviation, `None` for an empty sample.
pub fn std_dev(sample: &[f64]) -> Option<f64> {
    let centre = mean(sample)?;
    let variance = sample
        .iter()
        .map(|value| (value - centre).powi(2))
        .sum::<f64>()
        / sample.len() as f64;
    Some(variance.sqrt())
}

/// Rounds half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
