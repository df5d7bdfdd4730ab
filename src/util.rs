pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Round half towards positive infinity, so `-0.5` becomes `-0` and `2.5` becomes `3`.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// `part / whole * 100`, rounded. Returns `None` when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Option<u32> {
    match whole {
        0 => None,
        w => Some(round_half_up(part as f64 / w as f64 * 100.0) as u32),
    }
}
