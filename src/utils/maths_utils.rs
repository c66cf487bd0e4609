use argminmax::ArgMinMax;

/// Min and max over the present (non-hole) values, or None if every slot is a hole.
pub(crate) fn min_max_present(data: &[Option<f64>]) -> Option<(f64, f64)> {
    let present: Vec<f64> = data.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let (min_index, max_index) = present.argminmax();
    Some((present[min_index], present[max_index]))
}

/// Min-max scaling into [0, 1]. A constant series (max == min) maps to 0.
#[inline]
pub(crate) fn normalize_min_max(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 { 0.0 } else { (value - min) / span }
}

#[inline]
pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}
