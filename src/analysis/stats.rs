//! Numeric helpers shared by the aggregator.

use crate::error::InsufficientData;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median; `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(var.sqrt())
}

/// Pearson correlation coefficient of two equally long columns.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64, InsufficientData> {
    if xs.len() != ys.len() {
        return Err(InsufficientData::new(format!(
            "column lengths differ ({} vs {})",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(InsufficientData::new(format!(
            "correlation needs at least 2 records, got {}",
            xs.len()
        )));
    }

    if is_constant(xs) || is_constant(ys) {
        return Err(InsufficientData::new("zero variance in a correlated column"));
    }

    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Err(InsufficientData::new("zero variance in a correlated column"));
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_nan() {
        return Err(InsufficientData::new("correlation is undefined for non-finite values"));
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Every value equals the first; compared on raw values, so rounding in
/// a mean cannot hide a constant column.
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}
