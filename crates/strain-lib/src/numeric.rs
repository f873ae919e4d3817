//! Small numeric helpers shared by the calibration and alignment stages.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (denominator `n`), `None` for an empty slice.
pub fn population_std(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(var.sqrt())
}

/// Linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be non-empty and non-decreasing, with `fp` of the same length.
/// Points outside `xp` take the nearest endpoint value.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // first index with xp > x; xp[hi] > xp[lo] so the span is never zero
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xp[lo]) / (xp[hi] - xp[lo]);
    fp[lo] + t * (fp[hi] - fp[lo])
}

/// Interpolate `(xp, fp)` onto every point of `grid`.
pub fn interp_onto(grid: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    grid.iter().map(|&x| interp(x, xp, fp)).collect()
}

/// Centered moving average with a boxcar of `window` points, same length as `data`.
///
/// Positions outside the data count as zero, so the first and last
/// `window / 2` outputs taper toward zero.
pub fn same_moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if data.is_empty() || window <= 1 {
        return data.to_vec();
    }
    let n = data.len() as isize;
    let offset = ((window - 1) / 2) as isize;
    let span = window as isize - 1;
    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }
    (0..n)
        .map(|i| {
            let hi = (i + offset).min(n - 1);
            let lo = (i + offset - span).max(0);
            (prefix[(hi + 1) as usize] - prefix[lo as usize]) / window as f64
        })
        .collect()
}
