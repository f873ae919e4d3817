use crate::dataset::Channel;
use crate::error::{Result, StrainError};
use crate::metrics::align::AlignedTrend;
use crate::numeric::same_moving_average;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Boxcar length of the centered smoothing window (samples).
    pub window: usize,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// Smoothed strain rates on all but the last time sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrainRate {
    pub time: Vec<f64>,
    pub length_rate: Vec<f64>,
    pub width_rate: Vec<f64>,
}

impl StrainRate {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// `Δvalue / Δtime` for each adjacent pair; one element shorter than the input.
pub fn first_difference_rate(time: &[f64], values: &[f64]) -> Result<Vec<f64>> {
    if time.len() != values.len() {
        return Err(StrainError::MalformedInput(format!(
            "time axis has {} points but values have {}",
            time.len(),
            values.len()
        )));
    }
    if time.len() < 2 {
        return Err(StrainError::MalformedInput(
            "strain rate needs at least two time points".into(),
        ));
    }
    time.windows(2)
        .zip(values.windows(2))
        .enumerate()
        .map(|(i, (t, v))| {
            let dt = t[1] - t[0];
            if dt > 0.0 {
                Ok((v[1] - v[0]) / dt)
            } else {
                Err(StrainError::MalformedInput(format!(
                    "time axis is not strictly increasing at index {}",
                    i + 1
                )))
            }
        })
        .collect()
}

/// Smoothed length and width strain rates over one aligned time axis.
pub fn strain_rate(
    time: &[f64],
    length: &[f64],
    width: &[f64],
    cfg: &RateConfig,
) -> Result<StrainRate> {
    if cfg.window == 0 {
        return Err(StrainError::InvalidParameter(
            "smoothing window must be at least 1".into(),
        ));
    }
    let length_rate = same_moving_average(&first_difference_rate(time, length)?, cfg.window);
    let width_rate = same_moving_average(&first_difference_rate(time, width)?, cfg.window);
    Ok(StrainRate {
        time: time[..time.len() - 1].to_vec(),
        length_rate,
        width_rate,
    })
}

/// Strain rate from the mean curves of a length trend and a width trend on the same grid.
pub fn strain_rate_from_trends(
    length: &AlignedTrend,
    width: &AlignedTrend,
    cfg: &RateConfig,
) -> Result<StrainRate> {
    if length.channel != Channel::Length || width.channel != Channel::Width {
        return Err(StrainError::InvalidParameter(format!(
            "expected length and width trends, got {} and {}",
            length.channel, width.channel
        )));
    }
    if length.time != width.time {
        return Err(StrainError::MalformedInput(
            "length and width trends are on different time grids".into(),
        ));
    }
    strain_rate(&length.time, &length.mean, &width.mean, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.02).collect()
    }

    #[test]
    fn rate_is_one_shorter_than_axis() {
        for n in [2, 3, 5, 6, 40] {
            let time = grid(n);
            let length: Vec<f64> = time.iter().map(|t| t * t).collect();
            let width: Vec<f64> = time.iter().map(|t| -t).collect();
            let rate = strain_rate(&time, &length, &width, &RateConfig::default()).unwrap();
            assert_eq!(rate.len(), n - 1);
            assert_eq!(rate.length_rate.len(), n - 1);
            assert_eq!(rate.width_rate.len(), n - 1);
            assert_eq!(rate.time, time[..n - 1].to_vec());
        }
    }

    #[test]
    fn linear_signal_has_constant_interior_rate() {
        let time = grid(30);
        let length: Vec<f64> = time.iter().map(|t| 3.0 * t).collect();
        let width: Vec<f64> = time.iter().map(|t| -0.5 * t).collect();
        let rate = strain_rate(&time, &length, &width, &RateConfig::default()).unwrap();
        for i in 2..rate.len() - 2 {
            assert_close(rate.length_rate[i], 3.0, 1e-9);
            assert_close(rate.width_rate[i], -0.5, 1e-9);
        }
        // edges taper with partial windows
        assert_close(rate.length_rate[0], 3.0 * 3.0 / 5.0, 1e-9);
        assert_close(rate.length_rate[1], 3.0 * 4.0 / 5.0, 1e-9);
    }

    #[test]
    fn unit_window_is_raw_difference() {
        let time = [0.0, 0.5, 1.0];
        let rate = strain_rate(&time, &[0.0, 1.0, 3.0], &[0.0, 0.0, 0.0], &RateConfig { window: 1 })
            .unwrap();
        assert_eq!(rate.length_rate, vec![2.0, 4.0]);
    }

    #[test]
    fn repeated_time_is_rejected() {
        let err = first_difference_rate(&[0.0, 0.1, 0.1], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, StrainError::MalformedInput(_)));
    }

    #[test]
    fn too_short_axis_is_rejected() {
        assert!(matches!(
            strain_rate(&[0.0], &[1.0], &[1.0], &RateConfig::default()),
            Err(StrainError::MalformedInput(_))
        ));
    }

    #[test]
    fn trends_must_match_channels() {
        let trend = AlignedTrend {
            channel: Channel::Width,
            cycles: vec![1],
            time: vec![0.0, 0.02],
            mean: vec![0.0, 1.0],
            std: vec![0.0, 0.0],
        };
        assert!(matches!(
            strain_rate_from_trends(&trend, &trend, &RateConfig::default()),
            Err(StrainError::InvalidParameter(_))
        ));
    }
}
