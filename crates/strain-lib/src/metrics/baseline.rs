use crate::dataset::Dataset;
use crate::error::{Result, StrainError};
use crate::numeric::mean;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the tissue was driven during the recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    /// Contracts without stimulus; the cycle tail settles near rest.
    #[default]
    Spontaneous,
    /// Externally paced; the tissue never settles between beats.
    Pacing,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Spontaneous => write!(f, "spontaneous"),
            Regime::Pacing => write!(f, "pacing"),
        }
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spontaneous" | "spontaneous-beating" => Ok(Regime::Spontaneous),
            "pacing" | "electrical-pacing" => Ok(Regime::Pacing),
            other => Err(format!(
                "unknown regime '{other}' (expected spontaneous or pacing)"
            )),
        }
    }
}

/// Sample counts used by the two baseline strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Trailing samples averaged under spontaneous beating.
    pub tail_samples: usize,
    /// Smallest width values averaged under pacing.
    pub width_floor_count: usize,
    /// Largest length values averaged under pacing.
    pub length_peak_count: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            tail_samples: 15,
            width_floor_count: 4,
            length_peak_count: 5,
        }
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tail_samples == 0 || self.width_floor_count == 0 || self.length_peak_count == 0 {
            return Err(StrainError::InvalidParameter(format!(
                "baseline sample counts must be positive: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Zero-strain reference of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub width: f64,
    pub length: f64,
}

/// Compute the baseline of `cycle` for `regime` and store it on every sample of the cycle.
pub fn calibrate_baseline(
    dataset: &mut Dataset,
    cycle: u32,
    regime: Regime,
    cfg: &BaselineConfig,
) -> Result<Baseline> {
    match regime {
        Regime::Spontaneous => spontaneous_baseline(dataset, cycle, cfg),
        Regime::Pacing => pacing_baseline(dataset, cycle, cfg),
    }
}

/// Average of the last `tail_samples` width and length values of the cycle.
pub fn spontaneous_baseline(
    dataset: &mut Dataset,
    cycle: u32,
    cfg: &BaselineConfig,
) -> Result<Baseline> {
    cfg.validate()?;
    let (width, length) = cycle_channels(dataset, cycle)?;
    if width.len() < cfg.tail_samples {
        warn!(
            "cycle {cycle}: only {} samples, spontaneous baseline uses all of them",
            width.len()
        );
    }
    let baseline = Baseline {
        width: tail_mean(&width, cfg.tail_samples, cycle)?,
        length: tail_mean(&length, cfg.tail_samples, cycle)?,
    };
    broadcast(dataset, cycle, baseline);
    debug!("cycle {cycle}: spontaneous baseline {baseline:?}");
    Ok(baseline)
}

/// Mean of the smallest widths and of the largest lengths across the whole cycle.
pub fn pacing_baseline(
    dataset: &mut Dataset,
    cycle: u32,
    cfg: &BaselineConfig,
) -> Result<Baseline> {
    cfg.validate()?;
    let (mut width, mut length) = cycle_channels(dataset, cycle)?;
    if width.len() < cfg.width_floor_count.max(cfg.length_peak_count) {
        warn!(
            "cycle {cycle}: only {} samples, pacing baseline uses all of them",
            width.len()
        );
    }
    width.sort_by(|a, b| a.total_cmp(b));
    length.sort_by(|a, b| a.total_cmp(b));
    let lowest = &width[..cfg.width_floor_count.min(width.len())];
    let highest = &length[length.len().saturating_sub(cfg.length_peak_count)..];
    let baseline = Baseline {
        width: mean(lowest).ok_or(StrainError::EmptyCycle { cycle })?,
        length: mean(highest).ok_or(StrainError::EmptyCycle { cycle })?,
    };
    broadcast(dataset, cycle, baseline);
    debug!("cycle {cycle}: pacing baseline {baseline:?}");
    Ok(baseline)
}

fn cycle_channels(dataset: &Dataset, cycle: u32) -> Result<(Vec<f64>, Vec<f64>)> {
    let (width, length): (Vec<f64>, Vec<f64>) = dataset
        .cycle_samples(cycle)
        .map(|s| (s.width, s.length))
        .unzip();
    if width.is_empty() {
        return Err(StrainError::EmptyCycle { cycle });
    }
    Ok((width, length))
}

fn tail_mean(values: &[f64], count: usize, cycle: u32) -> Result<f64> {
    let tail = &values[values.len().saturating_sub(count)..];
    mean(tail).ok_or(StrainError::EmptyCycle { cycle })
}

fn broadcast(dataset: &mut Dataset, cycle: u32, baseline: Baseline) {
    for sample in dataset.cycle_samples_mut(cycle) {
        sample.width_baseline = Some(baseline.width);
        sample.length_baseline = Some(baseline.length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::label_cycle;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    fn labeled(width: &[f64], length: &[f64]) -> Dataset {
        let time: Vec<f64> = (0..width.len()).map(|i| i as f64 * 0.01).collect();
        let mut ds = Dataset::from_columns(&time, width, length).unwrap();
        label_cycle(&mut ds, 1, 0.0, 1e6).unwrap();
        ds
    }

    #[test]
    fn spontaneous_uses_trailing_fifteen() {
        let mut width = vec![7.0, -3.0, 12.0, 0.5, 42.0];
        width.extend([1.0; 15]);
        let length: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut ds = labeled(&width, &length);
        let b = spontaneous_baseline(&mut ds, 1, &BaselineConfig::default()).unwrap();
        assert_eq!(b.width, 1.0);
        // mean of 5..=19
        assert_close(b.length, 12.0, 1e-12);
    }

    #[test]
    fn spontaneous_short_cycle_uses_all_samples() {
        let mut ds = labeled(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        let b = spontaneous_baseline(&mut ds, 1, &BaselineConfig::default()).unwrap();
        assert_close(b.width, 2.0, 1e-12);
        assert_close(b.length, 5.0, 1e-12);
    }

    #[test]
    fn pacing_takes_four_lowest_widths() {
        let mut ds = labeled(&[5.0, 1.0, 2.0, 8.0, 9.0], &[1.0, 2.0, 3.0, 4.0, 9.0]);
        let b = pacing_baseline(&mut ds, 1, &BaselineConfig::default()).unwrap();
        assert_close(b.width, 4.0, 1e-12);
        assert_close(b.length, 3.8, 1e-12);
    }

    #[test]
    fn pacing_takes_five_highest_lengths() {
        let width = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0];
        let length = [10.0, 1.0, 7.0, 3.0, 8.0, 6.0, 2.0];
        let mut ds = labeled(&width, &length);
        let b = pacing_baseline(&mut ds, 1, &BaselineConfig::default()).unwrap();
        // lowest four widths: 1, 1, 2, 3
        assert_close(b.width, 7.0 / 4.0, 1e-12);
        // highest five lengths: 3, 6, 7, 8, 10
        assert_close(b.length, 34.0 / 5.0, 1e-12);
    }

    #[test]
    fn baseline_is_broadcast_to_whole_cycle() {
        let time: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let width: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let length: Vec<f64> = (0..30).map(|i| (i as f64 * 0.3).cos()).collect();
        let mut ds = Dataset::from_columns(&time, &width, &length).unwrap();
        label_cycle(&mut ds, 2, 0.55, 2.55).unwrap();
        let b = calibrate_baseline(&mut ds, 2, Regime::Pacing, &BaselineConfig::default()).unwrap();
        for s in ds.samples() {
            if s.cycle_id == 2 {
                assert_eq!(s.width_baseline, Some(b.width));
                assert_eq!(s.length_baseline, Some(b.length));
            } else {
                assert_eq!(s.width_baseline, None);
                assert_eq!(s.length_baseline, None);
            }
        }
    }

    #[test]
    fn empty_cycle_fails_for_both_regimes() {
        let mut ds = labeled(&[1.0, 2.0], &[1.0, 2.0]);
        for regime in [Regime::Spontaneous, Regime::Pacing] {
            let err = calibrate_baseline(&mut ds, 9, regime, &BaselineConfig::default()).unwrap_err();
            assert!(matches!(err, StrainError::EmptyCycle { cycle: 9 }));
        }
    }

    #[test]
    fn zero_counts_are_rejected() {
        let mut ds = labeled(&[1.0, 2.0], &[1.0, 2.0]);
        let cfg = BaselineConfig {
            tail_samples: 0,
            ..BaselineConfig::default()
        };
        assert!(matches!(
            spontaneous_baseline(&mut ds, 1, &cfg),
            Err(StrainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn regime_parses_names() {
        assert_eq!("Pacing".parse::<Regime>(), Ok(Regime::Pacing));
        assert_eq!(
            "spontaneous-beating".parse::<Regime>(),
            Ok(Regime::Spontaneous)
        );
        assert!("paced".parse::<Regime>().is_err());
    }
}
