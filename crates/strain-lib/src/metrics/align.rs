use crate::cycles::{CalibratedCycle, CalibratedCycles};
use crate::dataset::Channel;
use crate::error::{Result, StrainError};
use crate::numeric::{interp_onto, mean, population_std};
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Resolution of the shared relative-time grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Grid step (seconds).
    pub grid_step_s: f64,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self { grid_step_s: 0.02 }
    }
}

impl AlignConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_step_s.is_finite() && self.grid_step_s > 0.0) {
            return Err(StrainError::InvalidParameter(format!(
                "grid step must be positive, got {}",
                self.grid_step_s
            )));
        }
        Ok(())
    }
}

/// Pointwise mean and population std of one channel across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedTrend {
    pub channel: Channel,
    pub cycles: Vec<u32>,
    pub time: Vec<f64>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl AlignedTrend {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `(time, mean, std)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.time
            .iter()
            .zip(&self.mean)
            .zip(&self.std)
            .map(|((&t, &m), &s)| (t, m, s))
    }
}

/// Average `channel` over the cycles with ids in `range` (end exclusive).
pub fn average_cycles(
    cycles: &CalibratedCycles,
    channel: Channel,
    range: Range<u32>,
    cfg: &AlignConfig,
) -> Result<AlignedTrend> {
    let selected = cycles.select(range)?;
    average_series(&selected, channel, cfg)
}

/// Average `channel` over an explicit list of cycles.
pub fn average_series(
    cycles: &[&CalibratedCycle],
    channel: Channel,
    cfg: &AlignConfig,
) -> Result<AlignedTrend> {
    let time = common_grid(cycles, cfg)?;
    let resampled: Vec<Vec<f64>> = cycles
        .iter()
        .map(|c| interp_onto(&time, &c.relative_time, c.values(channel)))
        .collect();

    let mut mean_trend = Vec::with_capacity(time.len());
    let mut std_trend = Vec::with_capacity(time.len());
    let mut column = Vec::with_capacity(cycles.len());
    for i in 0..time.len() {
        column.clear();
        column.extend(resampled.iter().map(|values| values[i]));
        // column is non-empty: common_grid rejects an empty cycle list
        mean_trend.push(mean(&column).unwrap_or_default());
        std_trend.push(population_std(&column).unwrap_or_default());
    }

    debug!(
        "{channel}: averaged {} cycles on {} grid points",
        cycles.len(),
        time.len()
    );
    Ok(AlignedTrend {
        channel,
        cycles: cycles.iter().map(|c| c.id).collect(),
        time,
        mean: mean_trend,
        std: std_trend,
    })
}

/// Uniform grid over the relative-time range every cycle covers.
///
/// Runs from the latest cycle start to the earliest cycle end, with the
/// final step allowed to land up to one step past the end.
pub fn common_grid(cycles: &[&CalibratedCycle], cfg: &AlignConfig) -> Result<Vec<f64>> {
    cfg.validate()?;
    if cycles.is_empty() {
        return Err(StrainError::IncompatibleCycleRange(
            "no cycles to average".into(),
        ));
    }
    let mut start = f64::NEG_INFINITY;
    let mut stop = f64::INFINITY;
    for cycle in cycles {
        let (first, last) = span(cycle)?;
        start = start.max(first);
        stop = stop.min(last);
    }
    if start > stop {
        return Err(StrainError::IncompatibleCycleRange(format!(
            "cycles {:?} share no relative time (latest start {start} > earliest end {stop})",
            cycles.iter().map(|c| c.id).collect::<Vec<_>>()
        )));
    }
    let step = cfg.grid_step_s;
    let n = ((stop + step - start) / step).ceil() as usize;
    debug!("common grid [{start}, {stop}] step {step}: {n} points");
    Ok((0..n).map(|k| start + k as f64 * step).collect())
}

fn span(cycle: &CalibratedCycle) -> Result<(f64, f64)> {
    if cycle.width.len() != cycle.len() || cycle.length.len() != cycle.len() {
        return Err(StrainError::MalformedInput(format!(
            "cycle {}: time and value sequences differ in length",
            cycle.id
        )));
    }
    if cycle
        .relative_time
        .windows(2)
        .any(|w| w[1] < w[0] || w[1].is_nan())
    {
        return Err(StrainError::MalformedInput(format!(
            "cycle {}: relative time is not ascending",
            cycle.id
        )));
    }
    match cycle.time_span() {
        Some((first, last)) if cycle.len() >= 2 && last > first => Ok((first, last)),
        _ => Err(StrainError::IncompatibleCycleRange(format!(
            "cycle {} has a degenerate time range ({} samples)",
            cycle.id,
            cycle.len()
        ))),
    }
}
