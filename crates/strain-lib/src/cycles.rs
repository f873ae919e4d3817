use crate::dataset::{Channel, Dataset, BACKGROUND_CYCLE};
use crate::error::{Result, StrainError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Manually annotated time bounds of one contraction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub id: u32,
    /// Absolute start time (seconds, inclusive)
    pub start: f64,
    /// Absolute end time (seconds, inclusive)
    pub end: f64,
}

impl CycleWindow {
    pub fn new(id: u32, start: f64, end: f64) -> Self {
        Self { id, start, end }
    }

    pub fn overlaps(&self, other: &CycleWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Label `dataset` with this window (see [`label_cycle`]).
    pub fn apply(&self, dataset: &mut Dataset) -> Result<usize> {
        label_cycle(dataset, self.id, self.start, self.end)
    }
}

/// Tag every sample in `[t_start, t_end]` with `cycle` and every other sample with 0.
///
/// The whole cycle column is cleared first, so only the most recent call's
/// window stays labeled. Returns the number of samples labeled.
pub fn label_cycle(dataset: &mut Dataset, cycle: u32, t_start: f64, t_end: f64) -> Result<usize> {
    if cycle == BACKGROUND_CYCLE {
        return Err(StrainError::InvalidParameter(
            "cycle id 0 is reserved for unlabeled samples".into(),
        ));
    }
    if !t_start.is_finite() || !t_end.is_finite() {
        return Err(StrainError::InvalidParameter(format!(
            "cycle {cycle} bounds must be finite ({t_start}, {t_end})"
        )));
    }
    let mut labeled = 0;
    for sample in dataset.samples_mut() {
        sample.cycle_id = if sample.time >= t_start && sample.time <= t_end {
            labeled += 1;
            cycle
        } else {
            BACKGROUND_CYCLE
        };
    }
    debug!("cycle {cycle}: labeled {labeled} samples in [{t_start}, {t_end}]");
    Ok(labeled)
}

/// Record the first timestamp of `cycle` as the start time of each of its samples.
pub fn normalize_start_time(dataset: &mut Dataset, cycle: u32) -> Result<f64> {
    let start = dataset
        .cycle_samples(cycle)
        .next()
        .map(|s| s.time)
        .ok_or(StrainError::EmptyCycle { cycle })?;
    for sample in dataset.cycle_samples_mut(cycle) {
        sample.cycle_start_time = Some(start);
    }
    debug!("cycle {cycle}: start time {start}");
    Ok(start)
}

/// Baseline-corrected samples of one cycle on its own relative clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedCycle {
    pub id: u32,
    pub relative_time: Vec<f64>,
    pub width: Vec<f64>,
    pub length: Vec<f64>,
}

impl CalibratedCycle {
    /// Snapshot the samples currently labeled `cycle`.
    ///
    /// Fails if the cycle is empty or its start time or baselines were never set.
    pub fn extract(dataset: &Dataset, cycle: u32) -> Result<Self> {
        let mut out = Self {
            id: cycle,
            relative_time: Vec::new(),
            width: Vec::new(),
            length: Vec::new(),
        };
        for sample in dataset.cycle_samples(cycle) {
            let t = sample.relative_time().ok_or(StrainError::Uncalibrated {
                cycle,
                field: "start time",
            })?;
            let w = sample.calibrated_width().ok_or(StrainError::Uncalibrated {
                cycle,
                field: "width baseline",
            })?;
            let l = sample.calibrated_length().ok_or(StrainError::Uncalibrated {
                cycle,
                field: "length baseline",
            })?;
            out.relative_time.push(t);
            out.width.push(w);
            out.length.push(l);
        }
        if out.relative_time.is_empty() {
            return Err(StrainError::EmptyCycle { cycle });
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.relative_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relative_time.is_empty()
    }

    pub fn values(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Width => &self.width,
            Channel::Length => &self.length,
        }
    }

    /// First and last relative time.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        match (self.relative_time.first(), self.relative_time.last()) {
            (Some(&a), Some(&b)) => Some((a, b)),
            _ => None,
        }
    }
}

/// Calibrated cycles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CalibratedCycles {
    cycles: BTreeMap<u32, CalibratedCycle>,
}

impl CalibratedCycles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cycle, replacing any earlier one with the same id.
    pub fn insert(&mut self, cycle: CalibratedCycle) -> Option<CalibratedCycle> {
        self.cycles.insert(cycle.id, cycle)
    }

    pub fn get(&self, id: u32) -> Option<&CalibratedCycle> {
        self.cycles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.cycles.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalibratedCycle> + '_ {
        self.cycles.values()
    }

    /// Cycles with ids in `range` (start inclusive, end exclusive). Every id must be present.
    pub fn select(&self, range: Range<u32>) -> Result<Vec<&CalibratedCycle>> {
        if range.is_empty() {
            return Err(StrainError::IncompatibleCycleRange(format!(
                "cycle range {}..{} selects no cycles",
                range.start, range.end
            )));
        }
        range
            .map(|id| self.get(id).ok_or(StrainError::EmptyCycle { cycle: id }))
            .collect()
    }
}
