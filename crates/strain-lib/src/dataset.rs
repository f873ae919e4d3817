use crate::error::{Result, StrainError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TIME_COLUMN: &str = "Time (s)";
pub const WIDTH_COLUMN: &str = "RRWidth";
pub const LENGTH_COLUMN: &str = "RRLength";
pub const CYCLE_COLUMN: &str = "Cycle";
pub const START_TIME_COLUMN: &str = "Start time (s)";
pub const WIDTH_BASELINE_COLUMN: &str = "width_baseline";
pub const LENGTH_BASELINE_COLUMN: &str = "length_baseline";
pub const CALIBRATED_TIME_COLUMN: &str = "Calibrate time (s)";

/// Cycle id carried by samples outside any labeled cycle.
pub const BACKGROUND_CYCLE: u32 = 0;

/// One recorded instant plus the fields derived from it by the calibration stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Absolute time (seconds)
    pub time: f64,
    /// Raw width deformation
    pub width: f64,
    /// Raw length deformation
    pub length: f64,
    pub cycle_id: u32,
    pub cycle_start_time: Option<f64>,
    pub width_baseline: Option<f64>,
    pub length_baseline: Option<f64>,
}

impl Sample {
    pub fn new(time: f64, width: f64, length: f64) -> Self {
        Self {
            time,
            width,
            length,
            cycle_id: BACKGROUND_CYCLE,
            cycle_start_time: None,
            width_baseline: None,
            length_baseline: None,
        }
    }

    /// Time since the start of the owning cycle, once the start time is known.
    pub fn relative_time(&self) -> Option<f64> {
        self.cycle_start_time.map(|start| self.time - start)
    }

    pub fn calibrated_width(&self) -> Option<f64> {
        self.width_baseline.map(|b| self.width - b)
    }

    pub fn calibrated_length(&self) -> Option<f64> {
        self.length_baseline.map(|b| self.length - b)
    }

    pub fn calibrated(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Width => self.calibrated_width(),
            Channel::Length => self.calibrated_length(),
        }
    }
}

/// The two deformation channels of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Width,
    Length,
}

impl Channel {
    pub fn raw_column(&self) -> &'static str {
        match self {
            Channel::Width => WIDTH_COLUMN,
            Channel::Length => LENGTH_COLUMN,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Width => write!(f, "width"),
            Channel::Length => write!(f, "length"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "width" | "w" => Ok(Channel::Width),
            "length" | "l" => Ok(Channel::Length),
            other => Err(format!("unknown channel '{other}' (expected width or length)")),
        }
    }
}

/// Time-ordered recording of width/length samples.
///
/// Raw fields are fixed at construction; only the calibration stages in this
/// crate touch the derived per-sample fields.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Build a dataset, rejecting missing or decreasing timestamps and non-finite channel values.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        validate(&samples)?;
        Ok(Self { samples })
    }

    pub fn from_columns(time: &[f64], width: &[f64], length: &[f64]) -> Result<Self> {
        if time.len() != width.len() || time.len() != length.len() {
            return Err(StrainError::MalformedInput(format!(
                "column lengths differ: {} time, {} width, {} length",
                time.len(),
                width.len(),
                length.len()
            )));
        }
        let samples = time
            .iter()
            .zip(width)
            .zip(length)
            .map(|((&t, &w), &l)| Sample::new(t, w, l))
            .collect();
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Samples currently labeled with `cycle`, in time order.
    pub fn cycle_samples(&self, cycle: u32) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter().filter(move |s| s.cycle_id == cycle)
    }

    pub(crate) fn cycle_samples_mut(&mut self, cycle: u32) -> impl Iterator<Item = &mut Sample> + '_ {
        self.samples.iter_mut().filter(move |s| s.cycle_id == cycle)
    }

    pub fn cycle_len(&self, cycle: u32) -> usize {
        self.cycle_samples(cycle).count()
    }

    /// Span of absolute time covered by the recording.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }
}

fn validate(samples: &[Sample]) -> Result<()> {
    let mut prev: Option<f64> = None;
    for (idx, sample) in samples.iter().enumerate() {
        if !sample.time.is_finite() {
            return Err(StrainError::MalformedInput(format!(
                "row {}: missing or non-finite time",
                idx + 1
            )));
        }
        if !sample.width.is_finite() || !sample.length.is_finite() {
            return Err(StrainError::MalformedInput(format!(
                "row {}: non-finite width/length value",
                idx + 1
            )));
        }
        if let Some(p) = prev {
            if sample.time < p {
                return Err(StrainError::MalformedInput(format!(
                    "row {}: time {} precedes previous time {}",
                    idx + 1,
                    sample.time,
                    p
                )));
            }
        }
        prev = Some(sample.time);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_decreasing_time() {
        let err = Dataset::from_columns(&[0.0, 0.2, 0.1], &[1.0; 3], &[1.0; 3]).unwrap_err();
        assert!(matches!(err, StrainError::MalformedInput(_)));
    }

    #[test]
    fn rejects_missing_time() {
        let err = Dataset::from_columns(&[0.0, f64::NAN], &[1.0; 2], &[1.0; 2]).unwrap_err();
        assert!(matches!(err, StrainError::MalformedInput(_)));
    }

    #[test]
    fn rejects_mismatched_columns() {
        let err = Dataset::from_columns(&[0.0, 0.1], &[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StrainError::MalformedInput(_)));
    }

    #[test]
    fn accepts_repeated_timestamps() {
        let ds = Dataset::from_columns(&[0.0, 0.0, 0.1], &[1.0; 3], &[2.0; 3]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.time_range(), Some((0.0, 0.1)));
        assert!(ds.samples().iter().all(|s| s.cycle_id == BACKGROUND_CYCLE));
    }

    #[test]
    fn calibrated_values_need_baselines() {
        let mut sample = Sample::new(1.5, 10.0, 20.0);
        assert_eq!(sample.relative_time(), None);
        assert_eq!(sample.calibrated(Channel::Width), None);
        sample.cycle_start_time = Some(1.0);
        sample.width_baseline = Some(9.0);
        sample.length_baseline = Some(18.0);
        assert_eq!(sample.relative_time(), Some(0.5));
        assert_eq!(sample.calibrated(Channel::Width), Some(1.0));
        assert_eq!(sample.calibrated(Channel::Length), Some(2.0));
    }

    #[test]
    fn channel_parses_names() {
        assert_eq!("Width".parse::<Channel>(), Ok(Channel::Width));
        assert_eq!("length".parse::<Channel>(), Ok(Channel::Length));
        assert!("depth".parse::<Channel>().is_err());
    }
}
