//! End-to-end analysis of one recording: calibrate each annotated cycle,
//! average both channels across cycles and derive the strain rate.

use crate::cycles::{label_cycle, normalize_start_time, CalibratedCycle, CalibratedCycles, CycleWindow};
use crate::dataset::{Channel, Dataset};
use crate::error::{Result, StrainError};
use crate::metrics::align::{average_cycles, average_series, AlignConfig, AlignedTrend};
use crate::metrics::baseline::{calibrate_baseline, Baseline, BaselineConfig, Regime};
use crate::metrics::rate::{strain_rate_from_trends, RateConfig, StrainRate};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Cycles to average, start inclusive and end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRange {
    pub start_cycle: u32,
    pub end_cycle: u32,
}

impl From<CycleRange> for Range<u32> {
    fn from(r: CycleRange) -> Self {
        r.start_cycle..r.end_cycle
    }
}

/// Analysis settings, usually loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub regime: Regime,
    #[serde(default)]
    pub cycles: Vec<CycleWindow>,
    /// Cycles to average; every configured cycle when absent.
    #[serde(default)]
    pub average: Option<CycleRange>,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub align: AlignConfig,
    #[serde(default)]
    pub rate: RateConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.baseline.validate()?;
        self.align.validate()?;
        if self.rate.window == 0 {
            return Err(StrainError::InvalidParameter(
                "rate window must be at least 1".into(),
            ));
        }
        if self.cycles.is_empty() {
            return Err(StrainError::InvalidParameter("no cycles configured".into()));
        }
        for (i, a) in self.cycles.iter().enumerate() {
            if a.start > a.end {
                return Err(StrainError::InvalidParameter(format!(
                    "cycle {} starts after it ends ({} > {})",
                    a.id, a.start, a.end
                )));
            }
            for b in &self.cycles[i + 1..] {
                if a.id == b.id {
                    return Err(StrainError::InvalidParameter(format!(
                        "cycle {} is configured twice",
                        a.id
                    )));
                }
                if a.overlaps(b) {
                    warn!("cycle windows {} and {} overlap", a.id, b.id);
                }
            }
        }
        Ok(())
    }
}

/// Per-cycle calibration outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub id: u32,
    pub samples: usize,
    pub start_time: f64,
    pub baseline: Baseline,
}

/// Calibrated cycles plus their summaries, in configured order.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    pub cycles: CalibratedCycles,
    pub summaries: Vec<CycleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub regime: Regime,
    pub cycles: Vec<CycleSummary>,
    pub width: AlignedTrend,
    pub length: AlignedTrend,
    pub strain_rate: StrainRate,
}

/// Label, normalize, baseline and snapshot every configured cycle.
///
/// Labeling clears the whole cycle column, so each cycle is captured while it
/// is the labeled one. On return `dataset` keeps the labels of the last
/// configured cycle and the start times and baselines of all of them.
pub fn calibrate_cycles(dataset: &mut Dataset, cfg: &AnalysisConfig) -> Result<Calibration> {
    cfg.validate()?;
    let mut out = Calibration::default();
    for window in &cfg.cycles {
        let samples = window.apply(dataset)?;
        let start_time = normalize_start_time(dataset, window.id)?;
        let baseline = calibrate_baseline(dataset, window.id, cfg.regime, &cfg.baseline)?;
        out.cycles.insert(CalibratedCycle::extract(dataset, window.id)?);
        out.summaries.push(CycleSummary {
            id: window.id,
            samples,
            start_time,
            baseline,
        });
    }
    info!(
        "calibrated {} cycles ({} regime)",
        out.summaries.len(),
        cfg.regime
    );
    Ok(out)
}

/// Average one channel over the configured range, or over every cycle when no range is set.
pub fn average_channel(
    calibration: &Calibration,
    channel: Channel,
    cfg: &AnalysisConfig,
) -> Result<AlignedTrend> {
    match cfg.average {
        Some(range) => average_cycles(&calibration.cycles, channel, range.into(), &cfg.align),
        None => {
            let all: Vec<&CalibratedCycle> = calibration.cycles.iter().collect();
            average_series(&all, channel, &cfg.align)
        }
    }
}

/// Run every stage over `dataset`.
pub fn run_analysis(dataset: &mut Dataset, cfg: &AnalysisConfig) -> Result<AnalysisReport> {
    let calibration = calibrate_cycles(dataset, cfg)?;
    let width = average_channel(&calibration, Channel::Width, cfg)?;
    let length = average_channel(&calibration, Channel::Length, cfg)?;
    let strain_rate = strain_rate_from_trends(&length, &width, &cfg.rate)?;
    info!(
        "averaged cycles {:?} over {} grid points",
        width.cycles,
        width.len()
    );
    Ok(AnalysisReport {
        regime: cfg.regime,
        cycles: calibration.summaries,
        width,
        length,
        strain_rate,
    })
}
