//! Fasting stage bands keyed by elapsed hours

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named band of a fast, keyed by elapsed hours.
///
/// Bands are half-open `[start, end)`; the last band is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FastingStage {
    /// 0-4h
    RisingBloodSugar,
    /// 4-8h
    BloodSugarFalling,
    /// 8-12h
    BloodSugarBaseline,
    /// 12-14h
    FatBurningBegins,
    /// 14-16h
    FatBurningMode,
    /// 16h and beyond
    KetosisAutophagy,
}

impl FastingStage {
    /// All stages in order
    pub const ALL: [FastingStage; 6] = [
        FastingStage::RisingBloodSugar,
        FastingStage::BloodSugarFalling,
        FastingStage::BloodSugarBaseline,
        FastingStage::FatBurningBegins,
        FastingStage::FatBurningMode,
        FastingStage::KetosisAutophagy,
    ];

    /// Stage for a number of elapsed hours.
    ///
    /// Boundary values belong to the upper band. Negative and NaN inputs
    /// map to the first band.
    pub fn for_hours(hours: f64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| hours >= stage.start_hours())
            .unwrap_or(FastingStage::RisingBloodSugar)
    }

    /// Inclusive lower bound of the band, in hours
    pub fn start_hours(self) -> f64 {
        match self {
            FastingStage::RisingBloodSugar => 0.0,
            FastingStage::BloodSugarFalling => 4.0,
            FastingStage::BloodSugarBaseline => 8.0,
            FastingStage::FatBurningBegins => 12.0,
            FastingStage::FatBurningMode => 14.0,
            FastingStage::KetosisAutophagy => 16.0,
        }
    }

    /// Exclusive upper bound of the band, `None` for the last band
    pub fn end_hours(self) -> Option<f64> {
        self.next().map(FastingStage::start_hours)
    }

    /// The following stage, if any
    pub fn next(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            FastingStage::RisingBloodSugar => "Rising blood sugar",
            FastingStage::BloodSugarFalling => "Blood sugar falling",
            FastingStage::BloodSugarBaseline => "Blood sugar baseline",
            FastingStage::FatBurningBegins => "Fat burning begins",
            FastingStage::FatBurningMode => "Fat burning mode",
            FastingStage::KetosisAutophagy => "Ketosis / Autophagy",
        }
    }
}

impl fmt::Display for FastingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
