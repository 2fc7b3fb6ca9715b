use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub judgment: JudgmentConfig,
    pub scoring: ScoringConfig,
    pub scheduler: SchedulerConfig,
    #[serde(rename = "match")]
    pub match_: MatchConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Fields absent from the file keep their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Returns a copy of this config with every owned upgrade applied.
    pub fn with_upgrades<'a, I>(&self, upgrades: I) -> Self
    where
        I: IntoIterator<Item = (&'a crate::UpgradeKind, &'a u32)>,
    {
        let mut config = self.clone();
        for (kind, level) in upgrades {
            kind.apply(*level, &mut config);
        }
        config
    }
}

/// Tolerance windows, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentConfig {
    pub perfect_window: f64,
    pub good_window: f64,
    /// Scales `good_window` to get the early-release tolerance of hold notes.
    pub hold_tolerance_multiplier: f64,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            perfect_window: 0.06,
            good_window: 0.12,
            hold_tolerance_multiplier: 1.0,
        }
    }
}

impl JudgmentConfig {
    pub fn hold_tolerance(&self) -> f64 {
        self.good_window * self.hold_tolerance_multiplier
    }
}

/// One step of the end-of-match combo multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTier {
    pub threshold: u32,
    pub multiplier: u32,
}

impl ComboTier {
    pub const fn new(threshold: u32, multiplier: u32) -> Self {
        Self {
            threshold,
            multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub perfect_points: u64,
    pub good_points: u64,
    /// Fraction of the tap reward granted for starting a hold.
    pub hold_start_scale: f64,
    pub hold_complete_points: u64,
    pub miss_penalty: u64,
    pub score_multiplier: f64,
    /// Scales every combo tier threshold; values below 1.0 reach tiers sooner.
    pub combo_boost: f64,
    pub combo_tiers: Vec<ComboTier>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            perfect_points: 300,
            good_points: 150,
            hold_start_scale: 0.5,
            hold_complete_points: 250,
            miss_penalty: 50,
            score_multiplier: 1.0,
            combo_boost: 1.0,
            combo_tiers: vec![
                ComboTier::new(3, 2),
                ComboTier::new(6, 3),
                ComboTier::new(10, 5),
            ],
        }
    }
}

/// Settings for the lookahead audio scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the coarse wake-up timer.
    pub lookahead_tick_ms: u64,
    /// Horizon, in seconds of audio time, that each wake-up fills.
    pub schedule_ahead: f64,
    /// Gap between `start` and the first scheduled step.
    pub start_offset: f64,
    pub bpm: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_tick_ms: 25,
            schedule_ahead: 0.12,
            start_offset: 0.05,
            bpm: 120.0,
        }
    }
}

impl SchedulerConfig {
    pub fn step_interval(&self) -> f64 {
        60.0 / self.bpm.max(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub countdown_from: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { countdown_from: 3 }
    }
}
