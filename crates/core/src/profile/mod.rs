use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AppConfig, DuelError, MatchOutcome, Result};

/// Shop upgrade. Every kind answers the same questions, so callers never
/// need to probe for optional behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeKind {
    ForgivingHold,
    ScoreMultiplier,
    ComboBoost,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [
        UpgradeKind::ForgivingHold,
        UpgradeKind::ScoreMultiplier,
        UpgradeKind::ComboBoost,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ForgivingHold => "Forgiving Strings",
            Self::ScoreMultiplier => "Resonant Amplifier",
            Self::ComboBoost => "Combo Booster",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::ForgivingHold => "forgiving-hold",
            Self::ScoreMultiplier => "score-multiplier",
            Self::ComboBoost => "combo-boost",
        }
    }

    pub fn max_level(&self) -> u32 {
        1
    }

    /// Price of the next level when `level` levels are owned, or `None` once
    /// the upgrade is maxed out.
    pub fn cost_at_level(&self, level: u32) -> Option<u64> {
        if level >= self.max_level() {
            return None;
        }
        Some(match self {
            Self::ForgivingHold => 600,
            Self::ScoreMultiplier => 800,
            Self::ComboBoost => 700,
        })
    }

    pub fn description_at_level(&self, level: u32) -> String {
        if level == 0 {
            return match self {
                Self::ForgivingHold => "+25% hold release tolerance".to_string(),
                Self::ScoreMultiplier => "+15% score from all hits".to_string(),
                Self::ComboBoost => "Reach 5x combo faster".to_string(),
            };
        }
        match self {
            Self::ForgivingHold => format!(
                "Hold release tolerance x{:.2}",
                HOLD_TOLERANCE_STEP.powi(level as i32)
            ),
            Self::ScoreMultiplier => {
                format!("Score x{:.2}", SCORE_STEP.powi(level as i32))
            }
            Self::ComboBoost => format!(
                "Combo thresholds x{:.2}",
                COMBO_BOOST_STEP.powi(level as i32)
            ),
        }
    }

    /// Folds `level` levels of this upgrade into a match config.
    pub fn apply(&self, level: u32, config: &mut AppConfig) {
        let level = level.min(self.max_level()) as i32;
        match self {
            Self::ForgivingHold => {
                config.judgment.hold_tolerance_multiplier *= HOLD_TOLERANCE_STEP.powi(level)
            }
            Self::ScoreMultiplier => config.scoring.score_multiplier *= SCORE_STEP.powi(level),
            Self::ComboBoost => config.scoring.combo_boost *= COMBO_BOOST_STEP.powi(level),
        }
    }
}

const HOLD_TOLERANCE_STEP: f64 = 1.25;
const SCORE_STEP: f64 = 1.15;
const COMBO_BOOST_STEP: f64 = 0.7;

impl fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for UpgradeKind {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self> {
        UpgradeKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| DuelError::Upgrade(format!("unknown upgrade `{s}`")))
    }
}

/// Persistent player progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub money: u64,
    /// Index of the highest level the player may start.
    pub unlocked_level: usize,
    pub upgrades: BTreeMap<UpgradeKind, u32>,
}

impl Profile {
    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Buys the next level of `kind`. Returns the price paid.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u64> {
        let level = self.upgrade_level(kind);
        let cost = kind
            .cost_at_level(level)
            .ok_or_else(|| DuelError::Upgrade(format!("{} is already maxed", kind.name())))?;
        if self.money < cost {
            return Err(DuelError::Upgrade(format!(
                "{} costs {cost}, only {} available",
                kind.name(),
                self.money
            )));
        }

        self.money -= cost;
        self.upgrades.insert(kind, level + 1);
        tracing::info!(upgrade = %kind, level = level + 1, cost, "upgrade purchased");
        Ok(cost)
    }

    /// Banks a match result and unlocks the next level when the frontier
    /// level was won.
    pub fn record_outcome(&mut self, level_index: usize, outcome: &MatchOutcome, level_count: usize) {
        self.money += outcome.earned;
        if outcome.win && level_index == self.unlocked_level && level_index + 1 < level_count {
            self.unlocked_level = level_index + 1;
            tracing::info!(unlocked = self.unlocked_level, "next level unlocked");
        }
    }
}

/// Key-value persistence for [`Profile`].
pub trait ProfileStore {
    fn load(&self) -> Result<Profile>;
    fn save(&mut self, profile: &Profile) -> Result<()>;
}

/// Profile stored as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Result<Profile> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Profile::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&mut self, profile: &Profile) -> Result<()> {
        let raw = serde_json::to_string_pretty(profile)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profile: Option<Profile>,
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Profile> {
        Ok(self.profile.clone().unwrap_or_default())
    }

    fn save(&mut self, profile: &Profile) -> Result<()> {
        self.profile = Some(profile.clone());
        Ok(())
    }
}
