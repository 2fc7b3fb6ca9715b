use serde::{Deserialize, Serialize};

use crate::{JudgeEvent, Quality, ScoringConfig};

/// Verdict tallies for the result screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub good: u32,
    pub hold_complete: u32,
    pub miss: u32,
}

/// Running score and combo. Only judgment events move these numbers.
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    config: ScoringConfig,
    score: u64,
    combo: u32,
    max_combo: u32,
    counts: JudgmentCounts,
}

impl ScoreAccumulator {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            score: 0,
            combo: 0,
            max_combo: 0,
            counts: JudgmentCounts::default(),
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn counts(&self) -> JudgmentCounts {
        self.counts
    }

    pub fn base_points(&self, quality: Quality) -> u64 {
        match quality {
            Quality::Perfect => self.config.perfect_points,
            Quality::Good => self.config.good_points,
        }
    }

    pub fn apply(&mut self, event: &JudgeEvent) {
        match *event {
            JudgeEvent::Hit { quality, .. } => self.apply_hit(quality, false),
            JudgeEvent::HoldStart { quality, .. } => self.apply_hit(quality, true),
            JudgeEvent::HoldComplete { .. } => self.apply_hold_complete(),
            JudgeEvent::Miss { .. } => self.apply_miss(),
        }
    }

    pub fn apply_hit(&mut self, quality: Quality, is_hold_start: bool) {
        let mut points = self.base_points(quality) as f64 * self.config.score_multiplier;
        if is_hold_start {
            points *= self.config.hold_start_scale;
        }
        self.add_points(points);

        match quality {
            Quality::Perfect => self.counts.perfect += 1,
            Quality::Good => self.counts.good += 1,
        }
    }

    pub fn apply_hold_complete(&mut self) {
        let points = self.config.hold_complete_points as f64 * self.config.score_multiplier;
        self.add_points(points);
        self.counts.hold_complete += 1;
    }

    /// Breaks the combo and takes the miss penalty, never dropping below zero.
    pub fn apply_miss(&mut self) {
        self.combo = 0;
        self.score = self.score.saturating_sub(self.config.miss_penalty);
        self.counts.miss += 1;
    }

    /// End-of-match multiplier for the current combo.
    pub fn combo_tier_multiplier(&self) -> u32 {
        let boost = self.config.combo_boost.max(0.0);
        self.config
            .combo_tiers
            .iter()
            .filter(|tier| {
                let threshold = (tier.threshold as f64 * boost).floor() as u32;
                self.combo >= threshold
            })
            .map(|tier| tier.multiplier)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    pub fn final_score(&self) -> u64 {
        self.score.saturating_mul(self.combo_tier_multiplier() as u64)
    }

    fn add_points(&mut self, points: f64) {
        self.score = self.score.saturating_add(points.max(0.0).floor() as u64);
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MissReason;

    fn accumulator() -> ScoreAccumulator {
        ScoreAccumulator::new(ScoringConfig::default())
    }

    #[test]
    fn hits_add_points_and_combo() {
        let mut score = accumulator();
        score.apply_hit(Quality::Perfect, false);
        score.apply_hit(Quality::Good, false);

        assert_eq!(score.score(), 450);
        assert_eq!(score.combo(), 2);
        assert_eq!(score.counts().perfect, 1);
        assert_eq!(score.counts().good, 1);
    }

    #[test]
    fn hold_start_is_worth_less_than_a_tap() {
        let mut score = accumulator();
        score.apply_hit(Quality::Perfect, true);
        assert_eq!(score.score(), 150);

        score.apply_hold_complete();
        assert_eq!(score.score(), 400);
        assert_eq!(score.combo(), 2);
    }

    #[test]
    fn multiplier_is_floored() {
        let mut score = ScoreAccumulator::new(ScoringConfig {
            score_multiplier: 1.15,
            ..ScoringConfig::default()
        });
        score.apply_hit(Quality::Good, false);
        // 150 * 1.15 = 172.5
        assert_eq!(score.score(), 172);
    }

    #[test]
    fn miss_resets_combo_and_never_goes_negative() {
        let mut score = accumulator();
        score.apply_miss();
        assert_eq!(score.score(), 0);
        assert_eq!(score.combo(), 0);

        score.apply_hit(Quality::Perfect, false);
        score.apply_hit(Quality::Perfect, false);
        score.apply_miss();

        assert_eq!(score.score(), 550);
        assert_eq!(score.combo(), 0);
        assert_eq!(score.max_combo(), 2);
        assert_eq!(score.counts().miss, 2);
    }

    #[test]
    fn applies_judge_events() {
        let mut score = accumulator();
        score.apply(&JudgeEvent::Hit {
            note: 0,
            quality: Quality::Perfect,
        });
        score.apply(&JudgeEvent::Miss {
            note: 1,
            reason: MissReason::Late,
        });
        assert_eq!(score.score(), 250);
        assert_eq!(score.combo(), 0);
    }

    #[test]
    fn combo_tiers_step_up() {
        let mut score = accumulator();
        let mut seen = Vec::new();
        for _ in 0..10 {
            score.apply_hit(Quality::Good, false);
            seen.push(score.combo_tier_multiplier());
        }
        assert_eq!(seen, vec![1, 1, 2, 2, 2, 3, 3, 3, 3, 5]);
        assert_eq!(score.final_score(), score.score() * 5);
    }

    #[test]
    fn combo_boost_lowers_thresholds() {
        let mut score = ScoreAccumulator::new(ScoringConfig {
            combo_boost: 0.7,
            ..ScoringConfig::default()
        });
        for _ in 0..7 {
            score.apply_hit(Quality::Good, false);
        }
        // Thresholds become 2, 4 and 7.
        assert_eq!(score.combo_tier_multiplier(), 5);
    }

    #[test]
    fn score_saturates_instead_of_overflowing() {
        let mut score = ScoreAccumulator::new(ScoringConfig {
            perfect_points: u64::MAX / 2,
            ..ScoringConfig::default()
        });
        for _ in 0..3 {
            score.apply_hit(Quality::Perfect, false);
        }

        assert_eq!(score.score(), u64::MAX);
        assert_eq!(score.combo_tier_multiplier(), 2);
        assert_eq!(score.final_score(), u64::MAX);
    }
}
