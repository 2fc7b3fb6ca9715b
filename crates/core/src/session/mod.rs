//! One match, wired end to end.
//!
//! [`MatchSession::tick`] is the visual-frame callback and
//! [`MatchSession::pump_scheduler`] is the coarse audio timer callback. The
//! two share only the audio clock; the scheduler's cursor is touched by the
//! timer side alone.

use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, AudioBackend, AudioClock, AudioCommand, AudioEngine, Chart, EventScheduler,
    InputSnapshot, JudgeEvent, JudgmentCounts, JudgmentEngine, Level, MatchTimeline, Phase,
    ScheduledEvent, ScoreAccumulator,
};

/// Fraction of the final score paid out as money.
const EARNINGS_DIVISOR: u64 = 10;

/// Match-level state as shown on the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub phase: Phase,
    pub elapsed_play_time: f64,
    pub score: u64,
    pub combo: u32,
}

/// Result of a finished match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub raw_score: u64,
    pub combo_multiplier: u32,
    pub final_score: u64,
    pub enemy_score: u64,
    pub win: bool,
    pub earned: u64,
    pub max_combo: u32,
    pub counts: JudgmentCounts,
}

impl MatchOutcome {
    pub fn from_score(score: &ScoreAccumulator, enemy_score: u64) -> Self {
        let combo_multiplier = score.combo_tier_multiplier();
        let final_score = score.final_score();
        let win = final_score >= enemy_score;
        let mut earned = final_score / EARNINGS_DIVISOR;
        if win {
            // 20% bonus, floored.
            earned = earned * 6 / 5;
        }

        Self {
            raw_score: score.score(),
            combo_multiplier,
            final_score,
            enemy_score,
            win,
            earned,
            max_combo: score.max_combo(),
            counts: score.counts(),
        }
    }
}

/// Everything a single frame produced.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub entered: Option<Phase>,
    pub elapsed: Option<f64>,
    pub judgments: Vec<JudgeEvent>,
    pub triggered: Vec<ScheduledEvent>,
}

#[derive(Debug)]
pub struct MatchSession<B> {
    config: AppConfig,
    timeline: MatchTimeline,
    engine: JudgmentEngine,
    score: ScoreAccumulator,
    scheduler: EventScheduler,
    audio: AudioEngine<B>,
    enemy_score: u64,
    outcome: Option<MatchOutcome>,
}

impl<B: AudioBackend> MatchSession<B> {
    pub fn new(chart: Chart, enemy_score: u64, config: AppConfig, backend: B) -> Self {
        let timeline = MatchTimeline::new(config.match_.countdown_from, chart.duration());
        let engine = JudgmentEngine::new(chart, config.judgment.clone());
        let score = ScoreAccumulator::new(config.scoring.clone());
        let scheduler = EventScheduler::new(config.scheduler.clone());

        Self {
            config,
            timeline,
            engine,
            score,
            scheduler,
            audio: AudioEngine::new(backend),
            enemy_score,
            outcome: None,
        }
    }

    /// Builds a session for a level. A chart that fails validation still
    /// yields a playable, note-less match of the level's length.
    pub fn for_level(level: &Level, config: AppConfig, backend: B) -> Self {
        let chart = level.chart().unwrap_or_else(|err| {
            tracing::warn!(level = %level.name, %err, "unusable chart, running without notes");
            Chart::empty(level.lane_count, level.length_sec)
        });
        Self::new(chart, level.expected_score, config, backend)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &JudgmentEngine {
        &self.engine
    }

    pub fn score(&self) -> &ScoreAccumulator {
        &self.score
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn timeline(&self) -> &MatchTimeline {
        &self.timeline
    }

    pub fn audio(&self) -> &AudioEngine<B> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine<B> {
        &mut self.audio
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn state(&self) -> MatchState {
        MatchState {
            phase: self.timeline.phase(),
            elapsed_play_time: self.timeline.elapsed(),
            score: self.score.score(),
            combo: self.score.combo(),
        }
    }

    /// Leaves `Loading`. The audio device is brought up here so that play
    /// starts on a live clock.
    pub fn assets_ready(&mut self) {
        self.audio.ensure();
        self.timeline.mark_ready();
    }

    /// Visual-frame callback.
    pub fn tick(&mut self, wall_delta: f64, input: InputSnapshot) -> TickReport {
        let step = self.timeline.advance(wall_delta, self.audio.now());
        let mut report = TickReport {
            entered: step.entered,
            elapsed: step.elapsed,
            ..TickReport::default()
        };

        if let Some(Phase::Play { .. }) = step.entered {
            self.scheduler
                .start(self.config.scheduler.step_interval(), &mut self.audio);
        }

        if let Some(elapsed) = step.elapsed {
            self.judge(elapsed, input, &mut report);
        }

        if step.entered == Some(Phase::Finished) {
            self.finish(&mut report);
        }

        report
    }

    /// Audio timer callback.
    pub fn pump_scheduler(&mut self, wall_delta: f64) -> Vec<ScheduledEvent> {
        self.scheduler.poll(wall_delta, &mut self.audio)
    }

    /// Tears the match down early.
    pub fn on_exit(&mut self) {
        self.scheduler.stop();
        if let Some(event) = self.engine.cancel_hold() {
            tracing::debug!(note = event.note(), "active hold dropped on exit");
            self.score.apply(&event);
        }
    }

    fn judge(&mut self, elapsed: f64, input: InputSnapshot, report: &mut TickReport) {
        // Both edges with the pointer still down means the release came
        // first.
        let release_first = input.just_pressed && input.just_released && input.pressed;
        if release_first {
            report.judgments.extend(self.engine.attempt_release(elapsed));
        }
        if input.just_pressed {
            if let Some(lane) = input.pointer_lane {
                report.judgments.extend(self.engine.attempt_hit(lane, elapsed));
            }
        }
        if input.just_released && !release_first {
            report.judgments.extend(self.engine.attempt_release(elapsed));
        }
        report.judgments.extend(self.engine.sweep_misses(elapsed));

        for event in &report.judgments {
            self.score.apply(event);
        }

        for sound in self.engine.take_sound_requests() {
            let command = AudioCommand::Tone {
                pitch: sound.pitch,
                duration: sound.duration,
            };
            report
                .triggered
                .push(self.scheduler.trigger_now(command, &mut self.audio));
        }
    }

    fn finish(&mut self, report: &mut TickReport) {
        let leftovers = self.engine.finalize();
        for event in &leftovers {
            self.score.apply(event);
        }
        report.judgments.extend(leftovers);
        self.scheduler.stop();

        let outcome = MatchOutcome::from_score(&self.score, self.enemy_score);
        tracing::info!(
            final_score = outcome.final_score,
            enemy_score = outcome.enemy_score,
            win = outcome.win,
            earned = outcome.earned,
            "match finished"
        );
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChartEntry, JudgmentState, Quality, ScoringConfig, SimulatedBackend};

    fn press(lane: usize) -> InputSnapshot {
        InputSnapshot {
            pointer_lane: Some(lane),
            pressed: true,
            just_pressed: true,
            just_released: false,
        }
    }

    /// Session with no countdown, already in `Play` at audio time zero.
    fn playing(chart: Chart) -> MatchSession<SimulatedBackend> {
        let mut config = AppConfig::default();
        config.match_.countdown_from = 0;
        let mut session = MatchSession::new(chart, 0, config, SimulatedBackend::new());
        session.assets_ready();
        session.tick(0.0, InputSnapshot::default());
        session.tick(0.0, InputSnapshot::default());
        session
    }

    fn state_of(session: &MatchSession<SimulatedBackend>, index: usize) -> Option<JudgmentState> {
        session.engine().chart().note(index).map(|note| note.state())
    }

    #[test]
    fn outcome_applies_combo_multiplier_and_win_bonus() {
        let mut score = ScoreAccumulator::new(ScoringConfig::default());
        for _ in 0..3 {
            score.apply_hit(Quality::Perfect, false);
        }

        let win = MatchOutcome::from_score(&score, 1800);
        assert_eq!(win.final_score, 1800);
        assert!(win.win);
        assert_eq!(win.earned, 216);

        let loss = MatchOutcome::from_score(&score, 5000);
        assert!(!loss.win);
        assert_eq!(loss.earned, 180);
    }

    #[test]
    fn invalid_level_chart_degrades_to_empty_match() {
        let level = Level {
            name: "Broken".into(),
            enemy_name: "Nobody".into(),
            length_sec: 4.0,
            expected_score: 0,
            lane_count: 2,
            notes: vec![ChartEntry::tap(7, 1.0)],
        };

        let session = MatchSession::for_level(&level, AppConfig::default(), SimulatedBackend::new());

        assert!(session.engine().chart().is_empty());
        assert_eq!(session.timeline().length(), 4.0);
    }

    #[test]
    fn exit_stops_scheduler() {
        let chart = Chart::from_entries(&[ChartEntry::hold(0, 0.5, 2.0)], 1, 5.0).unwrap();
        let mut config = AppConfig::default();
        config.match_.countdown_from = 0;
        let mut session = MatchSession::new(chart, 0, config, SimulatedBackend::new());

        session.assets_ready();
        session.tick(0.0, InputSnapshot::default());
        session.tick(0.0, InputSnapshot::default());
        assert!(session.scheduler().is_running());

        session.audio_mut().backend_mut().advance(0.5);
        session.tick(
            0.5,
            InputSnapshot {
                pointer_lane: Some(0),
                pressed: true,
                just_pressed: true,
                just_released: false,
            },
        );
        assert_eq!(session.engine().active_hold(), Some(0));

        session.on_exit();
        session.on_exit();

        assert!(!session.scheduler().is_running());
        assert_eq!(session.engine().active_hold(), None);
        assert!(session.pump_scheduler(1.0).is_empty());
    }

    #[test]
    fn exit_during_hold_counts_as_miss() {
        let chart = Chart::from_entries(
            &[ChartEntry::tap(1, 0.2), ChartEntry::hold(0, 0.5, 2.0)],
            2,
            5.0,
        )
        .unwrap();
        let mut session = playing(chart);

        session.audio_mut().backend_mut().advance(0.2);
        session.tick(0.2, press(1));
        session.tick(0.0, InputSnapshot::default());
        session.audio_mut().backend_mut().advance(0.3);
        session.tick(0.3, press(0));
        assert!(session.score().combo() > 0);

        session.on_exit();

        assert_eq!(state_of(&session, 1), Some(JudgmentState::EarlyReleased));
        assert_eq!(session.score().combo(), 0);
        assert_eq!(session.score().counts().miss, 1);
    }

    #[test]
    fn release_then_press_in_one_frame_starts_next_hold() {
        let chart = Chart::from_entries(
            &[ChartEntry::hold(0, 0.5, 1.0), ChartEntry::hold(1, 1.5, 1.0)],
            2,
            5.0,
        )
        .unwrap();
        let mut session = playing(chart);

        session.audio_mut().backend_mut().advance(0.5);
        session.tick(0.5, press(0));
        assert_eq!(session.engine().active_hold(), Some(0));

        session.audio_mut().backend_mut().advance(1.0);
        let report = session.tick(
            1.0,
            InputSnapshot {
                pointer_lane: Some(1),
                pressed: true,
                just_pressed: true,
                just_released: true,
            },
        );

        assert_eq!(report.judgments.len(), 2);
        assert_eq!(state_of(&session, 0), Some(JudgmentState::Completed));
        assert!(matches!(
            state_of(&session, 1),
            Some(JudgmentState::Holding { .. })
        ));
        assert_eq!(session.engine().active_hold(), Some(1));
    }

    #[test]
    fn press_then_release_in_one_frame_keeps_order() {
        let chart = Chart::from_entries(&[ChartEntry::tap(0, 0.5)], 1, 5.0).unwrap();
        let mut session = playing(chart);

        session.audio_mut().backend_mut().advance(0.5);
        let report = session.tick(
            0.5,
            InputSnapshot {
                pointer_lane: Some(0),
                pressed: false,
                just_pressed: true,
                just_released: true,
            },
        );

        assert_eq!(report.judgments.len(), 1);
        assert!(matches!(state_of(&session, 0), Some(JudgmentState::Hit(_))));
    }

    #[test]
    fn nothing_is_judged_or_scheduled_before_play() {
        let chart = Chart::from_entries(&[ChartEntry::tap(0, 0.2)], 1, 5.0).unwrap();
        let mut config = AppConfig::default();
        config.match_.countdown_from = 1;
        let mut session = MatchSession::new(chart, 0, config, SimulatedBackend::new());

        let loading = session.tick(0.1, press(0));
        assert!(loading.judgments.is_empty());
        assert!(session.pump_scheduler(0.1).is_empty());

        session.assets_ready();
        let entered = session.tick(0.0, InputSnapshot::default());
        assert!(matches!(entered.entered, Some(Phase::Countdown { .. })));

        session.audio_mut().backend_mut().advance(0.5);
        let countdown = session.tick(0.5, press(0));
        assert!(countdown.judgments.is_empty());
        assert!(countdown.triggered.is_empty());
        assert!(session.pump_scheduler(0.5).is_empty());
        assert!(!session.scheduler().is_running());

        session.audio_mut().backend_mut().advance(0.6);
        let play = session.tick(0.6, InputSnapshot::default());
        assert!(matches!(play.entered, Some(Phase::Play { .. })));
        assert_eq!(state_of(&session, 0), Some(JudgmentState::Pending));
        assert_eq!(session.score().counts(), JudgmentCounts::default());
    }
}
