//! Match phase control.
//!
//! The countdown runs on accumulated frame deltas. Once play starts, elapsed
//! time is re-derived from the audio clock on every tick, so a dropped frame
//! never makes judgment drift away from what the player hears.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the chart and assets.
    Loading,
    Countdown { remaining: u32 },
    Play { start_audio_time: f64 },
    Finished,
}

/// What one call to [`MatchTimeline::advance`] asks the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelineStep {
    /// Phase entered during this tick.
    pub entered: Option<Phase>,
    /// Play-time to judge at. Only set for ticks that began in `Play`.
    pub elapsed: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MatchTimeline {
    phase: Phase,
    countdown_from: u32,
    countdown_seconds: f64,
    length: f64,
    ready: bool,
    elapsed: f64,
}

impl MatchTimeline {
    pub fn new(countdown_from: u32, length: f64) -> Self {
        Self {
            phase: Phase::Loading,
            countdown_from,
            countdown_seconds: 0.0,
            length: length.max(0.0),
            ready: false,
            elapsed: 0.0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Play time as of the last `Play` tick.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Signals that the chart and assets are available.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Runs one frame of the phase machine.
    pub fn advance(&mut self, wall_delta: f64, audio_now: f64) -> TimelineStep {
        let wall_delta = wall_delta.max(0.0);

        match self.phase {
            Phase::Loading => {
                if !self.ready {
                    return TimelineStep::default();
                }
                self.countdown_seconds = 0.0;
                self.enter(Phase::Countdown {
                    remaining: self.countdown_from,
                })
            }
            Phase::Countdown { mut remaining } => {
                self.countdown_seconds += wall_delta;
                while remaining > 0 && self.countdown_seconds >= 1.0 {
                    self.countdown_seconds -= 1.0;
                    remaining -= 1;
                }

                if remaining == 0 {
                    self.elapsed = 0.0;
                    return self.enter(Phase::Play {
                        start_audio_time: audio_now,
                    });
                }
                self.phase = Phase::Countdown { remaining };
                TimelineStep::default()
            }
            Phase::Play { start_audio_time } => {
                let elapsed = (audio_now - start_audio_time).max(0.0);
                self.elapsed = elapsed;

                let mut step = TimelineStep {
                    entered: None,
                    elapsed: Some(elapsed),
                };
                if elapsed > self.length {
                    step.entered = self.enter(Phase::Finished).entered;
                }
                step
            }
            Phase::Finished => TimelineStep::default(),
        }
    }

    fn enter(&mut self, phase: Phase) -> TimelineStep {
        tracing::info!(from = ?self.phase, to = ?phase, "match phase change");
        self.phase = phase;
        TimelineStep {
            entered: Some(phase),
            elapsed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(countdown: u32, length: f64) -> MatchTimeline {
        let mut timeline = MatchTimeline::new(countdown, length);
        timeline.mark_ready();
        timeline.advance(0.0, 0.0);
        timeline
    }

    #[test]
    fn waits_in_loading_until_ready() {
        let mut timeline = MatchTimeline::new(3, 10.0);
        assert_eq!(timeline.advance(5.0, 5.0), TimelineStep::default());
        assert_eq!(timeline.phase(), Phase::Loading);

        timeline.mark_ready();
        let step = timeline.advance(0.016, 5.0);
        assert_eq!(step.entered, Some(Phase::Countdown { remaining: 3 }));
    }

    #[test]
    fn countdown_ticks_once_per_second_of_frame_time() {
        let mut timeline = started(3, 10.0);

        for _ in 0..59 {
            timeline.advance(1.0 / 60.0, 0.0);
        }
        assert_eq!(timeline.phase(), Phase::Countdown { remaining: 3 });

        timeline.advance(0.5, 0.0);
        assert_eq!(timeline.phase(), Phase::Countdown { remaining: 2 });
    }

    #[test]
    fn long_hitch_consumes_several_counts() {
        let mut timeline = started(3, 10.0);
        timeline.advance(2.5, 0.0);
        assert_eq!(timeline.phase(), Phase::Countdown { remaining: 1 });
    }

    #[test]
    fn play_starts_at_current_audio_time() {
        let mut timeline = started(1, 10.0);

        let step = timeline.advance(1.0, 7.25);

        assert_eq!(
            step.entered,
            Some(Phase::Play {
                start_audio_time: 7.25
            })
        );
        assert_eq!(step.elapsed, None);
    }

    #[test]
    fn play_elapsed_follows_audio_clock_not_frame_delta() {
        let mut timeline = started(0, 10.0);
        timeline.advance(0.0, 2.0);

        let step = timeline.advance(0.016, 3.5);
        assert_eq!(step.elapsed, Some(1.5));

        // Audio clock ran backwards: clamp instead of judging negative time.
        let step = timeline.advance(0.016, 1.0);
        assert_eq!(step.elapsed, Some(0.0));
    }

    #[test]
    fn finishes_after_match_length() {
        let mut timeline = started(0, 10.0);
        timeline.advance(0.0, 0.0);

        assert_eq!(timeline.advance(0.0, 10.0).entered, None);
        let step = timeline.advance(0.0, 10.01);

        assert_eq!(step.entered, Some(Phase::Finished));
        assert_eq!(step.elapsed, Some(10.01));
        assert!(timeline.is_finished());
        assert_eq!(timeline.advance(1.0, 20.0), TimelineStep::default());
    }
}
