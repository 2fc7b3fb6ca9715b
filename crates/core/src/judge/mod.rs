//! Note judgment against the match timeline.
//!
//! Input edges arrive through [`JudgmentEngine::attempt_hit`] and
//! [`JudgmentEngine::attempt_release`]; anything the player never touched is
//! resolved by [`JudgmentEngine::sweep_misses`], which is the only place
//! time alone turns a note into a miss.

use serde::{Deserialize, Serialize};

use crate::{Chart, DuelError, JudgmentConfig, JudgmentState};

/// Tone length for tap notes, in seconds.
pub const TAP_TONE_SECONDS: f64 = 0.3;

/// Pentatonic pitches used when a note carries no pitch of its own.
const LANE_PITCHES: [u8; 5] = [60, 62, 64, 67, 69];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Perfect,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissReason {
    /// Tap note that passed the good window untouched.
    Late,
    /// Hold note whose head passed the good window untouched.
    HoldNotStarted,
    EarlyRelease,
    /// Hold kept down past the end of its grace period.
    HoldTimedOut,
    /// Still unresolved when the match ended.
    Unplayed,
}

/// Verdict emitted by the engine and consumed by the score accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JudgeEvent {
    Hit { note: usize, quality: Quality },
    HoldStart { note: usize, quality: Quality },
    HoldComplete { note: usize },
    Miss { note: usize, reason: MissReason },
}

impl JudgeEvent {
    pub fn note(&self) -> usize {
        match *self {
            Self::Hit { note, .. }
            | Self::HoldStart { note, .. }
            | Self::HoldComplete { note }
            | Self::Miss { note, .. } => note,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }
}

/// Sound the frame loop should trigger in response to a successful press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundRequest {
    pub note: usize,
    pub pitch: u8,
    pub duration: f64,
}

pub fn lane_pitch(lane: usize) -> u8 {
    let octave = (lane / LANE_PITCHES.len()) as u8;
    LANE_PITCHES[lane % LANE_PITCHES.len()].saturating_add(octave.saturating_mul(12))
}

/// Holds the chart for one match and walks every note to a terminal state.
#[derive(Debug)]
pub struct JudgmentEngine {
    chart: Chart,
    config: JudgmentConfig,
    /// Index of the single note currently in `Holding`.
    active_hold: Option<usize>,
    /// Every note before this index is terminal.
    head: usize,
    sounds: Vec<SoundRequest>,
    rejected_transitions: usize,
}

impl JudgmentEngine {
    pub fn new(chart: Chart, config: JudgmentConfig) -> Self {
        Self {
            chart,
            config,
            active_hold: None,
            head: 0,
            sounds: Vec::new(),
            rejected_transitions: 0,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn config(&self) -> &JudgmentConfig {
        &self.config
    }

    pub fn active_hold(&self) -> Option<usize> {
        self.active_hold
    }

    /// Number of state transitions refused because the note was already
    /// resolved. Always zero unless the engine has a bug.
    pub fn rejected_transitions(&self) -> usize {
        self.rejected_transitions
    }

    /// Drains the sound triggers produced since the last call.
    pub fn take_sound_requests(&mut self) -> Vec<SoundRequest> {
        std::mem::take(&mut self.sounds)
    }

    /// Judges one input-down edge on `lane`.
    pub fn attempt_hit(&mut self, lane: usize, at: f64) -> Option<JudgeEvent> {
        let at = at.max(0.0);
        let good = self.config.good_window;

        let index = self.chart.notes()[self.head..]
            .iter()
            .take_while(|note| note.onset - good <= at)
            .position(|note| {
                note.lane == lane
                    && note.state() == JudgmentState::Pending
                    && (at - note.onset).abs() <= good
            })?
            + self.head;

        let note = &self.chart.notes()[index];
        let delta = at - note.onset;
        let quality = if delta.abs() <= self.config.perfect_window {
            Quality::Perfect
        } else {
            Quality::Good
        };
        let pitch = note.pitch.unwrap_or_else(|| lane_pitch(note.lane));
        let hold_duration = note.hold_duration;
        let is_hold = note.is_hold();

        if !is_hold {
            self.transition(index, JudgmentState::Hit(quality))?;
            tracing::debug!(note = index, lane, ?quality, delta, "tap hit");
            self.sounds.push(SoundRequest {
                note: index,
                pitch,
                duration: TAP_TONE_SECONDS,
            });
            return Some(JudgeEvent::Hit {
                note: index,
                quality,
            });
        }

        if let Some(active) = self.active_hold {
            tracing::debug!(note = index, active, "hold start ignored, another hold is active");
            return None;
        }

        self.transition(index, JudgmentState::Holding { start: quality })?;
        self.active_hold = Some(index);
        tracing::debug!(note = index, lane, ?quality, delta, "hold started");
        self.sounds.push(SoundRequest {
            note: index,
            pitch,
            duration: hold_duration,
        });
        Some(JudgeEvent::HoldStart {
            note: index,
            quality,
        })
    }

    /// Judges one input-up edge against the active hold, if any.
    pub fn attempt_release(&mut self, at: f64) -> Option<JudgeEvent> {
        let index = self.active_hold.take()?;
        let at = at.max(0.0);
        let note = &self.chart.notes()[index];
        let required_end = note.end();
        let tolerance = self.config.hold_tolerance();

        if at >= required_end - tolerance {
            self.transition(index, JudgmentState::Completed)?;
            tracing::debug!(note = index, at, required_end, "hold completed");
            Some(JudgeEvent::HoldComplete { note: index })
        } else {
            self.transition(index, JudgmentState::EarlyReleased)?;
            tracing::debug!(note = index, at, required_end, "hold released early");
            Some(JudgeEvent::Miss {
                note: index,
                reason: MissReason::EarlyRelease,
            })
        }
    }

    /// Resolves every note whose deadline has passed at `at`.
    pub fn sweep_misses(&mut self, at: f64) -> Vec<JudgeEvent> {
        let at = at.max(0.0);
        let good = self.config.good_window;
        let mut events = Vec::new();

        for index in self.head..self.chart.len() {
            let note = &self.chart.notes()[index];
            let verdict = match note.state() {
                JudgmentState::Pending if note.onset + good < at => {
                    let reason = if note.is_hold() {
                        MissReason::HoldNotStarted
                    } else {
                        MissReason::Late
                    };
                    Some((JudgmentState::Missed, reason))
                }
                // Onsets never decrease, so nothing further on can be due.
                JudgmentState::Pending => break,
                JudgmentState::Holding { .. } if note.end() + good < at => {
                    Some((JudgmentState::TimedOut, MissReason::HoldTimedOut))
                }
                _ => None,
            };

            if let Some((state, reason)) = verdict {
                if self.transition(index, state).is_some() {
                    if self.active_hold == Some(index) {
                        self.active_hold = None;
                    }
                    tracing::debug!(note = index, ?reason, "swept miss");
                    events.push(JudgeEvent::Miss {
                        note: index,
                        reason,
                    });
                }
            }
        }

        self.advance_head();
        events
    }

    /// Forces every unresolved note to a terminal state. Used when the match
    /// ends before the chart does.
    pub fn finalize(&mut self) -> Vec<JudgeEvent> {
        let mut events = Vec::new();
        for index in self.head..self.chart.len() {
            let state = match self.chart.notes()[index].state() {
                JudgmentState::Pending => JudgmentState::Missed,
                JudgmentState::Holding { .. } => JudgmentState::TimedOut,
                _ => continue,
            };
            if self.transition(index, state).is_some() {
                events.push(JudgeEvent::Miss {
                    note: index,
                    reason: MissReason::Unplayed,
                });
            }
        }
        self.active_hold = None;
        self.advance_head();
        events
    }

    /// Drops the active hold when the match is torn down. The held note is
    /// treated as released early.
    pub fn cancel_hold(&mut self) -> Option<JudgeEvent> {
        let index = self.active_hold.take()?;
        self.transition(index, JudgmentState::EarlyReleased)?;
        Some(JudgeEvent::Miss {
            note: index,
            reason: MissReason::EarlyRelease,
        })
    }

    fn transition(&mut self, index: usize, to: JudgmentState) -> Option<()> {
        let result = match self.chart.notes_mut().get_mut(index) {
            Some(note) => note.transition(index, to),
            None => Err(DuelError::msg(format!("note {index} does not exist"))),
        };
        match result {
            Ok(()) => Some(()),
            Err(err) => {
                self.rejected_transitions += 1;
                tracing::warn!(%err, "rejected note transition");
                None
            }
        }
    }

    fn advance_head(&mut self) {
        let notes = self.chart.notes();
        while self.head < notes.len() && notes[self.head].state().is_terminal() {
            self.head += 1;
        }
    }
}
