//! Immutable note timeline for a single match.
//!
//! A [`Chart`] owns its notes for the whole match. The only thing that ever
//! changes after construction is each note's [`JudgmentState`], and that goes
//! through [`Note::transition`] so an already-resolved note can never be
//! judged twice.

use serde::{Deserialize, Serialize};

use crate::{DuelError, Quality, Result};

/// External chart record, as found in level data or produced by a chart
/// derivation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub lane: usize,
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<u8>,
}

impl ChartEntry {
    pub fn tap(lane: usize, time: f64) -> Self {
        Self {
            lane,
            time,
            hold: None,
            pitch: None,
        }
    }

    pub fn hold(lane: usize, time: f64, hold: f64) -> Self {
        Self {
            lane,
            time,
            hold: Some(hold),
            pitch: None,
        }
    }
}

/// Per-note judgment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgmentState {
    Pending,
    /// Hold note pressed and not yet released.
    Holding { start: Quality },
    Hit(Quality),
    Missed,
    Completed,
    EarlyReleased,
    TimedOut,
}

impl JudgmentState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Holding { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub lane: usize,
    /// Match-elapsed seconds at which the note should be hit.
    pub onset: f64,
    /// Zero for tap notes.
    pub hold_duration: f64,
    pub pitch: Option<u8>,
    state: JudgmentState,
}

impl Note {
    pub fn new(lane: usize, onset: f64, hold_duration: f64, pitch: Option<u8>) -> Self {
        Self {
            lane,
            onset,
            hold_duration,
            pitch,
            state: JudgmentState::Pending,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.hold_duration > 0.0
    }

    pub fn state(&self) -> JudgmentState {
        self.state
    }

    /// Time at which a hold note's sustain ends. Equal to `onset` for taps.
    pub fn end(&self) -> f64 {
        self.onset + self.hold_duration
    }

    /// Moves the note along one edge of its state machine.
    ///
    /// `index` is only used to label the error.
    pub fn transition(&mut self, index: usize, to: JudgmentState) -> Result<()> {
        use JudgmentState::*;

        let allowed = match (self.state, to) {
            (Pending, Hit(_)) => !self.is_hold(),
            (Pending, Holding { .. }) => self.is_hold(),
            (Pending, Missed) => true,
            (Holding { .. }, Completed | EarlyReleased | TimedOut) => true,
            _ => false,
        };

        if !allowed {
            return Err(DuelError::InvalidTransition {
                note: index,
                from: self.state,
                to,
            });
        }

        self.state = to;
        Ok(())
    }
}

/// Time-ordered sequence of notes plus the match metadata that travels with
/// it.
#[derive(Debug, Clone)]
pub struct Chart {
    notes: Vec<Note>,
    lane_count: usize,
    duration: f64,
}

impl Chart {
    /// Builds a chart, checking the post-conditions the judgment engine relies
    /// on. Entries are never re-sorted.
    pub fn from_entries(entries: &[ChartEntry], lane_count: usize, duration: f64) -> Result<Self> {
        if lane_count == 0 {
            return Err(DuelError::InvalidChart("lane count must be positive".into()));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(DuelError::InvalidChart(format!(
                "match duration {duration} is not a non-negative number"
            )));
        }

        let mut notes = Vec::with_capacity(entries.len());
        let mut previous = 0.0_f64;
        for (index, entry) in entries.iter().enumerate() {
            if entry.lane >= lane_count {
                return Err(DuelError::InvalidChart(format!(
                    "note {index}: lane {} outside 0..{lane_count}",
                    entry.lane
                )));
            }
            if !entry.time.is_finite() || entry.time < 0.0 {
                return Err(DuelError::InvalidChart(format!(
                    "note {index}: time {} is not a non-negative number",
                    entry.time
                )));
            }
            if entry.time < previous {
                return Err(DuelError::InvalidChart(format!(
                    "note {index}: time {} precedes previous note at {previous}",
                    entry.time
                )));
            }
            let hold = match entry.hold {
                Some(hold) if !hold.is_finite() || hold <= 0.0 => {
                    return Err(DuelError::InvalidChart(format!(
                        "note {index}: hold {hold} must be positive"
                    )));
                }
                Some(hold) => hold,
                None => 0.0,
            };

            previous = entry.time;
            notes.push(Note::new(entry.lane, entry.time, hold, entry.pitch));
        }

        Ok(Self {
            notes,
            lane_count,
            duration,
        })
    }

    /// A chart without judgable notes; the match still runs for `duration`.
    pub fn empty(lane_count: usize, duration: f64) -> Self {
        Self {
            notes: Vec::new(),
            lane_count: lane_count.max(1),
            duration: duration.max(0.0),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    pub fn note(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn all_resolved(&self) -> bool {
        self.notes.iter().all(|note| note.state().is_terminal())
    }
}
