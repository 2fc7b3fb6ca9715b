use serde::{Deserialize, Serialize};

use crate::Chart;

/// Input state as seen by one frame tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Lane under the pointer, if any.
    pub pointer_lane: Option<usize>,
    pub pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

/// Edge buffer between raw pointer callbacks and the frame tick.
///
/// Callbacks may fire any number of times between two frames; the tick sees
/// each physical press and release exactly once because edges are cleared
/// only by [`InputEdges::take_snapshot`].
#[derive(Debug, Clone, Default)]
pub struct InputEdges {
    pointer_lane: Option<usize>,
    down: bool,
    just_down: bool,
    just_up: bool,
}

impl InputEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_over(&mut self, lane: Option<usize>) {
        self.pointer_lane = lane;
    }

    pub fn press(&mut self) {
        if !self.down {
            self.just_down = true;
        }
        self.down = true;
    }

    pub fn release(&mut self) {
        if self.down {
            self.just_up = true;
        }
        self.down = false;
    }

    /// Current state without consuming edges.
    pub fn peek(&self) -> InputSnapshot {
        InputSnapshot {
            pointer_lane: self.pointer_lane,
            pressed: self.down,
            just_pressed: self.just_down,
            just_released: self.just_up,
        }
    }

    /// Returns this frame's snapshot and clears the edge flags. Held state
    /// and pointer position carry over.
    pub fn take_snapshot(&mut self) -> InputSnapshot {
        let snapshot = self.peek();
        self.just_down = false;
        self.just_up = false;
        snapshot
    }
}

/// Gap between press and release for a scripted tap.
const SCRIPTED_TAP_LENGTH: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScriptedAction {
    Press { lane: usize },
    Release,
}

/// Timestamped pointer edges replayed into an [`InputEdges`] buffer.
///
/// Drives headless matches: the same script against the same chart always
/// produces the same judgments.
#[derive(Debug, Clone, Default)]
pub struct InputScript {
    actions: Vec<(f64, ScriptedAction)>,
    cursor: usize,
}

impl InputScript {
    pub fn new(mut actions: Vec<(f64, ScriptedAction)>) -> Self {
        actions.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { actions, cursor: 0 }
    }

    /// A player that presses every note `offset` seconds off its onset and
    /// lets go at the end of holds. With `skip_every = Some(k)` every k-th
    /// note is left alone.
    pub fn from_chart(chart: &Chart, offset: f64, skip_every: Option<usize>) -> Self {
        let played: Vec<_> = chart
            .notes()
            .iter()
            .enumerate()
            .filter(|(index, _)| !matches!(skip_every, Some(k) if k > 0 && (index + 1) % k == 0))
            .map(|(_, note)| note)
            .collect();

        let mut actions = Vec::with_capacity(played.len() * 2);
        for (position, note) in played.iter().enumerate() {
            let press = note.onset + offset;
            let held_until = if note.is_hold() {
                note.end()
            } else {
                note.onset + SCRIPTED_TAP_LENGTH
            };
            let mut release = held_until + offset;
            // Let go no later than the next press, or that press is lost.
            if let Some(next) = played.get(position + 1) {
                release = release.min(next.onset + offset).max(press);
            }
            actions.push((press, ScriptedAction::Press { lane: note.lane }));
            actions.push((release, ScriptedAction::Release));
        }
        // The sort is stable, so a release sharing a timestamp with the next
        // press stays ahead of it.
        Self::new(actions)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.actions.len()
    }

    /// Feeds every action due by `elapsed` into `edges`.
    pub fn apply_until(&mut self, elapsed: f64, edges: &mut InputEdges) {
        while let Some(&(at, action)) = self.actions.get(self.cursor) {
            if at > elapsed {
                break;
            }
            match action {
                ScriptedAction::Press { lane } => {
                    edges.pointer_over(Some(lane));
                    edges.press();
                }
                ScriptedAction::Release => edges.release(),
            }
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChartEntry;

    #[test]
    fn edges_are_seen_once() {
        let mut input = InputEdges::new();
        input.pointer_over(Some(2));
        input.press();

        let first = input.take_snapshot();
        assert!(first.just_pressed);
        assert!(first.pressed);
        assert_eq!(first.pointer_lane, Some(2));

        let second = input.take_snapshot();
        assert!(!second.just_pressed);
        assert!(second.pressed);
    }

    #[test]
    fn repeated_press_callbacks_count_once() {
        let mut input = InputEdges::new();
        input.press();
        input.take_snapshot();
        input.press();

        assert!(!input.take_snapshot().just_pressed);
    }

    #[test]
    fn press_and_release_within_one_frame_report_both_edges() {
        let mut input = InputEdges::new();
        input.press();
        input.release();

        let snapshot = input.take_snapshot();
        assert!(snapshot.just_pressed);
        assert!(snapshot.just_released);
        assert!(!snapshot.pressed);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut input = InputEdges::new();
        input.release();
        assert_eq!(input.take_snapshot(), InputSnapshot::default());
    }

    #[test]
    fn script_replays_chart_presses() {
        let chart = Chart::from_entries(
            &[ChartEntry::tap(1, 1.0), ChartEntry::hold(3, 2.0, 1.0)],
            5,
            5.0,
        )
        .unwrap();
        let mut script = InputScript::from_chart(&chart, 0.02, None);
        let mut edges = InputEdges::new();

        script.apply_until(0.5, &mut edges);
        assert_eq!(edges.take_snapshot(), InputSnapshot::default());

        script.apply_until(1.03, &mut edges);
        let press = edges.take_snapshot();
        assert!(press.just_pressed);
        assert_eq!(press.pointer_lane, Some(1));

        script.apply_until(1.1, &mut edges);
        assert!(edges.take_snapshot().just_released);

        script.apply_until(2.5, &mut edges);
        let hold = edges.take_snapshot();
        assert!(hold.just_pressed && hold.pressed);
        assert_eq!(hold.pointer_lane, Some(3));

        script.apply_until(3.1, &mut edges);
        assert!(edges.take_snapshot().just_released);
        assert!(script.is_exhausted());
    }

    #[test]
    fn script_can_skip_notes() {
        let chart = Chart::from_entries(
            &[ChartEntry::tap(0, 1.0), ChartEntry::tap(1, 2.0), ChartEntry::tap(2, 3.0)],
            5,
            5.0,
        )
        .unwrap();
        let mut script = InputScript::from_chart(&chart, 0.0, Some(2));
        let mut edges = InputEdges::new();

        script.apply_until(2.5, &mut edges);
        let snapshot = edges.take_snapshot();
        // Only the first note was played; the second was skipped.
        assert_eq!(snapshot.pointer_lane, Some(0));
    }

    #[test]
    fn script_releases_before_a_close_following_tap() {
        let chart = Chart::from_entries(
            &[ChartEntry::tap(0, 1.0), ChartEntry::tap(1, 1.03)],
            5,
            5.0,
        )
        .unwrap();
        let mut script = InputScript::from_chart(&chart, 0.0, None);
        let mut edges = InputEdges::new();

        script.apply_until(1.0, &mut edges);
        assert!(edges.take_snapshot().just_pressed);

        script.apply_until(1.03, &mut edges);
        let second = edges.take_snapshot();
        assert!(second.just_released);
        assert!(second.just_pressed);
        assert!(second.pressed);
        assert_eq!(second.pointer_lane, Some(1));
    }
}
