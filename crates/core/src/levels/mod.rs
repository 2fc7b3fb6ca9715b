use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Chart, ChartEntry, Result};

/// One playable duel: an opponent, a target score and a chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub enemy_name: String,
    pub length_sec: f64,
    /// Score the opponent is expected to reach; beating it wins the duel.
    pub expected_score: u64,
    pub lane_count: usize,
    pub notes: Vec<ChartEntry>,
}

impl Level {
    pub fn chart(&self) -> Result<Chart> {
        Chart::from_entries(&self.notes, self.lane_count, self.length_sec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn tap(lane: usize, time: f64) -> ChartEntry {
    ChartEntry::tap(lane, time)
}

fn hold(lane: usize, time: f64, duration: f64) -> ChartEntry {
    ChartEntry::hold(lane, time, duration)
}

/// The campaign, in unlock order.
pub fn builtin_levels() -> Vec<Level> {
    vec![
        Level {
            name: "Level 1: Simple Groove".into(),
            enemy_name: "Riff Kid".into(),
            length_sec: 18.0,
            expected_score: 3200,
            lane_count: 5,
            notes: vec![
                tap(0, 1.0),
                tap(1, 1.6),
                tap(2, 2.2),
                tap(3, 2.8),
                tap(4, 3.4),
                hold(2, 4.4, 0.9),
                tap(1, 6.0),
                tap(3, 6.6),
                tap(0, 8.0),
                tap(4, 8.6),
                hold(2, 10.0, 1.1),
                tap(3, 12.0),
                tap(1, 12.6),
                tap(4, 14.0),
                tap(0, 14.6),
            ],
        },
        Level {
            name: "Level 2: Hold Master".into(),
            enemy_name: "Sustain Queen".into(),
            length_sec: 20.0,
            expected_score: 5200,
            lane_count: 5,
            notes: vec![
                hold(0, 1.0, 1.2),
                hold(4, 3.2, 1.0),
                tap(2, 5.4),
                tap(2, 6.0),
                hold(1, 7.0, 0.8),
                tap(3, 9.0),
                hold(0, 10.4, 1.0),
                hold(4, 12.8, 0.9),
                tap(2, 15.0),
                tap(1, 15.6),
                tap(3, 16.2),
            ],
        },
        Level {
            name: "Level 3: Syncopation".into(),
            enemy_name: "Offbeat Ghost".into(),
            length_sec: 22.0,
            expected_score: 6800,
            lane_count: 5,
            notes: vec![
                tap(2, 1.0),
                tap(2, 1.35),
                tap(4, 1.9),
                tap(1, 2.6),
                tap(3, 2.95),
                hold(0, 4.2, 0.7),
                tap(4, 5.6),
                tap(1, 6.0),
                tap(3, 6.45),
                tap(2, 8.0),
                tap(4, 8.35),
                hold(1, 9.4, 0.9),
                tap(3, 11.2),
                tap(0, 12.0),
                hold(2, 13.6, 1.0),
                tap(4, 15.6),
                tap(1, 16.0),
                tap(3, 16.45),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_charts_are_valid() {
        for level in builtin_levels() {
            let chart = level.chart().expect("built-in chart should validate");
            assert_eq!(chart.lane_count(), 5);
            let last = chart.notes().last().unwrap();
            assert!(last.end() < level.length_sec);
        }
    }

    #[test]
    fn level_round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        std::fs::write(
            &path,
            r#"{
                "name": "Custom",
                "enemy_name": "Metronome",
                "length_sec": 5.0,
                "expected_score": 100,
                "lane_count": 3,
                "notes": [ { "lane": 0, "time": 1.0 }, { "lane": 2, "time": 2.0, "hold": 0.5 } ]
            }"#,
        )
        .unwrap();

        let level = Level::load(&path).unwrap();
        let chart = level.chart().unwrap();
        assert_eq!(chart.len(), 2);
        assert!(chart.notes()[1].is_hold());
    }
}
