//! Lookahead audio scheduler.
//!
//! A coarse timer wakes the scheduler every few tens of milliseconds. Each
//! wake-up enqueues every step whose fire time falls inside the lookahead
//! horizon, stamping it with the exact audio-clock time it should sound at.
//! The timer may be late or jittery; the fire times are not.

use serde::{Deserialize, Serialize};

use crate::{AudioBackend, AudioClock, AudioCommand, AudioEngine, Percussion, SchedulerConfig};

/// Shortest step interval `start` accepts.
const MIN_STEP_INTERVAL: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Audio-clock time the command fires at.
    pub fire_at: f64,
    pub command: AudioCommand,
    /// Cursor value that produced the event; `None` for immediate triggers.
    pub step: Option<u64>,
}

impl ScheduledEvent {
    pub fn new(fire_at: f64, command: AudioCommand, step: Option<u64>) -> Self {
        Self {
            fire_at,
            command,
            step,
        }
    }
}

/// Low-resolution interval timer driven by wall-clock deltas.
///
/// Reports how many wake-ups became due since the last call. A disarmed timer
/// never reports any.
#[derive(Debug, Clone)]
pub struct LookaheadTimer {
    interval: f64,
    accumulated: f64,
    armed: bool,
}

impl LookaheadTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: (interval_ms.max(1) as f64) / 1000.0,
            accumulated: 0.0,
            armed: false,
        }
    }

    pub fn arm(&mut self) {
        self.accumulated = 0.0;
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.accumulated = 0.0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn advance(&mut self, wall_delta: f64) -> u32 {
        if !self.armed || !wall_delta.is_finite() || wall_delta <= 0.0 {
            return 0;
        }
        self.accumulated += wall_delta;
        let due = (self.accumulated / self.interval).floor();
        self.accumulated -= due * self.interval;
        due as u32
    }
}

/// Drum groove played under the match: kick on beats one and three, snare
/// on two and four, hi-hat on every beat.
pub fn backbeat(step: u64) -> [Percussion; 2] {
    let drum = if step % 2 == 0 {
        Percussion::Kick
    } else {
        Percussion::Snare
    };
    [drum, Percussion::Hat]
}

/// Periodic scheduler that owns its step cursor exclusively.
#[derive(Debug)]
pub struct EventScheduler {
    config: SchedulerConfig,
    timer: LookaheadTimer,
    running: bool,
    step_interval: f64,
    next_fire_time: f64,
    cursor: u64,
}

impl EventScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let timer = LookaheadTimer::new(config.lookahead_tick_ms);
        Self {
            config,
            timer,
            running: false,
            step_interval: 0.0,
            next_fire_time: 0.0,
            cursor: 0,
        }
    }

    /// Starts scheduling from a clean slate, bringing the audio backend up
    /// first if it is not running yet.
    pub fn start<B: AudioBackend>(&mut self, step_interval: f64, audio: &mut AudioEngine<B>) {
        audio.ensure();

        self.step_interval = if step_interval.is_finite() {
            step_interval.max(MIN_STEP_INTERVAL)
        } else {
            self.config.step_interval()
        };
        self.cursor = 0;
        self.next_fire_time = audio.now() + self.config.start_offset;
        self.running = true;
        self.timer.arm();

        tracing::debug!(
            step_interval = self.step_interval,
            first_step = self.next_fire_time,
            "scheduler started"
        );
    }

    /// Stops the wake-up timer. Safe to call any number of times.
    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(cursor = self.cursor, "scheduler stopped");
        }
        self.running = false;
        self.timer.disarm();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn next_fire_time(&self) -> f64 {
        self.next_fire_time
    }

    /// Feeds wall-clock time to the timer and runs every wake-up that became
    /// due.
    pub fn poll<B: AudioBackend>(
        &mut self,
        wall_delta: f64,
        audio: &mut AudioEngine<B>,
    ) -> Vec<ScheduledEvent> {
        let due = self.timer.advance(wall_delta);
        let mut events = Vec::new();
        for _ in 0..due {
            events.extend(self.wake(audio));
        }
        events
    }

    /// One scheduling cycle: enqueues every step inside the horizon.
    pub fn wake<B: AudioBackend>(&mut self, audio: &mut AudioEngine<B>) -> Vec<ScheduledEvent> {
        if !self.running {
            return Vec::new();
        }

        let now = audio.now();
        let horizon = now + self.config.schedule_ahead;
        let mut events = Vec::new();

        while self.next_fire_time < horizon {
            // A wake-up that arrives after the slot has passed fires late
            // rather than in the past.
            let fire_at = self.next_fire_time.max(now);
            if fire_at > self.next_fire_time {
                tracing::debug!(
                    step = self.cursor,
                    late_by = now - self.next_fire_time,
                    "scheduler step fired late"
                );
            }

            for kind in backbeat(self.cursor) {
                let command = AudioCommand::Percussion(kind);
                audio.submit(command, fire_at);
                events.push(ScheduledEvent::new(fire_at, command, Some(self.cursor)));
            }

            self.next_fire_time += self.step_interval;
            self.cursor += 1;
        }

        events
    }

    /// Fires a one-off command at the current audio time. Leaves the step
    /// cursor untouched, so the frame loop may call it freely.
    pub fn trigger_now<B: AudioBackend>(
        &self,
        command: AudioCommand,
        audio: &mut AudioEngine<B>,
    ) -> ScheduledEvent {
        audio.ensure();
        let fire_at = audio.now();
        audio.submit(command, fire_at);
        ScheduledEvent::new(fire_at, command, None)
    }
}
