use serde::{Deserialize, Serialize};

use crate::{DuelError, Result};

/// Read-only view of the audio hardware time base, in seconds.
pub trait AudioClock {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Percussion {
    Kick,
    Snare,
    Hat,
}

/// Trigger command handed to the audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AudioCommand {
    Percussion(Percussion),
    Tone { pitch: u8, duration: f64 },
}

/// Output device the engine talks to. Synthesis quality is the backend's
/// business; the engine only decides what fires and when.
pub trait AudioBackend {
    /// Prepares the device. Called at most once by [`AudioEngine`].
    fn init(&mut self) -> Result<()>;

    /// Current hardware time. Has to keep advancing even when `init` failed,
    /// since judgment still runs on it.
    fn now(&self) -> f64;

    fn play_percussion(&mut self, kind: Percussion, at: f64);

    fn play_tone(&mut self, pitch: u8, duration: f64, at: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendState {
    Uninitialised,
    Ready,
    /// Initialisation failed; triggers are skipped from here on.
    Silent,
}

/// High level audio engine façade.
///
/// The backend is brought up lazily on first use. If that fails the engine
/// keeps answering `now()` and quietly drops triggers, because sound never
/// decides a judgment.
#[derive(Debug)]
pub struct AudioEngine<B> {
    backend: B,
    state: BackendState,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: BackendState::Uninitialised,
        }
    }

    /// Initialises the backend if that has not been attempted yet. Returns
    /// whether triggers will reach the device.
    pub fn ensure(&mut self) -> bool {
        if self.state == BackendState::Uninitialised {
            self.state = match self.backend.init() {
                Ok(()) => {
                    tracing::debug!("audio backend initialised");
                    BackendState::Ready
                }
                Err(err) => {
                    tracing::warn!(%err, "audio backend unavailable, continuing without sound");
                    BackendState::Silent
                }
            };
        }
        self.state == BackendState::Ready
    }

    pub fn is_ready(&self) -> bool {
        self.state == BackendState::Ready
    }

    pub fn is_silent(&self) -> bool {
        self.state == BackendState::Silent
    }

    /// Sends a command to the device, initialising it first if needed.
    pub fn submit(&mut self, command: AudioCommand, at: f64) {
        if !self.ensure() {
            return;
        }
        match command {
            AudioCommand::Percussion(kind) => self.backend.play_percussion(kind, at),
            AudioCommand::Tone { pitch, duration } => {
                self.backend.play_tone(pitch, duration, at)
            }
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: AudioBackend> AudioClock for AudioEngine<B> {
    fn now(&self) -> f64 {
        match self.state {
            BackendState::Uninitialised => 0.0,
            BackendState::Ready | BackendState::Silent => self.backend.now(),
        }
    }
}

/// Command as received by [`SimulatedBackend`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedCommand {
    pub command: AudioCommand,
    pub at: f64,
    /// Backend time when the command arrived.
    pub received_at: f64,
}

/// Deterministic backend with a manually advanced clock.
///
/// Used for headless matches and tests; it records every command instead of
/// producing sound.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    time: f64,
    fail_init: bool,
    played: Vec<PlayedCommand>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `init` always fails.
    pub fn unavailable() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn advance(&mut self, delta: f64) {
        self.time = (self.time + delta).max(self.time);
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn played(&self) -> &[PlayedCommand] {
        &self.played
    }
}

impl AudioBackend for SimulatedBackend {
    fn init(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(DuelError::AudioBackend("no output device".into()));
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        self.time
    }

    fn play_percussion(&mut self, kind: Percussion, at: f64) {
        self.played.push(PlayedCommand {
            command: AudioCommand::Percussion(kind),
            at,
            received_at: self.time,
        });
    }

    fn play_tone(&mut self, pitch: u8, duration: f64, at: f64) {
        self.played.push(PlayedCommand {
            command: AudioCommand::Tone { pitch, duration },
            at,
            received_at: self.time,
        });
    }
}
