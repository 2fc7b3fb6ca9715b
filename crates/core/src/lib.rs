//! Core library for Instrument Duel.
//!
//! The crate judges player input against a note chart and schedules sound
//! triggers, with every timing decision taken against the audio hardware
//! clock rather than the frame loop. Rendering, menus and chart authoring
//! live outside this crate; they talk to it through [`MatchSession`].

pub mod audio;
pub mod chart;
pub mod config;
pub mod error;
pub mod input;
pub mod judge;
pub mod levels;
pub mod profile;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod timeline;

pub use audio::{
    AudioBackend, AudioClock, AudioCommand, AudioEngine, Percussion, PlayedCommand,
    SimulatedBackend,
};
pub use chart::{Chart, ChartEntry, JudgmentState, Note};
pub use config::{
    AppConfig, ComboTier, JudgmentConfig, MatchConfig, SchedulerConfig, ScoringConfig,
};
pub use error::{DuelError, Result};
pub use input::{InputEdges, InputScript, InputSnapshot, ScriptedAction};
pub use judge::{JudgeEvent, JudgmentEngine, MissReason, Quality, SoundRequest};
pub use levels::{builtin_levels, Level};
pub use profile::{JsonProfileStore, MemoryProfileStore, Profile, ProfileStore, UpgradeKind};
pub use scheduler::{EventScheduler, LookaheadTimer, ScheduledEvent};
pub use score::{JudgmentCounts, ScoreAccumulator};
pub use session::{MatchOutcome, MatchSession, MatchState, TickReport};
pub use timeline::{MatchTimeline, Phase, TimelineStep};
