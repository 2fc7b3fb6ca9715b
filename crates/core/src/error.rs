/// Result alias that carries the custom [`DuelError`] type.
pub type Result<T> = std::result::Result<T, DuelError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    /// Free-form message for conditions that have no dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON in a config, level or profile file.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Chart data that violates the ordering or lane post-conditions.
    #[error("invalid chart: {0}")]
    InvalidChart(String),
    /// Attempt to move a note out of a terminal state, or along an edge the
    /// judgment state machine does not have.
    #[error("note {note}: illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        note: usize,
        from: crate::chart::JudgmentState,
        to: crate::chart::JudgmentState,
    },
    /// The audio backend refused to initialise.
    #[error("audio backend: {0}")]
    AudioBackend(String),
    /// A shop purchase that cannot go through.
    #[error("upgrade: {0}")]
    Upgrade(String),
}

impl DuelError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for DuelError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for DuelError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
