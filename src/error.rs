use thiserror::Error;

/// Errors surfaced by the clock subsystem and its host glue.
///
/// Invalid intervals are not errors: conversions return `0` and callers check
/// for it. Spurious measurements and stray data bytes are dropped silently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// The sink, counter or transport was unavailable at init. The component
    /// must not be started.
    #[error("device not ready: {0}")]
    DeviceNotReady(String),

    /// The runtime refused to (re)schedule the next firing. Clock generation
    /// has stopped; a supervisor may call `start()` again.
    #[error("scheduling failure: {0}")]
    SchedulingFailure(String),

    /// Looking up or connecting to a host MIDI port failed.
    #[error("MIDI connection error: {0}")]
    Connection(String),

    /// A packet could not be handed to the output.
    #[error("MIDI send error: {0}")]
    Send(String),

    /// The output queue had no room; the packet was dropped.
    #[error("output queue full")]
    QueueFull,

    /// The output side has gone away.
    #[error("output queue closed")]
    QueueClosed,

    /// Configuration could not be loaded or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClockError>;

impl From<config::ConfigError> for ClockError {
    fn from(err: config::ConfigError) -> Self {
        ClockError::Config(err.to_string())
    }
}
