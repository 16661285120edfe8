use crate::tempo::PULSES_PER_QUARTER_NOTE;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub const BEATS_PER_BAR: u64 = 4;

/// Transport position of the followed clock.
///
/// Written by the input thread, read by telemetry. Beat and bar are derived
/// from the pulse count at 24 PPQN in 4/4.
#[derive(Debug, Default)]
pub struct TransportState {
    playing: AtomicBool,
    pulse_count: AtomicU64,
}

pub type SharedTransport = Arc<TransportState>;

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTransport {
        Arc::new(Self::new())
    }

    /// Start: playing from the top.
    pub fn start(&self) {
        self.pulse_count.store(0, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    /// Continue: playing from the current position.
    pub fn resume(&self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Counts one Timing Clock. Pulses while stopped do not move the position.
    pub fn tick(&self) {
        if self.is_playing() {
            self.pulse_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count.load(Ordering::SeqCst)
    }

    /// Beat within the bar, 1-based.
    pub fn beat(&self) -> u32 {
        let beats = self.pulse_count() / u64::from(PULSES_PER_QUARTER_NOTE);
        (beats % BEATS_PER_BAR) as u32 + 1
    }

    /// Bar number, 1-based.
    pub fn bar(&self) -> u64 {
        let beats = self.pulse_count() / u64::from(PULSES_PER_QUARTER_NOTE);
        beats / BEATS_PER_BAR + 1
    }

    /// Song position pointer: sets the position in sixteenth notes
    /// (6 pulses each).
    pub fn set_song_position(&self, sixteenths: u16) {
        self.pulse_count
            .store(u64::from(sixteenths) * 6, Ordering::SeqCst);
    }
}
