use crate::tempo::{Timebase, US_PER_SECOND};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A free-running 32-bit counter used to timestamp incoming pulses.
///
/// Readings wrap at `u32::MAX`. [`TimeSource::elapsed`] is correct across a
/// single wrap between two readings.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> u32;

    /// Counter increments per second.
    fn frequency_hz(&self) -> u32;

    /// True for counters that decrement, like a PIT channel.
    fn counts_down(&self) -> bool {
        false
    }

    /// Counts between two readings taken in order.
    fn elapsed(&self, earlier: u32, later: u32) -> u32 {
        if self.counts_down() {
            earlier.wrapping_sub(later)
        } else {
            later.wrapping_sub(earlier)
        }
    }

    /// Unit of the intervals this source produces.
    fn timebase(&self) -> Timebase {
        match self.frequency_hz() {
            hz if u64::from(hz) == US_PER_SECOND => Timebase::Micros,
            hz => Timebase::Ticks { clock_hz: hz },
        }
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn frequency_hz(&self) -> u32 {
        (**self).frequency_hz()
    }

    fn counts_down(&self) -> bool {
        (**self).counts_down()
    }
}

/// Microseconds since construction, wrapping every ~71 minutes.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicMicros {
    origin: Instant,
}

impl MonotonicMicros {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicMicros {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicMicros {
    fn now(&self) -> u32 {
        self.origin.elapsed().as_micros() as u32
    }

    fn frequency_hz(&self) -> u32 {
        US_PER_SECOND as u32
    }
}

/// Emulates a hardware counter clocked at an arbitrary frequency.
#[derive(Debug, Clone, Copy)]
pub struct FreeRunningCounter {
    origin: Instant,
    clock_hz: u32,
    counts_down: bool,
}

impl FreeRunningCounter {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            origin: Instant::now(),
            clock_hz,
            counts_down: false,
        }
    }

    /// A counter that starts at `u32::MAX` and decrements.
    pub fn down(clock_hz: u32) -> Self {
        Self {
            counts_down: true,
            ..Self::new(clock_hz)
        }
    }
}

impl TimeSource for FreeRunningCounter {
    fn now(&self) -> u32 {
        let nanos = self.origin.elapsed().as_nanos();
        let ticks = (nanos * u128::from(self.clock_hz) / 1_000_000_000) as u32;
        if self.counts_down {
            u32::MAX - ticks
        } else {
            ticks
        }
    }

    fn frequency_hz(&self) -> u32 {
        self.clock_hz
    }

    fn counts_down(&self) -> bool {
        self.counts_down
    }
}

/// Counter moved only by explicit calls, for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU32,
    clock_hz: u32,
    counts_down: bool,
}

impl ManualClock {
    /// A microsecond clock starting at zero.
    pub fn new() -> Self {
        Self::with_frequency(US_PER_SECOND as u32)
    }

    pub fn with_frequency(clock_hz: u32) -> Self {
        Self {
            now: AtomicU32::new(0),
            clock_hz,
            counts_down: false,
        }
    }

    /// A decrementing counter starting at `start`.
    pub fn counting_down(clock_hz: u32, start: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
            clock_hz,
            counts_down: true,
        }
    }

    pub fn set(&self, value: u32) {
        self.now.store(value, Ordering::SeqCst);
    }

    /// Moves the counter `counts` forward in time, wrapping as hardware does.
    pub fn advance(&self, counts: u32) {
        if self.counts_down {
            self.now.fetch_sub(counts, Ordering::SeqCst);
        } else {
            self.now.fetch_add(counts, Ordering::SeqCst);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }

    fn frequency_hz(&self) -> u32 {
        self.clock_hz
    }

    fn counts_down(&self) -> bool {
        self.counts_down
    }
}
