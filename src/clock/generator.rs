//! Retunable Timing Clock generator
//!
//! The generator emits one Timing Clock packet per firing of its [`Timer`]
//! and rearms with whatever interval is stored at that moment, so tempo
//! changes take effect from the next pulse without a gap or a doubled tick.

use super::timer::{Firing, Timer};
use crate::error::{ClockError, Result};
use crate::midi::{codec, UmpSink};
use crate::tempo::{ScaledTempo, Timebase};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Output toggled on every emitted pulse, for scope measurements.
pub trait DebugPin: Send + Sync {
    fn toggle(&self);
}

/// Pin that does nothing.
#[derive(Debug, Default)]
pub struct NoopPin;

impl DebugPin for NoopPin {
    fn toggle(&self) {}
}

/// Pin that logs its level every half quarter note.
#[derive(Debug, Default)]
pub struct LogPin {
    level: AtomicBool,
    count: AtomicU32,
}

impl DebugPin for LogPin {
    fn toggle(&self) {
        let level = !self.level.fetch_xor(true, Ordering::Relaxed);
        if self.count.fetch_add(1, Ordering::Relaxed) % 12 == 0 {
            trace!("Debug pin {}", if level { "high" } else { "low" });
        }
    }
}

/// Pin that counts toggles. Clones share the count.
#[derive(Debug, Default, Clone)]
pub struct CountingPin {
    toggles: Arc<AtomicU64>,
}

impl CountingPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggles(&self) -> u64 {
        self.toggles.load(Ordering::SeqCst)
    }
}

impl DebugPin for CountingPin {
    fn toggle(&self) {
        self.toggles.fetch_add(1, Ordering::SeqCst);
    }
}

/// State shared between the control side and the firing context.
///
/// `interval` and `running` are single-word atomics with one writer (the
/// controlling [`TickGenerator`]), so a firing sees either the old or the new
/// value of each, never a torn one.
struct GeneratorCore {
    interval: AtomicU32,
    running: AtomicBool,
    pulses: AtomicU64,
    sink: Arc<dyn UmpSink>,
    pin: Box<dyn DebugPin>,
}

impl GeneratorCore {
    /// One firing: emit, then report the interval to rearm with.
    fn fire(&self) -> Option<u32> {
        if !self.running.load(Ordering::Acquire) {
            return None;
        }

        if let Err(e) = self.sink.send(codec::timing_clock()) {
            trace!("Timing clock not sent: {}", e);
        }
        self.pulses.fetch_add(1, Ordering::Relaxed);
        self.pin.toggle();

        // Stopped while emitting; the in-flight pulse is the last one.
        if !self.running.load(Ordering::Acquire) {
            return None;
        }

        match self.interval.load(Ordering::Acquire) {
            0 => {
                warn!("Clock interval vanished while running, stopping generation");
                self.running.store(false, Ordering::Release);
                None
            }
            interval => Some(interval),
        }
    }
}

/// Read-only view of a generator for telemetry threads.
#[derive(Clone)]
pub struct GeneratorReadout {
    core: Arc<GeneratorCore>,
    timebase: Timebase,
}

impl GeneratorReadout {
    pub fn is_running(&self) -> bool {
        self.core.running.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> u32 {
        self.core.interval.load(Ordering::Acquire)
    }

    pub fn sbpm(&self) -> u16 {
        self.timebase.sbpm_for_interval(self.interval())
    }

    pub fn pulses_emitted(&self) -> u64 {
        self.core.pulses.load(Ordering::Relaxed)
    }
}

/// Emits 24 PPQN Timing Clock packets at a retunable interval.
///
/// Intervals are in the timer's unit: microseconds for a [`ThreadTimer`]
/// created with `new`, counter ticks otherwise. An interval of 0 is never
/// scheduled.
///
/// [`ThreadTimer`]: super::ThreadTimer
pub struct TickGenerator {
    core: Arc<GeneratorCore>,
    timer: Box<dyn Timer>,
    timebase: Timebase,
}

impl TickGenerator {
    /// Fails with `DeviceNotReady` when the sink cannot accept packets.
    pub fn new(sink: Arc<dyn UmpSink>, timer: Box<dyn Timer>) -> Result<Self> {
        Self::with_debug_pin(sink, timer, Box::new(NoopPin))
    }

    pub fn with_debug_pin(
        sink: Arc<dyn UmpSink>,
        timer: Box<dyn Timer>,
        pin: Box<dyn DebugPin>,
    ) -> Result<Self> {
        if !sink.is_ready() {
            return Err(ClockError::DeviceNotReady(
                "clock output sink is not ready".to_string(),
            ));
        }

        let timebase = timer.timebase();
        Ok(Self {
            core: Arc::new(GeneratorCore {
                interval: AtomicU32::new(0),
                running: AtomicBool::new(false),
                pulses: AtomicU64::new(0),
                sink,
                pin,
            }),
            timer,
            timebase,
        })
    }

    /// Starts emitting every `interval` units, the first pulse one interval
    /// from now. Zero is ignored. Starting while running retunes instead.
    pub fn start(&mut self, interval: u32) -> Result<()> {
        if interval == 0 {
            trace!("Ignoring start with zero interval");
            return Ok(());
        }
        if self.is_running() {
            return self.set_interval(interval);
        }

        self.core.interval.store(interval, Ordering::Release);
        self.core.running.store(true, Ordering::Release);

        let core = Arc::clone(&self.core);
        let firing: Firing = Arc::new(move || core.fire());
        if let Err(e) = self.timer.schedule(interval, firing) {
            self.core.running.store(false, Ordering::Release);
            warn!("Failed to schedule clock: {}", e);
            return Err(e);
        }

        info!(
            "Clock started at interval {} ({} BPM)",
            interval,
            ScaledTempo(self.get_tempo())
        );
        Ok(())
    }

    /// Starts at the interval for a scaled tempo.
    pub fn start_sbpm(&mut self, sbpm: u16) -> Result<()> {
        self.start(self.timebase.interval_for_sbpm(sbpm))
    }

    /// Starts again with the retained interval.
    pub fn resume(&mut self) -> Result<()> {
        self.start(self.get_interval())
    }

    /// Stores a new interval. While running, the pending pulse is moved so
    /// that it lands `interval` after the previous one.
    pub fn set_interval(&mut self, interval: u32) -> Result<()> {
        if interval == 0 {
            trace!("Ignoring zero interval");
            return Ok(());
        }

        let previous = self.core.interval.swap(interval, Ordering::AcqRel);
        if previous == interval || !self.is_running() {
            return Ok(());
        }

        if let Err(e) = self.timer.reschedule(interval) {
            self.core.running.store(false, Ordering::Release);
            self.timer.cancel();
            warn!("Failed to retune clock: {}", e);
            return Err(e);
        }
        debug!("Clock interval {} -> {}", previous, interval);
        Ok(())
    }

    pub fn set_sbpm(&mut self, sbpm: u16) -> Result<()> {
        self.set_interval(self.timebase.interval_for_sbpm(sbpm))
    }

    /// Cancels future pulses. Safe to call repeatedly; the interval is kept.
    pub fn stop(&mut self) {
        let was_running = self.core.running.swap(false, Ordering::AcqRel);
        self.timer.cancel();
        if was_running {
            info!("Clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.core.running.load(Ordering::Acquire)
    }

    pub fn get_interval(&self) -> u32 {
        self.core.interval.load(Ordering::Acquire)
    }

    /// Tempo of the stored interval, 0 when none is set.
    pub fn get_tempo(&self) -> u16 {
        self.timebase.sbpm_for_interval(self.get_interval())
    }

    pub fn pulses_emitted(&self) -> u64 {
        self.core.pulses.load(Ordering::Relaxed)
    }

    pub fn timebase(&self) -> Timebase {
        self.timebase
    }

    pub fn readout(&self) -> GeneratorReadout {
        GeneratorReadout {
            core: Arc::clone(&self.core),
            timebase: self.timebase,
        }
    }
}

impl Drop for TickGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}
