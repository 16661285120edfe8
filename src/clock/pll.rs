//! Integer phase-locked loop for following an external clock
//!
//! Each measured interval updates a low-pass filtered error against the
//! loop's internal interval. The filtered error nudges the internal interval
//! around a nominal value, and its running sum slowly walks the nominal
//! towards the long-term measured period one count at a time. Only the
//! nominal drives the generator, so short transients never retune it.

use crate::tempo::Timebase;
use log::trace;
use serde::Deserialize;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Loop constants. All must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PllTuning {
    /// Error low-pass divisor; larger is slower and steadier.
    pub filter_k: i32,
    /// Correction divisor; smaller corrects harder.
    pub gain: i32,
    /// Accumulated error that moves the nominal interval by one count.
    pub track_threshold: i32,
}

impl Default for PllTuning {
    fn default() -> Self {
        Self {
            filter_k: 16,
            gain: 8,
            track_threshold: 512,
        }
    }
}

impl PllTuning {
    pub fn is_valid(&self) -> bool {
        self.filter_k > 0 && self.gain > 0 && self.track_threshold > 0
    }
}

#[derive(Debug, Default)]
struct LoopState {
    nominal: AtomicI32,
    internal: AtomicI32,
    filtered: AtomicI32,
    slow: AtomicI32,
}

/// Lock-free view of the loop for telemetry.
#[derive(Debug, Clone, Default)]
pub struct PllReadout {
    inner: Arc<LoopState>,
}

impl PllReadout {
    pub fn interval(&self) -> u32 {
        self.inner.nominal.load(Ordering::Relaxed).max(0) as u32
    }

    pub fn internal_interval(&self) -> i32 {
        self.inner.internal.load(Ordering::Relaxed)
    }

    pub fn filtered_error(&self) -> i32 {
        self.inner.filtered.load(Ordering::Relaxed)
    }

    pub fn slow_error(&self) -> i32 {
        self.inner.slow.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct PllController {
    tuning: PllTuning,
    nominal: i32,
    internal: i32,
    filtered: i32,
    slow: i32,
    readout: PllReadout,
}

impl PllController {
    /// Seeds the loop at `nominal_interval`. Invalid tuning falls back to
    /// the defaults.
    pub fn new(nominal_interval: u32, tuning: PllTuning) -> Self {
        let tuning = if tuning.is_valid() {
            tuning
        } else {
            PllTuning::default()
        };
        let nominal = i32::try_from(nominal_interval).unwrap_or(i32::MAX);
        let pll = Self {
            tuning,
            nominal,
            internal: nominal,
            filtered: 0,
            slow: 0,
            readout: PllReadout::default(),
        };
        pll.publish();
        pll
    }

    /// Seeds the loop from a tempo, with intervals in `timebase` units.
    pub fn from_tempo(sbpm: u16, timebase: Timebase) -> Self {
        Self::new(timebase.interval_for_sbpm(sbpm), PllTuning::default())
    }

    /// Feeds one measured interval through the loop and returns the updated
    /// output interval. A zero measurement is ignored.
    pub fn process(&mut self, measured_interval: u32) -> u32 {
        if measured_interval == 0 {
            return self.get_interval();
        }
        let measured = i32::try_from(measured_interval).unwrap_or(i32::MAX);
        let PllTuning {
            filter_k,
            gain,
            track_threshold,
        } = self.tuning;

        let error = measured.saturating_sub(self.internal);
        self.filtered = self
            .filtered
            .saturating_add(error.saturating_sub(self.filtered) / filter_k);
        self.internal = self.nominal.saturating_add(self.filtered / gain);

        self.slow = self.slow.saturating_add(self.filtered);
        if self.slow > track_threshold {
            self.nominal = self.nominal.saturating_add(1);
            self.slow -= track_threshold;
        } else if self.slow < -track_threshold {
            self.nominal = self.nominal.saturating_sub(1);
            self.slow += track_threshold;
        }

        trace!(
            "PLL meas={} err={} filt={} int={} accum={} nominal={}",
            measured,
            error,
            self.filtered,
            self.internal,
            self.slow,
            self.nominal
        );
        self.publish();
        self.get_interval()
    }

    /// Interval that should drive the generator: the slow-tracked nominal.
    pub fn get_interval(&self) -> u32 {
        self.nominal.max(0) as u32
    }

    pub fn internal_interval(&self) -> i32 {
        self.internal
    }

    pub fn filtered_error(&self) -> i32 {
        self.filtered
    }

    pub fn slow_error(&self) -> i32 {
        self.slow
    }

    pub fn tuning(&self) -> PllTuning {
        self.tuning
    }

    pub fn readout(&self) -> PllReadout {
        self.readout.clone()
    }

    fn publish(&self) {
        let state = &self.readout.inner;
        state.nominal.store(self.nominal, Ordering::Relaxed);
        state.internal.store(self.internal, Ordering::Relaxed);
        state.filtered.store(self.filtered, Ordering::Relaxed);
        state.slow.store(self.slow, Ordering::Relaxed);
    }
}
