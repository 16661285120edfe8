//! Incoming clock tempo measurement
//!
//! Every received Timing Clock is timestamped against a [`TimeSource`]. The
//! difference to the previous timestamp is one pulse interval in the source's
//! native unit, which is converted to a scaled tempo and published through a
//! lock-free [`MeasurementReadout`].

use super::block_average::BlockAverage;
use super::time_source::TimeSource;
use crate::tempo::{ScaledTempo, Timebase};
use log::{debug, trace};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;

/// How raw pulse intervals become a published tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureMode {
    /// Every interval is published as soon as it is measured.
    #[default]
    PerPulse,
    /// Intervals go through a 64-sample sliding window; nothing is published
    /// until the window is full.
    Averaged,
}

#[derive(Debug, Default)]
struct Published {
    valid: AtomicBool,
    sbpm: AtomicU16,
    interval: AtomicU32,
}

/// Read-only view of the latest measurement, safe to poll from any thread.
///
/// Each field is its own atomic, so a reader racing a publish may see the
/// tempo from one pulse and the interval from the next. Both are individually
/// valid.
#[derive(Debug, Clone, Default)]
pub struct MeasurementReadout {
    inner: Arc<Published>,
}

impl MeasurementReadout {
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Latest tempo, 0 while not valid.
    pub fn sbpm(&self) -> u16 {
        if self.is_valid() {
            self.inner.sbpm.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// Latest interval in the source's unit, 0 while not valid.
    pub fn interval(&self) -> u32 {
        if self.is_valid() {
            self.inner.interval.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    fn publish(&self, sbpm: u16, interval: u32) {
        self.inner.sbpm.store(sbpm, Ordering::Relaxed);
        self.inner.interval.store(interval, Ordering::Relaxed);
        self.inner.valid.store(true, Ordering::Release);
    }

    fn clear(&self) {
        self.inner.valid.store(false, Ordering::Release);
        self.inner.sbpm.store(0, Ordering::Relaxed);
        self.inner.interval.store(0, Ordering::Relaxed);
    }
}

/// Measures the interval between consecutive pulses.
pub struct IntervalMeasurer<T: TimeSource> {
    source: T,
    timebase: Timebase,
    mode: MeasureMode,
    last_timestamp: Option<u32>,
    window: BlockAverage,
    readout: MeasurementReadout,
}

impl<T: TimeSource> IntervalMeasurer<T> {
    pub fn new(source: T, mode: MeasureMode) -> Self {
        let timebase = source.timebase();
        Self {
            source,
            timebase,
            mode,
            last_timestamp: None,
            window: BlockAverage::new(),
            readout: MeasurementReadout::default(),
        }
    }

    /// Records a pulse at the current time.
    ///
    /// Returns the interval that was published, if any. The first pulse after
    /// construction or [`reset`](Self::reset) only records its timestamp. A
    /// zero-length interval is ignored entirely.
    pub fn pulse(&mut self) -> Option<u32> {
        let now = self.source.now();

        let Some(previous) = self.last_timestamp else {
            trace!("First pulse at {}", now);
            self.last_timestamp = Some(now);
            return None;
        };

        let raw = self.source.elapsed(previous, now);
        if raw == 0 {
            trace!("Ignoring zero-length pulse interval");
            return None;
        }
        self.last_timestamp = Some(now);

        let interval = match self.mode {
            MeasureMode::PerPulse => raw,
            MeasureMode::Averaged => {
                self.window.push(raw);
                self.window.average()?
            }
        };

        let sbpm = self.timebase.sbpm_for_interval(interval);
        if sbpm == 0 {
            debug!("Interval {} is outside the representable tempo range", interval);
            return None;
        }

        self.readout.publish(sbpm, interval);
        trace!("Measured interval {} ({} BPM)", interval, ScaledTempo(sbpm));
        Some(interval)
    }

    /// Forgets every timestamp and sample, as on a transport discontinuity.
    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.window.clear();
        self.readout.clear();
        debug!("Measurement reset");
    }

    pub fn is_valid(&self) -> bool {
        self.readout.is_valid()
    }

    /// Measured tempo, 0 until valid.
    pub fn sbpm(&self) -> u16 {
        self.readout.sbpm()
    }

    /// Measured pulse interval in the source's unit, 0 until valid.
    pub fn interval(&self) -> u32 {
        self.readout.interval()
    }

    pub fn interval_us(&self) -> u32 {
        self.timebase.interval_to_us(self.interval())
    }

    /// Timestamp of the most recent accepted pulse.
    pub fn last_timestamp(&self) -> Option<u32> {
        self.last_timestamp
    }

    pub fn mode(&self) -> MeasureMode {
        self.mode
    }

    pub fn timebase(&self) -> Timebase {
        self.timebase
    }

    /// Samples collected towards the averaging window.
    pub fn samples_collected(&self) -> usize {
        self.window.len()
    }

    pub fn readout(&self) -> MeasurementReadout {
        self.readout.clone()
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}
