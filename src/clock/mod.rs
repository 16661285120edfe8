//! 24 PPQN clock measurement, locking and generation
//!
//! Incoming Timing Clock pulses are timestamped by an [`IntervalMeasurer`],
//! smoothed by a [`PllController`] and regenerated by a [`TickGenerator`]
//! driven from a [`Timer`].

mod block_average;
mod generator;
mod measure;
mod pll;
mod time_source;
mod timer;

pub use block_average::{BlockAverage, BLOCK_SIZE};
pub use generator::{CountingPin, DebugPin, GeneratorReadout, LogPin, NoopPin, TickGenerator};
pub use measure::{IntervalMeasurer, MeasureMode, MeasurementReadout};
pub use pll::{PllController, PllReadout, PllTuning};
pub use time_source::{FreeRunningCounter, ManualClock, MonotonicMicros, TimeSource};
pub use timer::{Firing, ManualTimer, ThreadTimer, Timer};
